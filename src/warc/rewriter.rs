//! Archive rewriter
//!
//! Streams the raw archive the fetch agent produced, repairs HTTP header
//! blocks that are not strict ASCII, drops records without a target URI or
//! inside the agent's metadata namespace, and writes the rest as a
//! compressed archive with freshly computed framing.

use crate::warc::reader::ArchiveReader;
use crate::warc::record::{RawRecord, WARC_BLOCK_DIGEST};
use crate::warc::writer::WarcWriter;
use crate::HarvestError;
use std::fs::File;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::Path;

/// Per-record verdict of the filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterDecision {
    pub keep: bool,
    pub header_repaired: bool,
    pub reason: Option<DropReason>,
}

/// Why a record was left out of the final archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// No `WARC-Target-URI` (warcinfo and similar)
    NoTargetUri,
    /// Fetch agent bookkeeping record
    AgentMetadata,
}

/// Counters reported by a rewrite pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteStats {
    pub records_read: usize,
    pub records_written: usize,
    pub dropped_no_uri: usize,
    pub dropped_metadata: usize,
    pub headers_repaired: usize,
    /// The input ended with a structural error; records before it were kept
    pub corrupted: bool,
}

impl RewriteStats {
    pub fn records_dropped(&self) -> usize {
        self.dropped_no_uri + self.dropped_metadata
    }
}

/// Repairs a record in place and decides whether it belongs in the output
///
/// Header repair happens before the keep/drop decision, and retained records
/// lose their declared length so it is recomputed when written.
pub fn process_record(record: &mut RawRecord, metadata_prefix: &str) -> FilterDecision {
    let mut header_repaired = false;

    if let Some(http) = &record.http_headers {
        if let Err(err) = http.to_ascii_bytes() {
            tracing::debug!(
                "Non-ASCII HTTP header at byte {} for {:?}, keeping status line only",
                err.position,
                record.target_uri()
            );
            let repaired = http.repaired(record.payload.len());
            record.http_headers = Some(repaired);
            // The block changed, so its digest no longer holds
            record.headers.remove(WARC_BLOCK_DIGEST);
            header_repaired = true;
        }
    }

    let reason = match record.target_uri() {
        None => Some(DropReason::NoTargetUri),
        Some(uri) if uri.starts_with(metadata_prefix) => Some(DropReason::AgentMetadata),
        Some(_) => None,
    };

    if reason.is_none() {
        record.clear_length();
    }

    FilterDecision {
        keep: reason.is_none(),
        header_repaired,
        reason,
    }
}

/// Rewrites every record from `reader` into `writer`
///
/// A structural error in the input stops the pass: it is logged, flagged in
/// the returned stats, and the records already written stay in the output.
/// Only write failures are returned as errors.
pub fn rewrite_records<R: BufRead, W: Write>(
    reader: ArchiveReader<R>,
    writer: &mut WarcWriter<W>,
    metadata_prefix: &str,
) -> io::Result<RewriteStats> {
    let mut stats = RewriteStats::default();

    for item in reader {
        let mut record = match item {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(
                    "Stopping rewrite after {} records, input archive is corrupt: {}",
                    stats.records_read,
                    e
                );
                stats.corrupted = true;
                break;
            }
        };
        stats.records_read += 1;

        let decision = process_record(&mut record, metadata_prefix);
        if decision.header_repaired {
            stats.headers_repaired += 1;
        }

        match decision.reason {
            Some(DropReason::NoTargetUri) => stats.dropped_no_uri += 1,
            Some(DropReason::AgentMetadata) => stats.dropped_metadata += 1,
            None => {
                writer.write_record(&record)?;
                stats.records_written += 1;
            }
        }
    }

    Ok(stats)
}

/// Rewrites the archive at `input` into a compressed archive at `output`
///
/// # Arguments
///
/// * `input` - Raw archive, plain or gzip-compressed
/// * `output` - Destination `.warc.gz`, created or truncated
/// * `metadata_prefix` - Target-URI prefix of records to drop
///
/// # Returns
///
/// * `Ok(RewriteStats)` - Rewrite finished, possibly early on corrupt input
/// * `Err(HarvestError)` - Input could not be opened or output not written
pub fn rewrite_archive(
    input: &Path,
    output: &Path,
    metadata_prefix: &str,
) -> Result<RewriteStats, HarvestError> {
    let reader = ArchiveReader::open(input)?;
    let mut writer = WarcWriter::new(BufWriter::new(File::create(output)?));

    let stats = rewrite_records(reader, &mut writer, metadata_prefix)?;
    writer.finish()?.into_inner().map_err(|e| e.into_error())?.sync_all()?;

    tracing::info!(
        "Rewrote {}: {} records read, {} written, {} dropped, {} headers repaired{}",
        input.display(),
        stats.records_read,
        stats.records_written,
        stats.records_dropped(),
        stats.headers_repaired,
        if stats.corrupted { " (input truncated)" } else { "" }
    );

    Ok(stats)
}

/// Creates an empty final archive, used when nothing could be crawled
pub fn write_empty_archive(output: &Path) -> io::Result<()> {
    File::create(output)?.sync_all()
}
