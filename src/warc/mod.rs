//! Web archive (WARC) handling
//!
//! - `record`: record model and serialization
//! - `reader`: lazy, forward-only record reader over plain or gzipped input
//! - `writer`: per-record gzip writer
//! - `rewriter`: repair/filter pass from the raw archive to the final one

mod reader;
mod record;
mod rewriter;
mod writer;

pub use reader::ArchiveReader;
pub use record::{
    HttpHeaders, NonAsciiHeader, RawRecord, WarcHeaders, CONTENT_LENGTH, WARC_BLOCK_DIGEST,
    WARC_TARGET_URI, WARC_TYPE,
};
pub use rewriter::{
    process_record, rewrite_archive, rewrite_records, write_empty_archive, DropReason,
    FilterDecision, RewriteStats,
};
pub use writer::WarcWriter;

use thiserror::Error;

/// Structural errors in a WARC stream
///
/// `record` is the zero-based index of the record being read.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Record {record}: expected a WARC version line, found '{line}'")]
    InvalidVersionLine { record: usize, line: String },

    #[error("Record {record}: malformed header line '{line}'")]
    MalformedHeader { record: usize, line: String },

    #[error("Record {record}: header block ends before the blank line")]
    TruncatedHeader { record: usize },

    #[error("Record {record}: missing Content-Length")]
    MissingContentLength { record: usize },

    #[error("Record {record}: invalid Content-Length '{value}'")]
    InvalidContentLength { record: usize, value: String },

    #[error("Record {record}: block truncated, expected {expected} bytes, got {actual}")]
    Truncated {
        record: usize,
        expected: u64,
        actual: u64,
    },
}
