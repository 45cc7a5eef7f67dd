//! Compressed WARC writer
//!
//! Each record becomes its own gzip member, the usual `.warc.gz` layout that
//! lets readers seek to a record offset and decompress it alone.

use crate::warc::record::RawRecord;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{self, Write};

pub struct WarcWriter<W: Write> {
    inner: W,
    compression: Compression,
    records_written: usize,
}

impl<W: Write> WarcWriter<W> {
    pub fn new(inner: W) -> Self {
        Self::with_compression(inner, Compression::default())
    }

    pub fn with_compression(inner: W, compression: Compression) -> Self {
        Self {
            inner,
            compression,
            records_written: 0,
        }
    }

    /// Writes one record as a gzip member
    ///
    /// The `Content-Length` written always matches the serialized block;
    /// returns the uncompressed size of the record.
    pub fn write_record(&mut self, record: &RawRecord) -> io::Result<usize> {
        let bytes = record.to_bytes();
        let mut encoder = GzEncoder::new(&mut self.inner, self.compression);
        encoder.write_all(&bytes)?;
        encoder.finish()?;
        self.records_written += 1;
        Ok(bytes.len())
    }

    pub fn records_written(&self) -> usize {
        self.records_written
    }

    /// Flushes and returns the underlying writer
    pub fn finish(mut self) -> io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}
