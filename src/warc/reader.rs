//! Forward-only WARC record reader
//!
//! [`ArchiveReader`] yields records lazily. The first structural error is
//! yielded once and ends the sequence; everything before it is intact.

use crate::warc::record::{latin1, RawRecord, WarcHeaders, CONTENT_LENGTH};
use crate::warc::ArchiveError;
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Lazy iterator over the records of a WARC stream
pub struct ArchiveReader<R> {
    inner: R,
    index: usize,
    finished: bool,
}

impl ArchiveReader<Box<dyn BufRead + Send>> {
    /// Opens a `.warc` or `.warc.gz` file; compression is detected from the
    /// gzip magic bytes, not the file name
    pub fn open(path: &Path) -> io::Result<Self> {
        let mut file = BufReader::new(File::open(path)?);
        let is_gzip = file.fill_buf()?.starts_with(&GZIP_MAGIC);

        let inner: Box<dyn BufRead + Send> = if is_gzip {
            Box::new(BufReader::new(MultiGzDecoder::new(file)))
        } else {
            Box::new(file)
        };

        Ok(Self::new(inner))
    }
}

impl<R: BufRead> ArchiveReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            index: 0,
            finished: false,
        }
    }

    /// Number of records successfully read so far
    pub fn records_read(&self) -> usize {
        self.index
    }

    fn read_record(&mut self) -> Result<Option<RawRecord>, ArchiveError> {
        let record = self.index;

        // Records are separated by blank lines; skip them and stop at EOF
        let version = loop {
            let mut line = Vec::new();
            if self.inner.read_until(b'\n', &mut line)? == 0 {
                return Ok(None);
            }
            let trimmed = trim_line_end(&line);
            if trimmed.is_empty() {
                continue;
            }
            if !trimmed.starts_with(b"WARC/") {
                return Err(ArchiveError::InvalidVersionLine {
                    record,
                    line: latin1(trimmed).chars().take(80).collect(),
                });
            }
            break latin1(trimmed);
        };

        let headers = self.read_headers(record)?;

        let declared = headers
            .get(CONTENT_LENGTH)
            .ok_or(ArchiveError::MissingContentLength { record })?;
        let length: u64 = declared
            .trim()
            .parse()
            .map_err(|_| ArchiveError::InvalidContentLength {
                record,
                value: declared.to_string(),
            })?;

        let mut block = Vec::new();
        let actual = (&mut self.inner).take(length).read_to_end(&mut block)? as u64;
        if actual < length {
            return Err(ArchiveError::Truncated {
                record,
                expected: length,
                actual,
            });
        }

        self.index += 1;
        Ok(Some(RawRecord::from_block(version, headers, block)))
    }

    fn read_headers(&mut self, record: usize) -> Result<WarcHeaders, ArchiveError> {
        let mut headers = WarcHeaders::new();
        loop {
            let mut line = Vec::new();
            if self.inner.read_until(b'\n', &mut line)? == 0 || !line.ends_with(b"\n") {
                return Err(ArchiveError::TruncatedHeader { record });
            }

            let trimmed = trim_line_end(&line);
            if trimmed.is_empty() {
                return Ok(headers);
            }

            let text = latin1(trimmed);
            if text.starts_with(' ') || text.starts_with('\t') {
                if headers.extend_last(text.trim()) {
                    continue;
                }
            } else if let Some((name, value)) = text.split_once(':') {
                if !name.trim().is_empty() {
                    headers.push(name.trim(), value.trim());
                    continue;
                }
            }

            return Err(ArchiveError::MalformedHeader {
                record,
                line: text.chars().take(80).collect(),
            });
        }
    }
}

impl<R: BufRead> Iterator for ArchiveReader<R> {
    type Item = Result<RawRecord, ArchiveError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const RESPONSE: &[u8] = b"WARC/1.0\r\n\
WARC-Type: response\r\n\
WARC-Target-URI: http://example.com/\r\n\
Content-Type: application/http; msgtype=response\r\n\
Content-Length: 24\r\n\
\r\n\
HTTP/1.1 200 OK\r\n\r\nhello\r\n\r\n";

    fn read_all(bytes: &[u8]) -> Vec<Result<RawRecord, ArchiveError>> {
        ArchiveReader::new(Cursor::new(bytes.to_vec())).collect()
    }

    #[test]
    fn test_reads_single_record() {
        let records = read_all(RESPONSE);
        assert_eq!(records.len(), 1);

        let record = records[0].as_ref().unwrap();
        assert_eq!(record.version, "WARC/1.0");
        assert_eq!(record.target_uri(), Some("http://example.com/"));
        assert_eq!(record.payload, b"hello");
        assert_eq!(record.length, Some(24));
    }

    #[test]
    fn test_reads_consecutive_records() {
        let mut input = RESPONSE.to_vec();
        input.extend_from_slice(RESPONSE);
        let records = read_all(&input);
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(Result::is_ok));
    }

    #[test]
    fn test_empty_input_yields_nothing() {
        assert!(read_all(b"").is_empty());
        assert!(read_all(b"\r\n\r\n").is_empty());
    }

    #[test]
    fn test_truncated_header_stops_stream() {
        let mut input = RESPONSE.to_vec();
        input.extend_from_slice(b"WARC/1.0\r\nWARC-Type: resp");
        let records = read_all(&input);

        assert_eq!(records.len(), 2);
        assert!(records[0].is_ok());
        assert!(matches!(
            records[1],
            Err(ArchiveError::TruncatedHeader { record: 1 })
        ));
    }

    #[test]
    fn test_truncated_block_stops_stream() {
        let input = b"WARC/1.0\r\nWARC-Type: resource\r\nContent-Length: 100\r\n\r\nshort";
        let records = read_all(input);

        assert_eq!(records.len(), 1);
        assert!(matches!(
            records[0],
            Err(ArchiveError::Truncated {
                expected: 100,
                actual: 5,
                ..
            })
        ));
    }

    #[test]
    fn test_garbage_is_invalid_version_line() {
        let records = read_all(b"<html>not an archive</html>\n");
        assert!(matches!(
            records[0],
            Err(ArchiveError::InvalidVersionLine { record: 0, .. })
        ));
    }

    #[test]
    fn test_missing_and_invalid_content_length() {
        let missing = read_all(b"WARC/1.0\r\nWARC-Type: resource\r\n\r\n");
        assert!(matches!(
            missing[0],
            Err(ArchiveError::MissingContentLength { .. })
        ));

        let invalid = read_all(b"WARC/1.0\r\nContent-Length: lots\r\n\r\n");
        assert!(matches!(
            invalid[0],
            Err(ArchiveError::InvalidContentLength { .. })
        ));
    }

    #[test]
    fn test_folded_header_continues_value() {
        let input = b"WARC/1.0\r\nWARC-Type: resource\r\nX-Note: first\r\n  second\r\nContent-Length: 0\r\n\r\n";
        let records = read_all(input);
        let record = records[0].as_ref().unwrap();
        assert_eq!(record.headers.get("X-Note"), Some("first second"));
    }

    #[test]
    fn test_non_utf8_header_bytes_round_trip() {
        let input: &[u8] = b"WARC/1.0\r\n\
WARC-Type: resource\r\n\
WARC-Target-URI: http://example.com/caf\xe9\r\n\
X-Raw: \xff\xfe\r\n\
Content-Length: 2\r\n\
\r\n\
hi\r\n\r\n";
        let records = read_all(input);
        let record = records[0].as_ref().unwrap();

        assert_eq!(record.target_uri(), Some("http://example.com/caf\u{e9}"));
        assert_eq!(record.to_bytes(), input);
    }

    #[test]
    fn test_reader_is_fused_after_error() {
        let mut reader = ArchiveReader::new(Cursor::new(b"garbage\n".to_vec()));
        assert!(matches!(reader.next(), Some(Err(_))));
        assert!(reader.next().is_none());
        assert_eq!(reader.records_read(), 0);
    }
}
