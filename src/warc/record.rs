//! WARC record model
//!
//! A [`RawRecord`] is one captured transaction as read from an archive: the
//! WARC header fields, the optional HTTP header block of `request`,
//! `response` and `revisit` records, and the remaining payload bytes.

use std::fmt::Write as _;

pub const CONTENT_LENGTH: &str = "Content-Length";
pub const WARC_TARGET_URI: &str = "WARC-Target-URI";
pub const WARC_TYPE: &str = "WARC-Type";
pub const WARC_BLOCK_DIGEST: &str = "WARC-Block-Digest";

const CRLF: &[u8] = b"\r\n";

/// Ordered WARC header fields, compared case-insensitively by name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WarcHeaders {
    fields: Vec<(String, String)>,
}

impl WarcHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the first value for `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Appends a field, keeping any existing fields of the same name
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Replaces the first field named `name` in place, or appends it
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .fields
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some((_, v)) => *v = value,
            None => self.fields.push((name.to_string(), value)),
        }
    }

    /// Removes every field named `name`
    pub fn remove(&mut self, name: &str) {
        self.fields.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
    }

    /// Appends a continuation line to the most recent field
    pub(crate) fn extend_last(&mut self, continuation: &str) -> bool {
        match self.fields.last_mut() {
            Some((_, v)) => {
                v.push(' ');
                v.push_str(continuation);
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// HTTP status/request line plus header fields, kept as the raw bytes that
/// were captured (terminating blank line included)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpHeaders {
    raw: Vec<u8>,
}

/// The header block contains bytes outside 7-bit ASCII
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NonAsciiHeader {
    /// Offset of the first offending byte within the block
    pub position: usize,
}

impl HttpHeaders {
    /// Wraps a captured header block
    pub fn from_raw(raw: Vec<u8>) -> Self {
        Self { raw }
    }

    /// Splits an `application/http` block into header block and payload
    ///
    /// The header ends at the first blank line, CRLF or bare LF, whichever
    /// comes first. Returns `None` when the block has no header terminator.
    pub fn split_block(block: &[u8]) -> Option<(Self, Vec<u8>)> {
        let crlf = find(block, b"\r\n\r\n").map(|i| i + 4);
        let lf = find(block, b"\n\n").map(|i| i + 2);
        let end = match (crlf, lf) {
            (Some(a), Some(b)) => a.min(b),
            (a, b) => a.or(b)?,
        };
        Some((Self::from_raw(block[..end].to_vec()), block[end..].to_vec()))
    }

    /// Builds a minimal header block: the status line and a payload length
    pub fn minimal(status_line: &str, payload_len: usize) -> Self {
        let mut text = String::with_capacity(status_line.len() + 32);
        text.push_str(status_line);
        text.push_str("\r\n");
        let _ = write!(text, "{}: {}\r\n\r\n", CONTENT_LENGTH, payload_len);
        Self {
            raw: text.into_bytes(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Returns the header bytes if they are strict ASCII
    pub fn to_ascii_bytes(&self) -> Result<&[u8], NonAsciiHeader> {
        match self.raw.iter().position(|b| !b.is_ascii()) {
            Some(position) => Err(NonAsciiHeader { position }),
            None => Ok(&self.raw),
        }
    }

    /// First line of the block, without its line terminator
    pub fn status_line_bytes(&self) -> &[u8] {
        let end = self
            .raw
            .iter()
            .position(|&b| b == b'\n')
            .unwrap_or(self.raw.len());
        let line = &self.raw[..end];
        line.strip_suffix(b"\r").unwrap_or(line)
    }

    /// True for response status lines (`HTTP/1.1 200 OK`)
    pub fn is_response(&self) -> bool {
        self.status_line_bytes().starts_with(b"HTTP/")
    }

    /// Status code of a response (`200`), or the method of a request (`GET`)
    pub fn status_code(&self) -> Option<String> {
        let mut tokens = self
            .status_line_bytes()
            .split(|&b| b == b' ')
            .filter(|t| !t.is_empty());
        let token = if self.is_response() {
            tokens.nth(1)
        } else {
            tokens.next()
        }?;
        Some(String::from_utf8_lossy(token).into_owned())
    }

    /// Header fields after the status line, decoded byte-per-char
    pub fn fields(&self) -> Vec<(String, String)> {
        let mut lines = self.raw.split(|&b| b == b'\n');
        lines.next();
        lines
            .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
            .take_while(|line| !line.is_empty())
            .filter_map(|line| {
                let colon = line.iter().position(|&b| b == b':')?;
                Some((
                    latin1(&line[..colon]).trim().to_string(),
                    latin1(&line[colon + 1..]).trim().to_string(),
                ))
            })
            .collect()
    }

    /// Rebuilds this block in strict ASCII, keeping only the status line
    ///
    /// Responses keep `<protocol> <status code>`; request lines are kept
    /// whole. Non-ASCII bytes that survive are percent-encoded. The only
    /// header field written is a `Content-Length` for `payload_len`.
    pub fn repaired(&self, payload_len: usize) -> Self {
        let line = self.status_line_bytes();
        let status_line = if self.is_response() {
            line.split(|&b| b == b' ')
                .filter(|t| !t.is_empty())
                .take(2)
                .map(percent_encode_non_ascii)
                .collect::<Vec<_>>()
                .join(" ")
        } else {
            percent_encode_non_ascii(line)
        };
        Self::minimal(&status_line, payload_len)
    }
}

/// One record read from, or written to, a WARC file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// Version line, e.g. `WARC/1.0`
    pub version: String,
    pub headers: WarcHeaders,
    pub http_headers: Option<HttpHeaders>,
    pub payload: Vec<u8>,
    /// Block length declared by the input; `None` once it must be recomputed
    pub length: Option<u64>,
}

impl RawRecord {
    /// Builds a record from its parsed header and raw content block
    ///
    /// `application/http` blocks of request, response and revisit records
    /// are split into HTTP headers and payload.
    pub fn from_block(version: String, headers: WarcHeaders, block: Vec<u8>) -> Self {
        let length = Some(block.len() as u64);
        let carries_http = matches!(
            headers.get(WARC_TYPE).map(str::to_ascii_lowercase).as_deref(),
            Some("response" | "request" | "revisit")
        ) && headers
            .get("Content-Type")
            .map_or(false, |ct| ct.to_ascii_lowercase().contains("application/http"));

        let (http_headers, payload) = if carries_http {
            match HttpHeaders::split_block(&block) {
                Some((http, payload)) => (Some(http), payload),
                None => (None, block),
            }
        } else {
            (None, block)
        };

        Self {
            version,
            headers,
            http_headers,
            payload,
            length,
        }
    }

    /// Target URI with one enclosing `<...>` pair removed
    ///
    /// wget writes `WARC-Target-URI: <http://...>`; the header itself is
    /// written back untouched.
    pub fn target_uri(&self) -> Option<&str> {
        self.headers
            .get(WARC_TARGET_URI)
            .map(str::trim)
            .map(|uri| {
                uri.strip_prefix('<')
                    .and_then(|u| u.strip_suffix('>'))
                    .unwrap_or(uri)
                    .trim()
            })
            .filter(|uri| !uri.is_empty())
    }

    pub fn record_type(&self) -> Option<&str> {
        self.headers.get(WARC_TYPE)
    }

    /// Forgets the declared length so it is recomputed on write
    pub fn clear_length(&mut self) {
        self.length = None;
    }

    /// Content block as it will be written: HTTP headers followed by payload
    pub fn block(&self) -> Vec<u8> {
        let http = self.http_headers.as_ref().map_or(&[][..], HttpHeaders::as_bytes);
        let mut block = Vec::with_capacity(http.len() + self.payload.len());
        block.extend_from_slice(http);
        block.extend_from_slice(&self.payload);
        block
    }

    /// Serializes the record with a `Content-Length` matching its block
    pub fn to_bytes(&self) -> Vec<u8> {
        let block = self.block();
        let mut headers = self.headers.clone();
        headers.set(CONTENT_LENGTH, block.len().to_string());

        let mut out = Vec::with_capacity(block.len() + 512);
        out.extend_from_slice(self.version.as_bytes());
        out.extend_from_slice(CRLF);
        for (name, value) in headers.iter() {
            encode_latin1(name, &mut out);
            out.extend_from_slice(b": ");
            encode_latin1(value, &mut out);
            out.extend_from_slice(CRLF);
        }
        out.extend_from_slice(CRLF);
        out.extend_from_slice(&block);
        out.extend_from_slice(CRLF);
        out.extend_from_slice(CRLF);
        out
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Decodes bytes one char per byte, so any header byte survives a round trip
pub(crate) fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Inverse of [`latin1`]; chars above U+00FF fall back to UTF-8
fn encode_latin1(text: &str, out: &mut Vec<u8>) {
    for c in text.chars() {
        match u8::try_from(c) {
            Ok(b) => out.push(b),
            Err(_) => out.extend_from_slice(c.encode_utf8(&mut [0; 4]).as_bytes()),
        }
    }
}

fn percent_encode_non_ascii(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        if b.is_ascii() && !b.is_ascii_control() {
            out.push(b as char);
        } else {
            let _ = write!(out, "%{:02X}", b);
        }
    }
    out
}
