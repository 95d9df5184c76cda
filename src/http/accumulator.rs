//! Incremental HTTP/1.1 response reader.
//!
//! The transport gives no framing guarantees: a read may return one byte or
//! ten thousand, the header terminator may straddle reads, and the body may
//! arrive in the same read as the tail of the header block. Everything
//! received is appended to one growing buffer, and the header block is
//! rescanned from the start until its terminator shows up.

use crate::base::neterror::NetError;
use bytes::{Bytes, BytesMut};

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";
const CRLF: &[u8] = b"\r\n";
const CONTENT_LENGTH: &str = "Content-Length";

/// Growing buffer plus parse state for one in-flight response.
#[derive(Debug, Default)]
pub struct ResponseAccumulator {
    raw: BytesMut,
    headers_parsed: bool,
    content_length: Option<usize>,
    body_start: usize,
}

impl ResponseAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an accumulator with room for `capacity` bytes before reallocating.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            raw: BytesMut::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Append a received chunk. No upper bound is enforced.
    pub fn append(&mut self, chunk: &[u8]) {
        self.raw.extend_from_slice(chunk);
    }

    /// Look for the end of the header block.
    ///
    /// Returns `true` once headers are parsed; calls after the first success
    /// do nothing. The first parseable `Content-Length` line wins.
    pub fn try_parse_headers(&mut self) -> bool {
        if self.headers_parsed {
            return true;
        }

        let Some(header_end) = find(&self.raw, HEADER_TERMINATOR) else {
            return false;
        };

        self.headers_parsed = true;
        self.body_start = header_end + HEADER_TERMINATOR.len();

        self.content_length = header_lines(&self.raw[..header_end]).find_map(parse_content_length);

        tracing::trace!(
            header_len = header_end,
            content_length = ?self.content_length,
            "response headers parsed"
        );
        true
    }

    pub fn headers_parsed(&self) -> bool {
        self.headers_parsed
    }

    /// Declared body length, `None` until a usable header has been parsed.
    pub fn content_length(&self) -> Option<usize> {
        self.content_length
    }

    /// Offset of the first body byte, defined once headers are parsed.
    pub fn body_start(&self) -> Option<usize> {
        self.headers_parsed.then_some(self.body_start)
    }

    /// Total bytes received so far, headers included.
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Body bytes received so far (may exceed `Content-Length`).
    pub fn body_received(&self) -> usize {
        if self.headers_parsed {
            self.raw.len() - self.body_start
        } else {
            0
        }
    }

    pub fn is_body_complete(&self) -> bool {
        match (self.headers_parsed, self.content_length) {
            (true, Some(len)) => self.body_received() >= len,
            _ => false,
        }
    }

    /// Framing check: headers without a usable `Content-Length` can never
    /// complete, so they are a protocol error rather than "not yet".
    pub fn check_framing(&self) -> Result<(), NetError> {
        if self.headers_parsed && self.content_length.is_none() {
            return Err(NetError::MissingContentLength);
        }
        Ok(())
    }

    /// Exactly `Content-Length` body bytes, or `None` while incomplete.
    /// Anything past the declared length is discarded.
    pub fn extract_body(&self) -> Option<Bytes> {
        if !self.is_body_complete() {
            return None;
        }
        let len = self.content_length?;
        let body = &self.raw[self.body_start..self.body_start + len];
        Some(Bytes::copy_from_slice(body))
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Split a header block on `\r\n`. A bare `\n` stays inside its line.
fn header_lines<'a>(mut block: &'a [u8]) -> impl Iterator<Item = &'a [u8]> {
    let mut done = false;
    std::iter::from_fn(move || {
        if done {
            return None;
        }
        match find(block, CRLF) {
            Some(end) => {
                let line = &block[..end];
                block = &block[end + CRLF.len()..];
                Some(line)
            }
            None => {
                done = true;
                Some(block)
            }
        }
    })
}

/// Parse a `Content-Length: N` header line. The name is matched
/// case-insensitively; the value is everything after the first colon.
fn parse_content_length(line: &[u8]) -> Option<usize> {
    let line = std::str::from_utf8(line).ok()?;
    let (name, value) = line.split_once(':')?;
    if !name.trim().eq_ignore_ascii_case(CONTENT_LENGTH) {
        return None;
    }
    value.trim().parse::<usize>().ok()
}
