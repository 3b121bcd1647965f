//! Tokio codec for newline-delimited text records

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::ProtocolError;

/// Longest inbound record accepted before it is discarded.
///
/// The server never sends anything close to this; the limit only stops a
/// misbehaving peer from growing the read buffer without bound.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 64 * 1024;

/// Codec turning a byte stream into text lines and back.
///
/// Decoding strips the trailing `\n` (and a `\r` before it) and replaces
/// invalid UTF-8 sequences instead of failing, so one bad byte never costs
/// the connection. Records longer than `max_length` are skipped with a
/// warning. Encoding appends the `\n` terminator.
#[derive(Debug)]
pub struct LineCodec {
    /// Maximum record length, excluding the terminator
    max_length: usize,
    /// Offset already scanned for a terminator in the current buffer
    next_index: usize,
    /// Skipping the remainder of an oversized record
    discarding: bool,
}

impl LineCodec {
    /// Create a codec with the default maximum line length
    pub fn new() -> Self {
        Self::with_max_length(DEFAULT_MAX_LINE_LENGTH)
    }

    /// Create a codec with a custom maximum line length
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            max_length,
            next_index: 0,
            discarding: false,
        }
    }

    /// Maximum accepted record length
    pub fn max_length(&self) -> usize {
        self.max_length
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn line_to_string(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let read_to = std::cmp::min(self.max_length.saturating_add(1), src.len());
            let newline = src[self.next_index..read_to]
                .iter()
                .position(|b| *b == b'\n');

            match (self.discarding, newline) {
                (true, Some(offset)) => {
                    // Drop the tail of the oversized record and resume
                    src.advance(offset + self.next_index + 1);
                    self.discarding = false;
                    self.next_index = 0;
                }
                (true, None) => {
                    src.advance(read_to);
                    self.next_index = 0;
                    if src.is_empty() {
                        return Ok(None);
                    }
                }
                (false, Some(offset)) => {
                    let index = offset + self.next_index;
                    self.next_index = 0;
                    let line = src.split_to(index + 1);
                    return Ok(Some(line_to_string(&line[..index])));
                }
                (false, None) if src.len() > self.max_length => {
                    tracing::warn!(
                        "Discarding inbound line longer than {} bytes",
                        self.max_length
                    );
                    self.discarding = true;
                    self.next_index = 0;
                }
                (false, None) => {
                    // Need more data
                    self.next_index = read_to;
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(line) = self.decode(buf)? {
            return Ok(Some(line));
        }

        self.next_index = 0;
        if self.discarding || buf.is_empty() {
            self.discarding = false;
            buf.clear();
            return Ok(None);
        }

        // Unterminated final record
        let line = buf.split_to(buf.len());
        Ok(Some(line_to_string(&line)))
    }
}

impl<T: AsRef<str>> Encoder<T> for LineCodec {
    type Error = ProtocolError;

    fn encode(&mut self, line: T, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let line = line.as_ref();
        if line.contains(['\n', '\r']) {
            return Err(ProtocolError::EmbeddedNewline);
        }

        dst.reserve(line.len() + 1);
        dst.put_slice(line.as_bytes());
        dst.put_u8(b'\n');
        Ok(())
    }
}
