//! Reassembly of delimited lines from arbitrarily chunked bytes.

use std::mem;

use thiserror::Error;

/// Delimiter used by the call-monitor wire protocol.
pub const CRLF: &str = "\r\n";

/// Errors raised while constructing a [`LineAssembler`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssemblerError {
    /// The delimiter must contain at least one byte.
    #[error("line delimiter must not be empty")]
    EmptyDelimiter,
}

/// Buffers partial input until a delimiter completes a line.
///
/// Segments are split on bytes and only then converted to text, so a
/// multi-byte character straddling two chunks survives intact. Text that is
/// not valid UTF-8 is read as Latin-1.
#[derive(Debug, Clone)]
pub struct LineAssembler {
    delimiter: Vec<u8>,
    pending: Vec<u8>,
    // No delimiter starts before this offset of `pending`.
    scanned: usize,
}

impl Default for LineAssembler {
    fn default() -> Self {
        Self {
            delimiter: CRLF.as_bytes().to_vec(),
            pending: Vec::new(),
            scanned: 0,
        }
    }
}

impl LineAssembler {
    /// Creates an assembler splitting on `delimiter`.
    ///
    /// # Errors
    ///
    /// Returns [`AssemblerError::EmptyDelimiter`] when `delimiter` is empty.
    pub fn new(delimiter: impl AsRef<[u8]>) -> Result<Self, AssemblerError> {
        let bytes = delimiter.as_ref();
        if bytes.is_empty() {
            return Err(AssemblerError::EmptyDelimiter);
        }
        Ok(Self {
            delimiter: bytes.to_vec(),
            ..Self::default()
        })
    }

    /// Delimiter bytes this assembler splits on.
    #[must_use]
    pub fn delimiter(&self) -> &[u8] {
        &self.delimiter
    }

    /// Bytes held back waiting for a delimiter.
    #[must_use]
    pub const fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Appends `chunk` and returns every line it completed, in order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        if chunk.is_empty() {
            return lines;
        }

        self.pending.extend_from_slice(chunk);
        let mut start = 0;
        let mut search_from = self.scanned;
        while let Some(position) = find(&self.pending, &self.delimiter, search_from) {
            let segment = self.pending.get(start..position).unwrap_or_default();
            lines.push(decode_text(segment.to_vec()));
            start = position + self.delimiter.len();
            search_from = start;
        }

        self.pending.drain(..start);
        self.scanned = self
            .pending
            .len()
            .saturating_sub(self.delimiter.len() - 1);
        lines
    }

    /// Flushes the unterminated tail as a final line.
    ///
    /// Returns `None` when nothing is pending, so repeated calls are harmless.
    pub fn finish(&mut self) -> Option<String> {
        self.scanned = 0;
        if self.pending.is_empty() {
            return None;
        }
        Some(decode_text(mem::take(&mut self.pending)))
    }
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|offset| offset + from)
}

/// Converts raw line bytes to text, falling back to Latin-1.
pub(crate) fn decode_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(error) => error.into_bytes().into_iter().map(char::from).collect(),
    }
}
