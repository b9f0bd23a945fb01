//! Lazy line iteration over any byte source.

use std::collections::VecDeque;
use std::io::{self, Read};

use crate::assembler::{AssemblerError, LineAssembler};

const READ_CHUNK: usize = 4096;

/// Yields complete lines from a reader as they become available.
///
/// The tail left without a delimiter is yielded once the reader reports end
/// of input. Read errors are yielded in place and iteration may continue
/// afterwards, which lets callers ride out read timeouts.
pub struct LineReader<R> {
    inner: R,
    assembler: LineAssembler,
    ready: VecDeque<String>,
    buffer: Vec<u8>,
    exhausted: bool,
}

impl<R: Read> LineReader<R> {
    /// Wraps `inner`, splitting on CRLF.
    #[must_use]
    pub fn new(inner: R) -> Self {
        Self::with_assembler(inner, LineAssembler::default())
    }

    /// Wraps `inner`, splitting on `delimiter`.
    ///
    /// # Errors
    ///
    /// Returns [`AssemblerError::EmptyDelimiter`] when `delimiter` is empty.
    pub fn with_delimiter(inner: R, delimiter: impl AsRef<[u8]>) -> Result<Self, AssemblerError> {
        LineAssembler::new(delimiter).map(|assembler| Self::with_assembler(inner, assembler))
    }

    fn with_assembler(inner: R, assembler: LineAssembler) -> Self {
        Self {
            inner,
            assembler,
            ready: VecDeque::new(),
            buffer: vec![0_u8; READ_CHUNK],
            exhausted: false,
        }
    }

    /// Returns `true` once the underlying reader reported end of input.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Consumes the wrapper, returning the reader.
    #[must_use]
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Iterator for LineReader<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(line) = self.ready.pop_front() {
                return Some(Ok(line));
            }
            if self.exhausted {
                return None;
            }

            match self.inner.read(&mut self.buffer) {
                Ok(0) => {
                    self.exhausted = true;
                    return self.assembler.finish().map(Ok);
                }
                Ok(read) => {
                    let chunk = self.buffer.get(..read).unwrap_or_default();
                    self.ready.extend(self.assembler.feed(chunk));
                }
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                Err(error) => return Some(Err(error)),
            }
        }
    }
}
