//! Streaming implementation of byte source for parsing.
//!
//! [StreamByteSource] reads from any [Read] in chunks, so large tree files
//! can be iterated tree by tree without loading them into memory.

use crate::parser::byte_source::ByteSource;
use std::io::{ErrorKind, Read};

/// Number of bytes requested from the reader per read call
const CHUNK_SIZE: usize = 8 * 1024;

// =#========================================================================#=
// STREAM BYTE SOURCE
// =#========================================================================#=
/// A byte source pulling chunks from a [Read].
///
/// Maintains its own buffer so that [peek_slice](ByteSource::peek_slice) can
/// look ahead across chunk boundaries (e.g. for keywords like `TRANSLATE`).
/// A failing read ends the source; the error is kept and can be retrieved
/// with [take_io_error](ByteSource::take_io_error).
pub struct StreamByteSource<R: Read> {
    reader: R,
    /// Bytes read but not yet consumed start at `cursor`
    buffer: Vec<u8>,
    cursor: usize,
    /// Absolute number of consumed bytes
    pos: usize,
    exhausted: bool,
    error: Option<std::io::Error>,
}

impl<R: Read> StreamByteSource<R> {
    /// Creates a new stream byte source. Nothing is read until the first peek.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: Vec::with_capacity(CHUNK_SIZE),
            cursor: 0,
            pos: 0,
            exhausted: false,
            error: None,
        }
    }

    /// Ensures at least `k` unconsumed bytes are buffered, unless the
    /// reader is exhausted.
    fn fill(&mut self, k: usize) {
        while self.buffer.len() - self.cursor < k && !self.exhausted {
            if self.cursor > 0 {
                self.buffer.drain(..self.cursor);
                self.cursor = 0;
            }

            let old_len = self.buffer.len();
            self.buffer.resize(old_len + CHUNK_SIZE, 0);
            match self.reader.read(&mut self.buffer[old_len..]) {
                Ok(0) => {
                    self.buffer.truncate(old_len);
                    self.exhausted = true;
                }
                Ok(n) => self.buffer.truncate(old_len + n),
                Err(e) if e.kind() == ErrorKind::Interrupted => self.buffer.truncate(old_len),
                Err(e) => {
                    self.buffer.truncate(old_len);
                    self.exhausted = true;
                    self.error = Some(e);
                }
            }
        }
    }
}

impl<R: Read> ByteSource for StreamByteSource<R> {
    #[inline]
    fn peek(&mut self) -> Option<u8> {
        if self.cursor >= self.buffer.len() {
            self.fill(1);
        }
        self.buffer.get(self.cursor).copied()
    }

    #[inline]
    fn next_byte(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.cursor += 1;
        self.pos += 1;
        Some(byte)
    }

    fn peek_slice(&mut self, k: usize) -> &[u8] {
        self.fill(k);
        let end = (self.cursor + k).min(self.buffer.len());
        &self.buffer[self.cursor..end]
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn take_io_error(&mut self) -> Option<std::io::Error> {
        self.error.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    /// Hands out at most `step` bytes per read
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    struct Failing;

    impl Read for Failing {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("disk on fire"))
        }
    }

    #[test]
    fn test_peek_slice_across_reads() {
        let mut source = StreamByteSource::new(Trickle {
            data: b"TRANSLATE 1 A;",
            step: 2,
        });
        assert_eq!(source.peek_slice(9), b"TRANSLATE");
        assert_eq!(source.next_byte(), Some(b'T'));
        assert_eq!(source.peek_slice(4), b"RANS");
        assert_eq!(source.position(), 1);
    }

    #[test]
    fn test_reads_to_end() {
        let mut source = StreamByteSource::new(&b"(A,B);"[..]);
        let mut bytes = Vec::new();
        while let Some(b) = source.next_byte() {
            bytes.push(b);
        }
        assert_eq!(bytes, b"(A,B);");
        assert!(source.is_eof());
        assert!(source.take_io_error().is_none());
    }

    #[test]
    fn test_read_error_is_kept() {
        let mut source = StreamByteSource::new(Failing);
        assert_eq!(source.peek(), None);
        assert_eq!(source.take_io_error().unwrap().to_string(), "disk on fire");
    }
}
