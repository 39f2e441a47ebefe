//! Byte source over an owned buffer, used for Newick and NEXUS strings.

use crate::parser::byte_source::ByteSource;

// =#========================================================================#=
// IN MEMORY BYTE SOURCE
// =#========================================================================#=
/// A [ByteSource] over bytes held entirely in memory.
///
/// Backs [ByteParser::for_str](crate::parser::byte_parser::ByteParser::for_str),
/// so single tree strings and small documents parse without any I/O.
/// Inputs read from files or other readers go through
/// [StreamByteSource](crate::parser::stream_byte_source::StreamByteSource) instead.
#[derive(Debug, Clone)]
pub struct InMemoryByteSource {
    bytes: Box<[u8]>,
    pos: usize,
}

impl InMemoryByteSource {
    /// Number of bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }
}

impl From<Vec<u8>> for InMemoryByteSource {
    fn from(bytes: Vec<u8>) -> Self {
        Self {
            bytes: bytes.into_boxed_slice(),
            pos: 0,
        }
    }
}

impl From<&str> for InMemoryByteSource {
    fn from(text: &str) -> Self {
        Self::from(text.as_bytes().to_vec())
    }
}

impl From<String> for InMemoryByteSource {
    fn from(text: String) -> Self {
        Self::from(text.into_bytes())
    }
}

impl ByteSource for InMemoryByteSource {
    #[inline(always)]
    fn peek(&mut self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    #[inline(always)]
    fn next_byte(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    #[inline(always)]
    fn peek_slice(&mut self, k: usize) -> &[u8] {
        let end = self.pos.saturating_add(k).min(self.bytes.len());
        &self.bytes[self.pos..end]
    }

    #[inline]
    fn position(&self) -> usize {
        self.pos
    }

    fn is_eof(&mut self) -> bool {
        self.remaining() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consumes_forward_only() {
        let mut source = InMemoryByteSource::from("(A,B);");
        assert_eq!(source.peek(), Some(b'('));
        assert_eq!(source.next_byte(), Some(b'('));
        assert_eq!(source.peek_slice(3), b"A,B");
        assert_eq!(source.position(), 1);
        assert_eq!(source.remaining(), 5);
    }

    #[test]
    fn test_slice_clamped_at_end() {
        let mut source = InMemoryByteSource::from(String::from("ab"));
        assert_eq!(source.peek_slice(usize::MAX), b"ab");
        source.next_byte();
        source.next_byte();
        assert!(source.is_eof());
        assert_eq!(source.next_byte(), None);
        assert_eq!(source.peek_slice(4), b"");
        assert_eq!(source.get_context(4), Vec::<u8>::new());
    }
}
