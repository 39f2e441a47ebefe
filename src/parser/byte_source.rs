//! Byte source abstraction for parsing.
//!
//! This module provides the [ByteSource] trait implemented by
//! [InMemoryByteSource](crate::parser::in_memory_byte_source::InMemoryByteSource)
//! and [StreamByteSource](crate::parser::stream_byte_source::StreamByteSource).

// =#========================================================================#=
// BYTE SOURCE (Trait)
// =#========================================================================#=
/// Trait defining the interface for different byte sources used by
/// [ByteParser](crate::parser::byte_parser::ByteParser).
///
/// This trait abstracts over different ways of accessing byte data:
/// - Owned in-memory bytes
/// - Streams of any [std::io::Read], read chunk-wise
///
/// Sources are forward-only: there is no seeking back. Methods take
/// `&mut self` since peeking a stream may need to pull more data.
pub trait ByteSource {
    /// Peek at the current byte without consuming it.
    ///
    /// # Returns
    /// * `Some(u8)` - The current byte if available
    /// * `None` - If at end of data (EOF)
    fn peek(&mut self) -> Option<u8>;

    /// Get the current byte and advance the position (consume it).
    ///
    /// # Returns
    /// * `Some(u8)` - The current byte if available
    /// * `None` - If at end of data (EOF)
    fn next_byte(&mut self) -> Option<u8>;

    /// Returns a slice of up to `k` bytes from the current position.
    ///
    /// # Returns
    /// A byte slice containing up to `k` bytes (or fewer if EOF reached)
    fn peek_slice(&mut self, k: usize) -> &[u8];

    /// Returns up to `k` bytes from the current position for error context.
    fn get_context(&mut self, k: usize) -> Vec<u8> {
        self.peek_slice(k).to_vec()
    }

    /// Returns the number of bytes consumed so far.
    fn position(&self) -> usize;

    /// Check if at end of data.
    fn is_eof(&mut self) -> bool {
        self.peek().is_none()
    }

    /// Takes the I/O error that ended the source prematurely, if any.
    ///
    /// Sources treat read failures as EOF so parsing stops; callers check
    /// this to report the actual cause.
    fn take_io_error(&mut self) -> Option<std::io::Error> {
        None
    }
}
