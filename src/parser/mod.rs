//! Byte-level parsing infrastructure shared by the Newick and NEXUS formats.
//!
//! This module provides a [ByteParser](byte_parser::ByteParser) over
//! in-memory or streamed byte sources, label escaping utilities, and the
//! [ParsingError] type reported for malformed input.

pub mod byte_parser;
pub mod byte_source;
pub mod in_memory_byte_source;
pub mod parsing_error;
pub mod stream_byte_source;
pub mod utils;

pub use byte_parser::ByteParser;
pub use parsing_error::{ParsingError, ParsingErrorType};
