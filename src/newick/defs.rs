//! Constants and definitions for Newick parsing and writing.

/// Newick label delimiters: parentheses, comma, colon, semicolon, whitespace
pub(crate) const NEWICK_LABEL_DELIMITERS: &[u8] = b"([,:; \n\t\r)]";

/// Start of an annotation comment, e.g. `[&pop_size=2]`
pub(crate) const ANNOTATION_START: &[u8] = b"[&";

/// Rooting comments preceding a tree
pub(crate) const ROOTED_TOKEN: &[u8] = b"[&R]";
pub(crate) const UNROOTED_TOKEN: &[u8] = b"[&U]";
