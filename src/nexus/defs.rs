//! Keywords and definitions for NEXUS parsing and writing.

/// NEXUS label delimiters: comma, semicolon, equals sign, whitespace
pub(crate) const NEXUS_LABEL_DELIMITERS: &[u8] = b" ,;=\t\n\r";

/// Delimiters of `key=value` assignments in commands like `DIMENSIONS`
pub(crate) const ASSIGNMENT_DELIMITERS: &[u8] = b" =;\t\n\r";

pub(crate) const NEXUS_HEADER: &[u8] = b"#NEXUS";

// Parsed keywords (matched case-insensitively, followed by a non-word byte)
pub(crate) const KW_BEGIN: &str = "begin";
pub(crate) const KW_END: &str = "end";
pub(crate) const KW_ENDBLOCK: &str = "endblock";
pub(crate) const KW_DIMENSIONS: &str = "dimensions";
pub(crate) const KW_TAXLABELS: &str = "taxlabels";
pub(crate) const KW_TRANSLATE: &str = "translate";
pub(crate) const KW_TREE: &str = "tree";
pub(crate) const KW_FORMAT: &str = "format";
pub(crate) const KW_MATRIX: &str = "matrix";
pub(crate) const KW_TITLE: &str = "title";

// Written keywords
pub(crate) const BLOCK_BEGIN: &[u8] = b"BEGIN";
pub(crate) const BLOCK_END: &[u8] = b"END;";
pub(crate) const TAXA: &[u8] = b"TAXA";
pub(crate) const TREES: &[u8] = b"TREES";
pub(crate) const CHARACTERS: &[u8] = b"CHARACTERS";
pub(crate) const DIMENSIONS: &[u8] = b"DIMENSIONS";
pub(crate) const NTAX: &[u8] = b"NTAX";
pub(crate) const NCHAR: &[u8] = b"NCHAR";
pub(crate) const TAXLABELS: &[u8] = b"TAXLABELS";
pub(crate) const FORMAT: &[u8] = b"FORMAT";
pub(crate) const DATATYPE: &[u8] = b"DATATYPE";
pub(crate) const MISSING: &[u8] = b"MISSING";
pub(crate) const GAP: &[u8] = b"GAP";
pub(crate) const MATRIX: &[u8] = b"MATRIX";
pub(crate) const TRANSLATE: &[u8] = b"TRANSLATE";
pub(crate) const TREE: &[u8] = b"TREE";

/// Blocks of a NEXUS file this crate distinguishes.
#[derive(Debug, PartialEq, Clone)]
pub enum NexusBlock {
    Taxa,
    Trees,
    Data,
    Characters,
    UnknownBlock(String),
}

impl NexusBlock {
    /// Parse a block name (case-insensitive) into a NexusBlock variant
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "taxa" => NexusBlock::Taxa,
            "trees" => NexusBlock::Trees,
            "data" => NexusBlock::Data,
            "characters" => NexusBlock::Characters,
            _ => NexusBlock::UnknownBlock(name.trim().to_string()),
        }
    }
}
