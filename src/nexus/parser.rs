//! NEXUS parser producing [DataSet]s or a lazy stream of [Tree]s.

use crate::dataio::{FormatOptions, PRESERVE_UNDERSCORES};
use crate::error::PhyloError;
use crate::model::{CharacterMatrix, DataSet, DataType, SharedTaxonSet, Taxon, TaxonSet, Tree, TreeList};
use crate::newick::{NewickParser, TaxonResolver};
use crate::nexus::defs::*;
use crate::parser::byte_parser::ByteParser;
use crate::parser::byte_source::ByteSource;
use crate::parser::parsing_error::ParsingError;
use crate::parser::utils::unescape_label;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, warn};

// =#========================================================================#=
// NEXUS PARSER
// =#========================================================================#=
/// Parser for NEXUS files with TAXA, TREES and DATA/CHARACTERS blocks.
///
/// All taxa of the file are accessioned into one taxon set, either the one
/// given by the [FormatOptions] or a fresh one. Unknown blocks and commands
/// are skipped.
///
/// # Construction
/// ```
/// use phylio::dataio::FormatOptions;
/// use phylio::nexus::NexusParser;
/// use phylio::parser::ByteParser;
///
/// let nexus = "#NEXUS
/// BEGIN TAXA;
///     DIMENSIONS NTAX=3;
///     TAXLABELS Kea Kaka Kakapo;
/// END;
/// BEGIN TREES;
///     TRANSLATE 1 Kea, 2 Kaka, 3 Kakapo;
///     TREE parrots = [&R] ((1:1,2:1):1,3:2);
/// END;";
///
/// let parser = NexusParser::new(ByteParser::for_str(nexus), &FormatOptions::default());
/// let data = parser.parse_data_set().unwrap();
/// assert_eq!(data.tree_lists[0][0].label(), Some("parrots"));
/// assert!(data.tree_lists[0][0].is_rooted());
/// ```
///
/// # Assumptions
/// * The file starts with `#NEXUS`
/// * A `TRANSLATE` command, if present, precedes the `TREE` commands of its block:
///   - Command is a comma separated list of pairs `TRANSLATE <key> <label>, ...;`
///   - If a TAXA block was read, `<label>` must match one of its taxa
/// * One tree command has format `TREE [*] <name> = [&R|&U] <Newick string>;`
/// * A `MATRIX` lists one row per taxon, `<label> <states>`; rows of the
///   same taxon appearing again (interleaved) are appended
/// * Labels with spaces or punctuation are enclosed in single quotes,
///   apostrophes are escaped by doubling them, e.g. `'Wilson''s Storm-petrel'`
pub struct NexusParser<S: ByteSource> {
    /// Accessor to the underlying bytes being parsed
    byte_parser: ByteParser<S>,
    /// Continuously used to parse Newick strings, including resolving labels
    newick_parser: NewickParser,
    taxon_set: SharedTaxonSet,
    /// Whether a TAXA block defined the taxa (then trees may not add new ones)
    has_taxa_block: bool,
    exclude_trees: bool,
    exclude_chars: bool,
    preserve_underscores: bool,
}

// ============================================================================
// Construction & Whole-File Parsing (pub)
// ============================================================================
impl<S: ByteSource> NexusParser<S> {
    /// Creates a parser over `byte_parser` configured by reader options.
    pub fn new(byte_parser: ByteParser<S>, options: &FormatOptions) -> Self {
        let taxon_set = options
            .taxon_set()
            .cloned()
            .unwrap_or_else(TaxonSet::new_shared);
        NexusParser {
            byte_parser,
            newick_parser: NewickParser::from_options(taxon_set.clone(), options),
            taxon_set,
            has_taxa_block: false,
            exclude_trees: options.exclude_trees(),
            exclude_chars: options.exclude_chars(),
            preserve_underscores: options.extra_bool(PRESERVE_UNDERSCORES, false),
        }
    }

    /// The taxon set all taxa are accessioned into.
    pub fn taxon_set(&self) -> &SharedTaxonSet {
        &self.taxon_set
    }

    /// Parses the whole source into a [DataSet].
    ///
    /// Each TREES block yields one [TreeList], each DATA/CHARACTERS block
    /// one [CharacterMatrix], unless excluded by the options.
    ///
    /// # Errors
    /// * [PhyloError::Malformed] if the file is not valid NEXUS
    /// * [PhyloError::Io] if the underlying stream failed
    pub fn parse_data_set(mut self) -> Result<DataSet, PhyloError> {
        let result = self.parse_all_blocks();
        result.map_err(|e| self.prefer_io_error(e))
    }

    /// Consumes the parser and returns a lazy iterator over the trees of
    /// all TREES blocks. Character blocks are skipped.
    pub fn into_tree_iter(self) -> NexusTreeIter<S> {
        NexusTreeIter {
            parser: self,
            state: IterState::Start,
        }
    }
}

// ============================================================================
// Blocks (private)
// ============================================================================
impl<S: ByteSource> NexusParser<S> {
    fn parse_all_blocks(&mut self) -> Result<DataSet, PhyloError> {
        self.parse_nexus_header()?;

        let mut data_set = DataSet::new();
        data_set.add_taxon_set(&self.taxon_set);

        while let Some(block) = self.detect_next_block()? {
            match block {
                NexusBlock::Taxa => self.parse_taxa_block()?,
                NexusBlock::Trees if !self.exclude_trees => {
                    let tree_list = self.parse_trees_block()?;
                    data_set.tree_lists.push(tree_list);
                }
                NexusBlock::Data | NexusBlock::Characters if !self.exclude_chars => {
                    let matrix = self.parse_characters_block()?;
                    data_set.char_matrices.push(matrix);
                }
                _ => self.skip_to_block_end()?,
            }
        }

        debug!(
            num_taxa = self.taxon_set.borrow().len(),
            num_tree_lists = data_set.tree_lists.len(),
            num_char_matrices = data_set.char_matrices.len(),
            "parsed nexus data set"
        );
        Ok(data_set)
    }

    /// Parses header `#NEXUS` at start of file or returns `MissingNexusHeader` otherwise.
    fn parse_nexus_header(&mut self) -> Result<(), ParsingError> {
        self.byte_parser.skip_comment_and_whitespace()?;

        if !self.byte_parser.consume_if_sequence(NEXUS_HEADER) {
            return Err(ParsingError::missing_nexus_header(&mut self.byte_parser));
        }

        Ok(())
    }

    /// Detects the next block, which must start with `BEGIN <name>;`, and
    /// consumes its header. Returns `None` at EOF.
    fn detect_next_block(&mut self) -> Result<Option<NexusBlock>, ParsingError> {
        self.byte_parser.skip_comment_and_whitespace()?;
        if self.byte_parser.is_eof() {
            return Ok(None);
        }

        if !self.byte_parser.consume_if_keyword(KW_BEGIN) {
            return Err(ParsingError::invalid_formatting(&mut self.byte_parser));
        }

        let name = self.byte_parser.parse_token(b";")?;
        if !self.byte_parser.consume_if(b';') {
            return Err(ParsingError::unexpected_eof(&mut self.byte_parser));
        }
        if name.trim().is_empty() {
            return Err(ParsingError::invalid_block_name(&mut self.byte_parser));
        }

        Ok(Some(NexusBlock::from_name(&name)))
    }

    /// Skips commands until and including `END;` (or `ENDBLOCK;`).
    fn skip_to_block_end(&mut self) -> Result<(), ParsingError> {
        while !self.consume_block_end()? {
            self.skip_command()?;
        }
        Ok(())
    }

    /// Consumes `END;` if it is the next command.
    fn consume_block_end(&mut self) -> Result<bool, ParsingError> {
        self.byte_parser.skip_comment_and_whitespace()?;
        if self.byte_parser.is_eof() {
            return Err(ParsingError::unexpected_eof(&mut self.byte_parser));
        }

        if self.byte_parser.consume_if_keyword(KW_END) || self.byte_parser.consume_if_keyword(KW_ENDBLOCK) {
            self.byte_parser.skip_comment_and_whitespace()?;
            self.byte_parser.consume_if(b';');
            return Ok(true);
        }
        Ok(false)
    }

    /// Skips a command up to and including its `;`, respecting quotes and comments.
    fn skip_command(&mut self) -> Result<(), ParsingError> {
        loop {
            match self.byte_parser.peek() {
                Some(b';') => {
                    self.byte_parser.next_byte();
                    return Ok(());
                }
                Some(b'\'') => {
                    self.byte_parser.parse_quoted_label()?;
                }
                Some(b'[') => {
                    self.byte_parser.skip_comment()?;
                }
                Some(_) => {
                    self.byte_parser.next_byte();
                }
                None => return Err(ParsingError::unexpected_eof(&mut self.byte_parser)),
            }
        }
    }

    /// Parses a TAXA block, accessioning `TAXLABELS` into the taxon set.
    ///
    /// # Errors
    /// [ParsingError] of kind `InvalidTaxaBlock` if the number of labels
    /// does not match a given `NTAX`.
    fn parse_taxa_block(&mut self) -> Result<(), ParsingError> {
        let mut ntax: Option<usize> = None;
        let mut num_labels = 0;

        while !self.consume_block_end()? {
            if self.byte_parser.consume_if_keyword(KW_DIMENSIONS) {
                let dims = self.parse_assignments()?;
                ntax = match dims.get("ntax") {
                    Some(value) => Some(value.parse().map_err(|_| {
                        ParsingError::invalid_taxa_block(
                            &mut self.byte_parser,
                            format!("Cannot parse `ntax` value: {}", value),
                        )
                    })?),
                    None => ntax,
                };
            } else if self.byte_parser.consume_if_keyword(KW_TAXLABELS) {
                loop {
                    self.byte_parser.skip_comment_and_whitespace()?;
                    if self.byte_parser.consume_if(b';') {
                        break;
                    }
                    if self.byte_parser.is_eof() {
                        return Err(ParsingError::unexpected_eof(&mut self.byte_parser));
                    }
                    let label = self.parse_nexus_label()?;
                    if label.is_empty() {
                        return Err(ParsingError::invalid_taxa_block(
                            &mut self.byte_parser,
                            String::from("Empty taxon label."),
                        ));
                    }
                    self.taxon_set.borrow_mut().require_taxon(&label);
                    num_labels += 1;
                }
            } else {
                self.skip_command()?;
            }
        }

        if let Some(ntax) = ntax {
            if ntax != num_labels {
                return Err(ParsingError::invalid_taxa_block(
                    &mut self.byte_parser,
                    format!(
                        "Number of parsed labels ({}) did not match ntax value ({}).",
                        num_labels, ntax
                    ),
                ));
            }
        }

        self.has_taxa_block = true;
        Ok(())
    }

    /// Parses a whole TREES block eagerly.
    fn parse_trees_block(&mut self) -> Result<TreeList, PhyloError> {
        self.start_trees_block();
        let mut tree_list = TreeList::new(self.taxon_set.clone());
        let mut title = None;

        loop {
            match self.next_trees_command()? {
                TreesCommand::Tree(tree) => {
                    // Trees always reference the parser's taxon set
                    if tree_list.push(*tree).is_err() {
                        return Err(ParsingError::invalid_trees_block(
                            &mut self.byte_parser,
                            String::from("Tree does not reference the taxon set of its block."),
                        )
                        .into());
                    }
                }
                TreesCommand::Title(t) => title = Some(t),
                TreesCommand::End => break,
            }
        }

        Ok(match title {
            Some(title) => tree_list.with_label(title),
            None => tree_list,
        })
    }

    /// Sets up the label resolver at the start of a TREES block.
    fn start_trees_block(&mut self) {
        let resolver = if self.has_taxa_block {
            TaxonResolver::KnownTaxa
        } else {
            TaxonResolver::Labels
        };
        self.newick_parser.set_resolver(resolver);
    }

    /// Parses the next command of a TREES block: `TRANSLATE` is applied to
    /// the resolver, `TREE` yields a tree, `END;` ends the block.
    fn next_trees_command(&mut self) -> Result<TreesCommand, PhyloError> {
        loop {
            if self.consume_block_end()? {
                return Ok(TreesCommand::End);
            }

            if self.byte_parser.consume_if_keyword(KW_TRANSLATE) {
                let map = self.parse_translate_command()?;
                self.newick_parser.set_resolver(TaxonResolver::Translate(map));
            } else if self.byte_parser.consume_if_keyword(KW_TREE) {
                let tree = self.parse_tree_command()?;
                return Ok(TreesCommand::Tree(Box::new(tree)));
            } else if self.byte_parser.consume_if_keyword(KW_TITLE) {
                let title = self.parse_nexus_label()?;
                self.skip_command()?;
                return Ok(TreesCommand::Title(title));
            } else {
                self.skip_command()?;
            }
        }
    }

    /// Parses `TRANSLATE <key> <label>, ...;` (keyword already consumed).
    ///
    /// With a TAXA block present, labels must name known taxa; otherwise
    /// they are accessioned.
    fn parse_translate_command(&mut self) -> Result<HashMap<String, Rc<Taxon>>, ParsingError> {
        let mut map = HashMap::new();
        loop {
            self.byte_parser.skip_comment_and_whitespace()?;
            if self.byte_parser.consume_if(b';') {
                break;
            }

            let (key, _) = self.byte_parser.parse_label(NEXUS_LABEL_DELIMITERS)?;
            let label = self.parse_nexus_label()?;
            if key.is_empty() || label.is_empty() {
                return Err(ParsingError::invalid_translate_command(
                    &mut self.byte_parser,
                    String::from("Expected pair of key and label."),
                ));
            }

            let taxon = if self.has_taxa_block {
                self.taxon_set.borrow().get_taxon(&label)
            } else {
                Some(self.taxon_set.borrow_mut().require_taxon(&label))
            };
            let Some(taxon) = taxon else {
                return Err(ParsingError::invalid_translate_command(
                    &mut self.byte_parser,
                    format!("Label '{}' not declared in TAXA block.", label),
                ));
            };
            if map.insert(key.clone(), taxon).is_some() {
                warn!(key = key.as_str(), "duplicate TRANSLATE key, last mapping wins");
            }

            self.byte_parser.skip_comment_and_whitespace()?;
            if self.byte_parser.consume_if(b',') {
                continue;
            }
            if self.byte_parser.consume_if(b';') {
                break;
            }
            let found = self.byte_parser.peek().map(|b| b as char);
            return Err(ParsingError::invalid_translate_command(
                &mut self.byte_parser,
                format!("Unexpected char {:?} in TRANSLATE.", found),
            ));
        }
        Ok(map)
    }

    /// Parses `[*] <name> = <newick>;` (keyword already consumed).
    fn parse_tree_command(&mut self) -> Result<Tree, PhyloError> {
        self.byte_parser.skip_comment_and_whitespace()?;
        // "*" marks the default tree (PAUP)
        self.byte_parser.consume_if(b'*');

        let name = self.parse_nexus_label()?;

        self.byte_parser.skip_comment_and_whitespace()?;
        if !self.byte_parser.consume_if(b'=') {
            return Err(ParsingError::invalid_trees_block(
                &mut self.byte_parser,
                String::from("Expected '=' after tree name in tree command."),
            )
            .into());
        }

        let label = (!name.is_empty()).then_some(name);
        self.newick_parser.parse_tree_with_label(&mut self.byte_parser, label)
    }

    /// Parses a DATA or CHARACTERS block into a [CharacterMatrix].
    fn parse_characters_block(&mut self) -> Result<CharacterMatrix, ParsingError> {
        let mut nchar: Option<usize> = None;
        let mut datatype = DataType::Standard;
        let mut missing = '?';
        let mut gap = '-';
        let mut matrix: Option<CharacterMatrix> = None;

        while !self.consume_block_end()? {
            if self.byte_parser.consume_if_keyword(KW_DIMENSIONS) {
                let dims = self.parse_assignments()?;
                if let Some(value) = dims.get("nchar") {
                    nchar = Some(value.parse().map_err(|_| {
                        ParsingError::invalid_characters_block(
                            &mut self.byte_parser,
                            format!("Cannot parse `nchar` value: {}", value),
                        )
                    })?);
                }
            } else if self.byte_parser.consume_if_keyword(KW_FORMAT) {
                let format = self.parse_assignments()?;
                if let Some(name) = format.get("datatype") {
                    datatype = DataType::from_name(name).ok_or_else(|| {
                        ParsingError::invalid_characters_block(
                            &mut self.byte_parser,
                            format!("Unsupported datatype: {}", name),
                        )
                    })?;
                }
                if let Some(c) = format.get("missing").and_then(|v| v.chars().next()) {
                    missing = c;
                }
                if let Some(c) = format.get("gap").and_then(|v| v.chars().next()) {
                    gap = c;
                }
            } else if self.byte_parser.consume_if_keyword(KW_MATRIX) {
                let mut parsed = CharacterMatrix::new(self.taxon_set.clone(), datatype)
                    .with_symbols(missing, gap);
                self.parse_matrix(&mut parsed, nchar)?;
                matrix = Some(parsed);
            } else {
                self.skip_command()?;
            }
        }

        let matrix = matrix.unwrap_or_else(|| {
            CharacterMatrix::new(self.taxon_set.clone(), datatype).with_symbols(missing, gap)
        });

        if let Some(nchar) = nchar {
            if let Some((taxon, row)) = matrix.rows().find(|(_, row)| row.chars().count() != nchar) {
                let msg = format!(
                    "Row of '{}' has {} characters, expected nchar={}.",
                    taxon.label(),
                    row.chars().count(),
                    nchar
                );
                return Err(ParsingError::invalid_characters_block(&mut self.byte_parser, msg));
            }
        }

        Ok(matrix)
    }

    /// Parses the rows of a `MATRIX` command up to and including `;`.
    ///
    /// A row ends at the end of its line or, if `nchar` is known, once it
    /// is complete.
    fn parse_matrix(&mut self, matrix: &mut CharacterMatrix, nchar: Option<usize>) -> Result<(), ParsingError> {
        loop {
            self.byte_parser.skip_comment_and_whitespace()?;
            if self.byte_parser.consume_if(b';') {
                return Ok(());
            }
            if self.byte_parser.is_eof() {
                return Err(ParsingError::unexpected_eof(&mut self.byte_parser));
            }

            let label = self.parse_nexus_label()?;
            let taxon = if self.has_taxa_block {
                self.taxon_set.borrow().get_taxon(&label)
            } else {
                Some(self.taxon_set.borrow_mut().require_taxon(&label))
            };
            let Some(taxon) = taxon else {
                return Err(ParsingError::invalid_characters_block(
                    &mut self.byte_parser,
                    format!("Taxon '{}' not declared in TAXA block.", label),
                ));
            };

            // States are ASCII, so `states.len()` counts symbols
            let existing = matrix.row(&taxon).map_or(0, |row| row.chars().count());
            let mut states = String::new();
            loop {
                match self.byte_parser.peek() {
                    None | Some(b';') | Some(b'\n') | Some(b'\r') => break,
                    Some(b' ') | Some(b'\t') => {
                        self.byte_parser.next_byte();
                    }
                    Some(b'[') => {
                        self.byte_parser.skip_comment()?;
                    }
                    Some(b) => {
                        if nchar.is_some_and(|n| existing + states.len() >= n) {
                            break;
                        }
                        if !b.is_ascii() {
                            return Err(ParsingError::invalid_characters_block(
                                &mut self.byte_parser,
                                format!("Non-ASCII state symbol in row of taxon '{}'.", label),
                            ));
                        }
                        states.push(char::from(b));
                        self.byte_parser.next_byte();
                    }
                }
            }
            matrix.extend_row(taxon, &states);
        }
    }

    /// Parses `key = value` pairs until and including `;`. Keys are lowercased.
    fn parse_assignments(&mut self) -> Result<HashMap<String, String>, ParsingError> {
        let mut pairs = HashMap::new();
        loop {
            self.byte_parser.skip_comment_and_whitespace()?;
            if self.byte_parser.consume_if(b';') {
                return Ok(pairs);
            }
            if self.byte_parser.is_eof() {
                return Err(ParsingError::unexpected_eof(&mut self.byte_parser));
            }

            let key = self.byte_parser.parse_unquoted_label(ASSIGNMENT_DELIMITERS);
            if key.is_empty() {
                return Err(ParsingError::invalid_formatting(&mut self.byte_parser));
            }
            self.byte_parser.skip_comment_and_whitespace()?;

            let value = if self.byte_parser.consume_if(b'=') {
                self.byte_parser.skip_comment_and_whitespace()?;
                match self.byte_parser.peek() {
                    Some(b'\'') => self.byte_parser.parse_quoted_label()?,
                    Some(b'"') => {
                        self.byte_parser.next_byte();
                        let mut value = Vec::new();
                        loop {
                            match self.byte_parser.next_byte() {
                                Some(b'"') => break,
                                Some(b) => value.push(b),
                                None => return Err(ParsingError::unexpected_eof(&mut self.byte_parser)),
                            }
                        }
                        String::from_utf8_lossy(&value).into_owned()
                    }
                    _ => self.byte_parser.parse_unquoted_label(ASSIGNMENT_DELIMITERS),
                }
            } else {
                // Flags like INTERLEAVE
                String::new()
            };
            pairs.insert(key.to_ascii_lowercase(), value);
        }
    }

    /// Parses a (possibly quoted) label and reverts the underscore convention.
    fn parse_nexus_label(&mut self) -> Result<String, ParsingError> {
        let (label, quoted) = self.byte_parser.parse_label(NEXUS_LABEL_DELIMITERS)?;
        Ok(unescape_label(&label, quoted, self.preserve_underscores))
    }

    /// Replaces a parsing error by the I/O error that truncated the input, if any.
    fn prefer_io_error(&mut self, err: PhyloError) -> PhyloError {
        if matches!(err, PhyloError::Malformed(_)) {
            if let Some(io_err) = self.byte_parser.take_io_error() {
                return io_err.into();
            }
        }
        err
    }
}

/// Result of one step through a TREES block.
enum TreesCommand {
    Tree(Box<Tree>),
    Title(String),
    End,
}

// =#========================================================================#=
// NEXUS TREE ITERATOR (lazy parser)
// =#========================================================================#=
enum IterState {
    /// Header not yet parsed
    Start,
    /// Between blocks
    Blocks,
    /// Inside a TREES block
    Trees,
    Done,
}

/// Iterator over the trees of all TREES blocks of a NEXUS source.
///
/// Created by [NexusParser::into_tree_iter()]. TAXA blocks are parsed as
/// they are passed, other blocks skipped. Yields `Result<Tree, PhyloError>`
/// for each tree and stops after the first error.
pub struct NexusTreeIter<S: ByteSource> {
    parser: NexusParser<S>,
    state: IterState,
}

impl<S: ByteSource> NexusTreeIter<S> {
    /// The taxon set trees of this iterator reference.
    pub fn taxon_set(&self) -> &SharedTaxonSet {
        self.parser.taxon_set()
    }

    fn advance(&mut self) -> Result<Option<Tree>, PhyloError> {
        loop {
            match self.state {
                IterState::Start => {
                    self.parser.parse_nexus_header()?;
                    self.state = IterState::Blocks;
                }
                IterState::Blocks => match self.parser.detect_next_block()? {
                    None => {
                        self.state = IterState::Done;
                        return Ok(None);
                    }
                    Some(NexusBlock::Taxa) => self.parser.parse_taxa_block()?,
                    Some(NexusBlock::Trees) => {
                        self.parser.start_trees_block();
                        self.state = IterState::Trees;
                    }
                    Some(_) => self.parser.skip_to_block_end()?,
                },
                IterState::Trees => match self.parser.next_trees_command()? {
                    TreesCommand::Tree(tree) => return Ok(Some(*tree)),
                    TreesCommand::Title(_) => {}
                    TreesCommand::End => self.state = IterState::Blocks,
                },
                IterState::Done => return Ok(None),
            }
        }
    }
}

impl<S: ByteSource> Iterator for NexusTreeIter<S> {
    type Item = Result<Tree, PhyloError>;

    fn next(&mut self) -> Option<Self::Item> {
        if matches!(self.state, IterState::Done) {
            return None;
        }

        match self.advance() {
            Ok(Some(tree)) => Some(Ok(tree)),
            Ok(None) => {
                self.state = IterState::Done;
                self.parser.byte_parser.take_io_error().map(|e| Err(e.into()))
            }
            Err(err) => {
                self.state = IterState::Done;
                Some(Err(self.parser.prefer_io_error(err)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parsing_error::ParsingErrorType;

    fn parse(nexus: &str) -> Result<DataSet, PhyloError> {
        NexusParser::new(ByteParser::for_str(nexus), &FormatOptions::default()).parse_data_set()
    }

    fn malformed_kind(result: Result<DataSet, PhyloError>) -> ParsingErrorType {
        match result {
            Err(PhyloError::Malformed(e)) => e.kind().clone(),
            other => panic!("expected malformed error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_header() {
        assert_eq!(
            malformed_kind(parse("BEGIN TAXA; END;")),
            ParsingErrorType::MissingNexusHeader
        );
    }

    #[test]
    fn test_ntax_mismatch() {
        let nexus = "#NEXUS\nBEGIN TAXA;\n DIMENSIONS NTAX=3;\n TAXLABELS A B;\nEND;";
        assert!(matches!(malformed_kind(parse(nexus)), ParsingErrorType::InvalidTaxaBlock(_)));
    }

    #[test]
    fn test_unknown_blocks_and_commands_skipped() {
        let nexus = "#NEXUS
[comment]
BEGIN ASSUMPTIONS; usertype x = 'a;b'; END;
BEGIN TREES;
    LINK TAXA = x;
    TREE * one = (A,(B,C));
ENDBLOCK;
BEGIN MrBayes; mcmc ngen=10; end;";
        let data = parse(nexus).unwrap();
        assert_eq!(data.tree_lists.len(), 1);
        assert_eq!(data.tree_lists[0][0].label(), Some("one"));
        assert_eq!(data.taxon_sets[0].borrow().labels(), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_translate_requires_known_taxa() {
        let nexus = "#NEXUS
BEGIN TAXA; DIMENSIONS NTAX=2; TAXLABELS A B; END;
BEGIN TREES; TRANSLATE 1 A, 2 Z; TREE t = (1,2); END;";
        assert!(matches!(
            malformed_kind(parse(nexus)),
            ParsingErrorType::InvalidTranslateCommand(_)
        ));
    }

    #[test]
    fn test_tree_with_unknown_taxon() {
        let nexus = "#NEXUS
BEGIN TAXA; DIMENSIONS NTAX=2; TAXLABELS A B; END;
BEGIN TREES; TREE t = (A,X); END;";
        assert!(matches!(malformed_kind(parse(nexus)), ParsingErrorType::UnresolvedLabel(_)));
    }

    #[test]
    fn test_characters_block() {
        let nexus = "#NEXUS
BEGIN TAXA; DIMENSIONS NTAX=2; TAXLABELS 'Little_Blue' Kororā; END;
BEGIN CHARACTERS;
    DIMENSIONS NCHAR=8;
    FORMAT DATATYPE=DNA MISSING=? GAP=- ;
    MATRIX
        'Little_Blue' ACGT ACGT
        Kororā        ACG- ?CGT
    ;
END;";
        let data = parse(nexus).unwrap();
        let matrix = &data.char_matrices[0];
        assert_eq!(matrix.datatype(), DataType::Dna);
        assert_eq!(matrix.num_rows(), 2);
        let taxa = data.taxon_sets[0].borrow();
        assert_eq!(matrix.row(&taxa[0]), Some("ACGTACGT"));
        assert_eq!(matrix.row(&taxa[1]), Some("ACG-?CGT"));
    }

    #[test]
    fn test_interleaved_matrix_and_wrong_nchar() {
        let nexus = "#NEXUS
BEGIN DATA;
    DIMENSIONS NTAX=2 NCHAR=6;
    FORMAT DATATYPE=STANDARD INTERLEAVE;
    MATRIX
        A 010
        B 111
        A 110
        B 000
    ;
END;";
        let data = parse(nexus).unwrap();
        let taxa = data.taxon_sets[0].borrow();
        assert_eq!(data.char_matrices[0].row(&taxa[0]), Some("010110"));

        let wrong = nexus.replace("NCHAR=6", "NCHAR=7");
        assert!(matches!(
            malformed_kind(parse(&wrong)),
            ParsingErrorType::InvalidCharactersBlock(_)
        ));
    }

    #[test]
    fn test_non_ascii_state_symbol() {
        let nexus = "#NEXUS
BEGIN DATA;
    DIMENSIONS NTAX=2 NCHAR=4;
    FORMAT DATATYPE=STANDARD;
    MATRIX
        A 0101
        B 01ø1
    ;
END;";
        match parse(nexus) {
            Err(PhyloError::Malformed(e)) => {
                assert!(matches!(e.kind(), ParsingErrorType::InvalidCharactersBlock(_)));
                assert!(e.to_string().contains("Non-ASCII state symbol"), "{e}");
            }
            other => panic!("expected malformed error, got {other:?}"),
        }
    }

    #[test]
    fn test_exclusions() {
        let nexus = "#NEXUS
BEGIN DATA; DIMENSIONS NCHAR=2; MATRIX A 01 B 10; END;
BEGIN TREES; TREE t = (A,B); END;";
        let options = FormatOptions::new().with_exclude_chars(true);
        let data = NexusParser::new(ByteParser::for_str(nexus), &options).parse_data_set().unwrap();
        assert!(data.char_matrices.is_empty());
        assert_eq!(data.tree_lists.len(), 1);

        let options = FormatOptions::new().with_exclude_trees(true);
        let data = NexusParser::new(ByteParser::for_str(nexus), &options).parse_data_set().unwrap();
        assert_eq!(data.char_matrices[0].num_rows(), 2);
        assert!(data.tree_lists.is_empty());
    }

    #[test]
    fn test_tree_iter_over_blocks() {
        let nexus = "#NEXUS
BEGIN TREES; TREE a = (A,B); TREE b = (B,C); END;
BEGIN TREES; TREE c = (C,D); END;";
        let iter = NexusParser::new(ByteParser::for_str(nexus), &FormatOptions::default()).into_tree_iter();
        let labels: Vec<String> = iter
            .map(|t| t.unwrap().label().unwrap().to_string())
            .collect();
        assert_eq!(labels, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_tree_iter_stops_after_error() {
        let nexus = "#NEXUS\nBEGIN TREES; TREE a = (A,B); TREE b = (A,B; TREE c = (A,B); END;";
        let results: Vec<_> =
            NexusParser::new(ByteParser::for_str(nexus), &FormatOptions::default()).into_tree_iter().collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }
}
