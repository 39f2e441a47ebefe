//! Newick parser building [Tree]s over a shared taxon set.
//!
//! This module provides the [NewickParser] struct, which parses one or more
//! Newick strings from a [ByteParser], and the lazy [NewickIterator].

use crate::dataio::{FormatOptions, PRESERVE_UNDERSCORES};
use crate::error::PhyloError;
use crate::model::{Annotations, AnnotationValue, EdgeLength, NodeIndex, Rooting, SharedTaxonSet, Tree};
use crate::newick::defs::{ANNOTATION_START, NEWICK_LABEL_DELIMITERS, ROOTED_TOKEN, UNROOTED_TOKEN};
use crate::newick::resolver::TaxonResolver;
use crate::parser::byte_parser::ByteParser;
use crate::parser::byte_source::ByteSource;
use crate::parser::parsing_error::ParsingError;
use crate::parser::utils::unescape_label;
use tracing::trace;

/// Parser (configuration) for Newick strings.
///
/// Supports parsing single or multiple Newick trees. All trees reference the
/// same taxon set; leaf labels are mapped to taxa by a [TaxonResolver].
/// Internal node labels are kept as node labels (e.g. support values).
///
/// # Configuration
/// * [`with_resolver(resolver)`](Self::with_resolver) - how leaf labels map to taxa
/// * [`with_annotations()`](Self::with_annotations) - parse `[&key=value,...]`
///   comments into node and edge annotations instead of skipping them
/// * [`with_preserve_underscores()`](Self::with_preserve_underscores) - keep
///   underscores in unquoted labels instead of reading them as spaces
/// * [`with_rooting(rooting)`](Self::with_rooting) - override `[&R]`/`[&U]`
/// * [`with_encode_splits()`](Self::with_encode_splits) - encode splits of each tree
///
/// # Format
/// * `tree ::= [rooting] node ';'`
/// * `node ::= ['(' node (',' node)* ')'] [label] [annotation] [':' length [annotation]]`
///
/// Whitespace and `[...]` comments can occur between all elements.
/// Annotations following the label belong to the node, those following the
/// edge length to the edge.
///
/// # Example
/// ```
/// use phylio::model::TaxonSet;
/// use phylio::newick::NewickParser;
/// use phylio::parser::ByteParser;
///
/// let taxa = TaxonSet::new_shared();
/// let mut parser = NewickParser::new(taxa.clone());
/// let mut input = ByteParser::for_str("((A:1,B:1)90:0.5,C:1.5);");
/// let tree = parser.parse_tree(&mut input).unwrap();
///
/// assert_eq!(tree.num_leaves(), 3);
/// assert_eq!(taxa.borrow().labels(), vec!["A", "B", "C"]);
/// ```
#[derive(Debug, Clone)]
pub struct NewickParser {
    taxon_set: SharedTaxonSet,
    resolver: TaxonResolver,
    parse_annotations: bool,
    preserve_underscores: bool,
    rooting: Option<Rooting>,
    encode_splits: bool,
}

// ============================================================================
// Construction & Configuration (pub)
// ============================================================================
impl NewickParser {
    /// Creates a new parser adding taxa to `taxon_set` as needed.
    pub fn new(taxon_set: SharedTaxonSet) -> Self {
        Self {
            taxon_set,
            resolver: TaxonResolver::Labels,
            parse_annotations: false,
            preserve_underscores: false,
            rooting: None,
            encode_splits: false,
        }
    }

    /// Creates a parser configured from reader options.
    pub fn from_options(taxon_set: SharedTaxonSet, options: &FormatOptions) -> Self {
        let mut parser = Self::new(taxon_set);
        parser.parse_annotations = options.annotations();
        parser.preserve_underscores = options.extra_bool(PRESERVE_UNDERSCORES, false);
        parser.rooting = options.rooting();
        parser.encode_splits = options.encode_splits();
        parser
    }

    /// Sets the [TaxonResolver] mapping leaf labels to taxa.
    pub fn with_resolver(mut self, resolver: TaxonResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub(crate) fn set_resolver(&mut self, resolver: TaxonResolver) -> &mut Self {
        self.resolver = resolver;
        self
    }

    /// Configures the parser to parse annotations.
    pub fn with_annotations(mut self) -> Self {
        self.parse_annotations = true;
        self
    }

    /// Keeps underscores in unquoted labels.
    pub fn with_preserve_underscores(mut self) -> Self {
        self.preserve_underscores = true;
        self
    }

    /// Overrides the rooting state of all parsed trees.
    pub fn with_rooting(mut self, rooting: Rooting) -> Self {
        self.rooting = Some(rooting);
        self
    }

    /// Encodes splits of every parsed tree.
    pub fn with_encode_splits(mut self) -> Self {
        self.encode_splits = true;
        self
    }

    /// The taxon set parsed trees reference.
    pub fn taxon_set(&self) -> &SharedTaxonSet {
        &self.taxon_set
    }

    /// Whether unquoted underscores are kept.
    pub(crate) fn preserve_underscores(&self) -> bool {
        self.preserve_underscores
    }
}

// ============================================================================
// API Parsing (pub)
// ============================================================================
impl NewickParser {
    /// Consumes the parser and returns an iterator over trees from the byte source.
    ///
    /// # Arguments
    /// * `byte_parser` - A byte parser with underlying source containing only
    ///   Newick strings, except for whitespace and `[...]` comments.
    pub fn into_iter<S: ByteSource>(self, byte_parser: ByteParser<S>) -> NewickIterator<S> {
        NewickIterator {
            byte_parser,
            parser: self,
            done: false,
        }
    }

    /// Parses all Newick trees from the byte source until EOF.
    pub fn parse_all<S: ByteSource>(
        &mut self,
        mut byte_parser: ByteParser<S>,
    ) -> Result<Vec<Tree>, PhyloError> {
        let mut trees = Vec::new();
        loop {
            byte_parser.skip_comment_and_whitespace()?;
            if byte_parser.is_eof() {
                break;
            }
            trees.push(self.parse_tree(&mut byte_parser)?);
        }
        if let Some(err) = byte_parser.take_io_error() {
            return Err(err.into());
        }
        Ok(trees)
    }

    /// Parses a single Newick tree from the given [ByteParser].
    ///
    /// # Arguments
    /// * `parser` - The byte parser positioned at the start of a Newick tree string
    ///   (leading whitespace and comments are skipped)
    ///
    /// # Errors
    /// * [PhyloError::Malformed] if the Newick string is invalid
    /// * [PhyloError::Io] if the underlying stream failed
    pub fn parse_tree<S: ByteSource>(
        &mut self,
        parser: &mut ByteParser<S>,
    ) -> Result<Tree, PhyloError> {
        self.parse_tree_with_label(parser, None)
    }

    /// Like [parse_tree](Self::parse_tree), labelling the tree.
    pub(crate) fn parse_tree_with_label<S: ByteSource>(
        &mut self,
        parser: &mut ByteParser<S>,
        label: Option<String>,
    ) -> Result<Tree, PhyloError> {
        let mut tree = Tree::new(self.taxon_set.clone());
        tree.set_label(label);

        if let Err(err) = self.parse_root(parser, &mut tree) {
            return Err(match parser.take_io_error() {
                Some(io_err) => io_err.into(),
                None => err.into(),
            });
        }

        if let Some(rooting) = self.rooting {
            tree.set_rooting(rooting);
        }
        if self.encode_splits {
            tree.encode_splits()?;
        }
        trace!(label = tree.label(), num_nodes = tree.num_nodes(), "parsed newick tree");
        Ok(tree)
    }
}

// ============================================================================
// Parsing
// ============================================================================
impl NewickParser {
    /// Parses optional rooting token, the seed's subtree and the terminating `;`.
    fn parse_root<S: ByteSource>(
        &mut self,
        parser: &mut ByteParser<S>,
        tree: &mut Tree,
    ) -> Result<(), ParsingError> {
        parser.skip_whitespace();
        loop {
            if parser.consume_if_sequence(ROOTED_TOKEN) {
                tree.set_rooting(Rooting::Rooted);
            } else if parser.consume_if_sequence(UNROOTED_TOKEN) {
                tree.set_rooting(Rooting::Unrooted);
            } else if !parser.skip_comment()? {
                break;
            }
            parser.skip_whitespace();
        }

        if parser.is_eof() {
            return Err(ParsingError::unexpected_eof(parser));
        }

        let seed = tree.seed_index();
        self.parse_node(parser, tree, seed)?;

        parser.skip_comment_and_whitespace()?;
        if !parser.consume_if(b';') {
            let found = parser.peek().map(|b| b as char);
            return Err(ParsingError::invalid_newick_string(
                parser,
                format!("Expected ';' at end of tree but found {:?}", found),
            ));
        }

        Ok(())
    }

    /// Parses a node (children, label, annotations, edge length) into the
    /// already existing node `index`.
    fn parse_node<S: ByteSource>(
        &mut self,
        parser: &mut ByteParser<S>,
        tree: &mut Tree,
        index: NodeIndex,
    ) -> Result<(), ParsingError> {
        parser.skip_comment_and_whitespace()?;
        let is_internal = parser.peek() == Some(b'(');
        if is_internal {
            self.parse_children(parser, tree, index)?;
        }

        self.parse_label(parser, tree, index, is_internal)?;

        let node_annotations = self.parse_comments(parser)?;
        if let Some(annotations) = node_annotations {
            *tree.node_annotations_mut(index) = annotations;
        }

        if let Some(length) = self.parse_edge_length(parser)? {
            tree.node_mut(index).edge.length = Some(length);
            if let Some(annotations) = self.parse_comments(parser)? {
                *tree.edge_annotations_mut(index) = annotations;
            }
        }

        Ok(())
    }

    /// Parses `(node, node, ...)` and attaches the children to `parent` in order.
    /// Expects parser at opening `(`.
    fn parse_children<S: ByteSource>(
        &mut self,
        parser: &mut ByteParser<S>,
        tree: &mut Tree,
        parent: NodeIndex,
    ) -> Result<(), ParsingError> {
        parser.next_byte(); // consume '('

        loop {
            let child = tree.push_node();
            self.parse_node(parser, tree, child)?;
            tree.attach(parent, child);

            parser.skip_comment_and_whitespace()?;
            match parser.next_byte() {
                Some(b',') => continue,
                Some(b')') => break,
                Some(b) => {
                    return Err(ParsingError::invalid_newick_string(
                        parser,
                        format!("Expected ',' or ')' after child but found {:?}", b as char),
                    ));
                }
                None => return Err(ParsingError::unexpected_eof(parser)),
            }
        }

        Ok(())
    }

    /// Parses an optional label. Leaf labels are resolved to taxa, internal
    /// labels are kept as node labels.
    fn parse_label<S: ByteSource>(
        &mut self,
        parser: &mut ByteParser<S>,
        tree: &mut Tree,
        index: NodeIndex,
        is_internal: bool,
    ) -> Result<(), ParsingError> {
        // Comments before the label stay for parse_comments (annotations)
        parser.skip_whitespace();
        let (raw, quoted) = if parser.peek() == Some(b'\'') {
            (parser.parse_quoted_label()?, true)
        } else {
            (parser.parse_unquoted_label(NEWICK_LABEL_DELIMITERS), false)
        };
        if raw.is_empty() && !quoted {
            return Ok(());
        }
        let label = unescape_label(&raw, quoted, self.preserve_underscores);

        if is_internal {
            tree.node_mut(index).label = Some(label);
        } else {
            let taxon = self
                .resolver
                .resolve(&self.taxon_set, &raw, &label)
                .map_err(|msg| ParsingError::unresolved_label(parser, msg))?;
            tree.node_mut(index).taxon = Some(taxon);
        }
        Ok(())
    }

    /// Parses optional edge length `[:number]`, supporting scientific notation.
    fn parse_edge_length<S: ByteSource>(
        &mut self,
        parser: &mut ByteParser<S>,
    ) -> Result<Option<EdgeLength>, ParsingError> {
        if !parser.consume_if(b':') {
            return Ok(None);
        }
        parser.skip_comment_and_whitespace()?;

        let mut length_str = String::new();
        while let Some(b) = parser.peek() {
            // Valid characters for a float: digits, '.', '-', '+', 'e', 'E'
            if b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E') {
                length_str.push(b as char);
                parser.next_byte();
            } else {
                break;
            }
        }

        let value: f64 = length_str.parse().map_err(|_| {
            ParsingError::invalid_edge_length(parser, format!("cannot parse '{}'", length_str))
        })?;
        EdgeLength::try_new(value)
            .map(Some)
            .map_err(|e| ParsingError::invalid_edge_length(parser, e.to_string()))
    }

    /// Skips whitespace and comments. Annotation comments are collected if
    /// annotation parsing is enabled.
    fn parse_comments<S: ByteSource>(
        &mut self,
        parser: &mut ByteParser<S>,
    ) -> Result<Option<Annotations>, ParsingError> {
        let mut collected: Option<Annotations> = None;
        loop {
            parser.skip_whitespace();
            if self.parse_annotations && parser.peek_is_sequence(ANNOTATION_START) {
                let annotations = collected.get_or_insert_with(Annotations::new);
                parse_annotation_block(parser, annotations)?;
            } else if !parser.skip_comment()? {
                break;
            }
        }
        Ok(collected)
    }
}

/// Parses an annotation block `[&key=value,...]` into `annotations`.
///
/// Values may be quoted (`"..."` or `'...'`) or brace sets (`{1,2}`), which
/// are kept as strings.
fn parse_annotation_block<S: ByteSource>(
    parser: &mut ByteParser<S>,
    annotations: &mut Annotations,
) -> Result<(), ParsingError> {
    parser.consume_if_sequence(ANNOTATION_START);

    loop {
        parser.skip_whitespace();
        let key = parser.parse_unquoted_label(b"=,]");
        let key = key.trim();
        if key.is_empty() {
            return Err(ParsingError::invalid_newick_string(
                parser,
                "Empty annotation key".to_string(),
            ));
        }

        let value = if parser.consume_if(b'=') {
            parse_annotation_value(parser)?
        } else {
            // Flag without value, e.g. [&!collapse]
            AnnotationValue::Int(1)
        };
        annotations.set(key, value);

        parser.skip_whitespace();
        match parser.next_byte() {
            Some(b',') => continue,
            Some(b']') => break,
            _ => {
                return Err(ParsingError::invalid_newick_string(
                    parser,
                    "Expected ',' or ']' in annotation block".to_string(),
                ));
            }
        }
    }

    Ok(())
}

fn parse_annotation_value<S: ByteSource>(
    parser: &mut ByteParser<S>,
) -> Result<AnnotationValue, ParsingError> {
    parser.skip_whitespace();
    match parser.peek() {
        Some(quote @ (b'"' | b'\'')) => {
            parser.next_byte();
            let mut value = Vec::new();
            loop {
                match parser.next_byte() {
                    Some(b) if b == quote => break,
                    Some(b) => value.push(b),
                    None => return Err(ParsingError::unexpected_eof(parser)),
                }
            }
            Ok(AnnotationValue::String(String::from_utf8_lossy(&value).into_owned()))
        }
        Some(b'{') => {
            let mut value = Vec::new();
            let mut depth = 0usize;
            loop {
                let b = parser.next_byte().ok_or_else(|| ParsingError::unexpected_eof(parser))?;
                value.push(b);
                match b {
                    b'{' => depth += 1,
                    b'}' => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    _ => {}
                }
            }
            Ok(AnnotationValue::String(String::from_utf8_lossy(&value).into_owned()))
        }
        _ => {
            let raw = parser.parse_unquoted_label(b",]");
            let raw = raw.trim();
            if raw.is_empty() {
                return Err(ParsingError::invalid_newick_string(
                    parser,
                    "Empty annotation value".to_string(),
                ));
            }
            Ok(AnnotationValue::parse(raw))
        }
    }
}

// =#========================================================================#=
// NEWICK ITERATOR (lazy parser)
// =#========================================================================#=
/// Iterator to parse Newick trees.
///
/// Created by [NewickParser::into_iter()].
/// Yields `Result<Tree, PhyloError>` for each tree and stops after the first error.
pub struct NewickIterator<S: ByteSource> {
    parser: NewickParser,
    byte_parser: ByteParser<S>,
    done: bool,
}

impl<S: ByteSource> NewickIterator<S> {
    /// Consumes the iterator and returns the underlying [NewickParser].
    pub fn into_parser(self) -> NewickParser {
        self.parser
    }
}

impl<S: ByteSource> Iterator for NewickIterator<S> {
    type Item = Result<Tree, PhyloError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        if let Err(e) = self.byte_parser.skip_comment_and_whitespace() {
            self.done = true;
            return Some(Err(e.into()));
        }
        if self.byte_parser.is_eof() {
            self.done = true;
            return self.byte_parser.take_io_error().map(|e| Err(e.into()));
        }

        let result = self.parser.parse_tree(&mut self.byte_parser);
        if result.is_err() {
            self.done = true;
        }
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TaxonSet;
    use crate::parser::parsing_error::ParsingErrorType;

    fn parse(newick: &str) -> Result<Tree, PhyloError> {
        NewickParser::new(TaxonSet::new_shared()).parse_tree(&mut ByteParser::for_str(newick))
    }

    #[test]
    fn test_multifurcations_and_internal_labels() {
        let tree = parse("((A,B,C)x:1,(D)y,E)r;").unwrap();
        assert_eq!(tree.seed().num_children(), 3);
        assert_eq!(tree.seed().label(), Some("r"));
        assert_eq!(tree.num_leaves(), 5);
        let x = tree.seed().children()[0];
        assert_eq!(tree[x].label(), Some("x"));
        assert_eq!(tree[x].edge_length(), Some(1.0));
        assert!(tree[x].taxon().is_none());
        assert!(tree.is_valid());
    }

    #[test]
    fn test_rooting_token_and_comments() {
        let tree = parse("[comment] [&R] ([c]A:1[x],B:2e-1);").unwrap();
        assert!(tree.is_rooted());
        let b = tree.seed().children()[1];
        assert_eq!(tree[b].edge_length(), Some(0.2));
        assert_eq!(parse("[&U](A,B);").unwrap().rooting(), Rooting::Unrooted);
        assert_eq!(parse("(A,B);").unwrap().rooting(), Rooting::Unspecified);
    }

    #[test]
    fn test_underscores_and_quotes() {
        let taxa = TaxonSet::new_shared();
        let mut parser = NewickParser::new(taxa.clone());
        parser.parse_tree(&mut ByteParser::for_str("(Marsh_Crake,'Baillon''s_Crake');")).unwrap();
        assert_eq!(taxa.borrow().labels(), vec!["Marsh Crake", "Baillon's_Crake"]);

        let taxa = TaxonSet::new_shared();
        let mut parser = NewickParser::new(taxa.clone()).with_preserve_underscores();
        parser.parse_tree(&mut ByteParser::for_str("(Marsh_Crake,B);")).unwrap();
        assert_eq!(taxa.borrow().labels(), vec!["Marsh_Crake", "B"]);
    }

    #[test]
    fn test_annotations() {
        let taxa = TaxonSet::new_shared();
        let mut parser = NewickParser::new(taxa).with_annotations();
        let tree = parser
            .parse_tree(&mut ByteParser::for_str(
                "(A[&pop_size=2,color=\"dark red\"]:1[&rate=0.5],B[&set={1,2}]:1)[&num_genes=3];",
            ))
            .unwrap();
        let a = tree.seed().children()[0];
        assert_eq!(tree[a].annotations().get("pop_size"), Some(&AnnotationValue::Int(2)));
        assert_eq!(tree[a].annotations().get("color").and_then(|v| v.as_str()), Some("dark red"));
        assert_eq!(tree[a].edge().annotations().get("rate").and_then(|v| v.as_f64()), Some(0.5));
        let b = tree.seed().children()[1];
        assert_eq!(tree[b].annotations().get("set").and_then(|v| v.as_str()), Some("{1,2}"));
        assert_eq!(tree.seed().annotations().get("num_genes").and_then(|v| v.as_i64()), Some(3));
    }

    #[test]
    fn test_annotations_skipped_by_default() {
        let tree = parse("(A[&pop_size=2]:1,B:1);").unwrap();
        let a = tree.seed().children()[0];
        assert!(tree[a].annotations().is_empty());
        assert_eq!(tree[a].edge_length(), Some(1.0));
    }

    #[test]
    fn test_malformed() {
        let missing_semicolon = parse("(A,B)").unwrap_err();
        assert!(matches!(missing_semicolon, PhyloError::Malformed(_)));

        match parse("(A:-1,B);").unwrap_err() {
            PhyloError::Malformed(e) => {
                assert!(matches!(e.kind(), ParsingErrorType::InvalidEdgeLength(_)))
            }
            other => panic!("unexpected error {other:?}"),
        }

        assert!(matches!(parse("(A;B);"), Err(PhyloError::Malformed(_))));
        assert!(matches!(parse("(A,B"), Err(PhyloError::Malformed(_))));
    }

    #[test]
    fn test_iterator_shares_taxa_and_stops_after_error() {
        let taxa = TaxonSet::new_shared();
        let parser = NewickParser::new(taxa.clone());
        let results: Vec<_> = parser
            .into_iter(ByteParser::for_str("(A,B); [between] (B,C);\n(C,D) (E,F);"))
            .collect();
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_ok());
        assert!(results[2].is_err());
        assert_eq!(taxa.borrow().len(), 4);
    }
}
