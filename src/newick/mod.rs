//! Newick format parser and writer for phylogenetic trees.
//!
//! This module provides [`NewickParser`] to parse Newick strings into
//! [`Tree`]s over a shared [taxon set](crate::model::TaxonSet), and functions
//! to write trees back. It is used directly, through the `"newick"` entry of
//! the [format registry](crate::dataio::FormatRegistry), and by the NEXUS
//! parser for the trees of a TREES block.
//!
//! # Quick API
//! For simple use cases with default settings:
//! * [`parse_str`] - parses a single string
//! * [`parse_file`] - parses all trees of a file into a [`TreeList`]
//! * [`to_newick`] - serializes a tree
//!
//! # Full API
//! For more control, configure a [`NewickParser`] and provide a [`ByteParser`]:
//! * [`NewickParser::parse_tree`] - parse a single tree
//! * [`NewickParser::parse_all`] - parse all trees until EOF
//! * [`NewickParser::into_iter`] - obtain an iterator over trees
//!
//! # Format
//! The Newick format has the following grammar:
//! * `tree ::= ['[&R]' | '[&U]'] node ';'`
//! * `node ::= ['(' node (',' node)* ')'] [label] [annotation] [':' length [annotation]]`
//!
//! Furthermore:
//! * Whitespace can occur between elements,
//!   just not within an unquoted label or an edge length
//! * Comments are square brackets and can occur anywhere whitespace is allowed
//! * Quoted labels use single quotes, a doubled quote `''` escapes a quote
//! * Underscores in unquoted labels are read as spaces
//!
//! In the extended Newick format, there can be annotation comments such as
//! `[&pop_size=0.543,color=blue]`. After a label they belong to the node,
//! after an edge length to the edge. They are parsed when enabled
//! ([`NewickParser::with_annotations`]) and skipped as comments otherwise.

mod defs;
mod parser;
mod resolver;
pub mod writer;

pub use self::parser::{NewickIterator, NewickParser};
pub use self::resolver::TaxonResolver;
pub use self::writer::{NewickStyle, TaxonStyle, to_newick, write_tree, write_tree_list};

use crate::dataio::{DataFormat, DataReader, DataWriter, FormatOptions, TreeSourceIter};
use crate::error::PhyloError;
use crate::model::{DataSet, SharedTaxonSet, TaxonSet, Tree, TreeList};
use crate::parser::byte_parser::ByteParser;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use tracing::debug;

/// Name under which the format is registered.
pub const FORMAT_NAME: &str = "newick";

// ============================================================================
// QUICK PARSING API (pub)
// ============================================================================
/// Parses a single Newick string into a [`Tree`] over a fresh taxon set.
///
/// # Example
/// ```
/// use phylio::newick::parse_str;
///
/// let tree = parse_str("(Fratercula_cirrhata,(Fratercula_arctica,Fratercula_corniculata));").unwrap();
/// assert_eq!(tree.num_leaves(), 3);
/// assert!(tree.taxon_set().borrow().has_taxon("Fratercula arctica"));
/// ```
pub fn parse_str(newick: &str) -> Result<Tree, PhyloError> {
    let mut parser = NewickParser::new(TaxonSet::new_shared());
    let mut byte_parser = ByteParser::for_str(newick);
    parser.parse_tree(&mut byte_parser)
}

/// Parses all trees of a file containing a list of Newick strings.
///
/// Multiple trees can appear on the same line or across multiple lines,
/// and `[...]` comments and whitespace are fine.
///
/// # Arguments
/// * `path` - Path to the file (accepting `&str`, `String`, `Path`, or `PathBuf`)
///
/// # Errors
/// [`PhyloError::Io`] if the file cannot be read,
/// [`PhyloError::Malformed`] if a Newick string is invalid.
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<TreeList, PhyloError> {
    let file = File::open(path)?;
    read_trees(file, TaxonSet::new_shared(), &FormatOptions::default())
}

/// Parses all trees from a reader into a [`TreeList`] over `taxon_set`.
pub fn read_trees<R: Read>(
    reader: R,
    taxon_set: SharedTaxonSet,
    options: &FormatOptions,
) -> Result<TreeList, PhyloError> {
    let mut parser = NewickParser::from_options(taxon_set.clone(), options);
    let trees = parser.parse_all(ByteParser::from_reader(reader))?;

    let mut tree_list = TreeList::new(taxon_set);
    for tree in trees {
        tree_list.push(tree)?;
    }
    debug!(num_trees = tree_list.len(), "read newick trees");
    Ok(tree_list)
}

// =#========================================================================#=
// NEWICK READER & WRITER
// =#========================================================================#=
/// Whole-source reader producing a [`DataSet`] with a single tree list.
#[derive(Debug, Clone)]
pub struct NewickReader {
    options: FormatOptions,
}

impl NewickReader {
    pub fn new(options: FormatOptions) -> Self {
        Self { options }
    }
}

impl DataReader for NewickReader {
    fn read(&mut self, source: &mut dyn Read) -> Result<DataSet, PhyloError> {
        let taxon_set = self
            .options
            .taxon_set()
            .cloned()
            .unwrap_or_else(TaxonSet::new_shared);

        if self.options.exclude_trees() {
            let mut data_set = DataSet::new();
            data_set.add_taxon_set(&taxon_set);
            return Ok(data_set);
        }

        let tree_list = read_trees(source, taxon_set, &self.options)?;
        Ok(DataSet::from_tree_list(tree_list))
    }
}

/// Writer emitting every tree of a [`DataSet`], one Newick string per line.
#[derive(Debug, Clone)]
pub struct NewickWriter {
    options: FormatOptions,
}

impl NewickWriter {
    pub fn new(options: FormatOptions) -> Self {
        Self { options }
    }
}

impl DataWriter for NewickWriter {
    fn write(&mut self, data: &DataSet, sink: &mut dyn Write) -> Result<(), PhyloError> {
        if self.options.exclude_trees() {
            return Ok(());
        }
        let style = NewickStyle::from_options(&self.options);
        let mut writer = BufWriter::new(sink);
        for tree_list in &data.tree_lists {
            write_tree_list(&mut writer, tree_list, &style)?;
        }
        writer.flush()?;
        Ok(())
    }
}

// ============================================================================
// Registry Entry (pub)
// ============================================================================
/// Descriptor of the Newick format with all four capabilities.
pub fn data_format() -> DataFormat {
    DataFormat::new(FORMAT_NAME)
        .with_reader(new_reader)
        .with_writer(new_writer)
        .with_tree_source_iter(tree_source_iter)
        .with_tree_list_writer(tree_list_writer)
}

fn new_reader(options: &FormatOptions) -> Box<dyn DataReader> {
    Box::new(NewickReader::new(options.clone()))
}

fn new_writer(options: &FormatOptions) -> Box<dyn DataWriter> {
    Box::new(NewickWriter::new(options.clone()))
}

fn tree_source_iter<'a>(source: &'a mut dyn Read, options: &FormatOptions) -> TreeSourceIter<'a> {
    let taxon_set = options.taxon_set().cloned().unwrap_or_else(TaxonSet::new_shared);
    let parser = NewickParser::from_options(taxon_set, options);
    Box::new(parser.into_iter(ByteParser::from_reader(source)))
}

fn tree_list_writer(
    trees: &TreeList,
    sink: &mut dyn Write,
    options: &FormatOptions,
) -> Result<(), PhyloError> {
    write_tree_list(sink, trees, &NewickStyle::from_options(options))?;
    Ok(())
}
