//! NEXUS format parser and writer.
//!
//! This module provides:
//! - [NexusParser] - reads TAXA, TREES and DATA/CHARACTERS blocks into a
//!   [DataSet], or lazily iterates the trees via [NexusTreeIter]
//! - [NexusWriter] - writes taxa, character matrices and trees
//! - [NexusReader] / [NexusDataWriter] - the [DataReader] / [DataWriter]
//!   implementations registered under the name `"nexus"`
//!
//! # Quick API
//! For simple use cases with default settings:
//! - [`parse_file`] - parses a file into a [`DataSet`]
//!
//! # Format
//! A NEXUS file typically contains:
//! - A TAXA block defining the taxa
//! - A TREES block containing one or more trees, with an optional
//!   TRANSLATE command mapping short keys to taxon labels
//! - A DATA or CHARACTERS block with an aligned character matrix
//!
//! Blocks other than these are skipped, as are unknown commands within them.

mod defs;
mod parser;
mod writer;

pub use self::defs::NexusBlock;
pub use self::parser::{NexusParser, NexusTreeIter};
pub use self::writer::NexusWriter;

use crate::dataio::{DataFormat, DataReader, DataWriter, FormatOptions, TreeSourceIter};
use crate::error::PhyloError;
use crate::model::{DataSet, TreeList};
use crate::parser::byte_parser::ByteParser;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Name under which the format is registered.
pub const FORMAT_NAME: &str = "nexus";

// ============================================================================
// QUICK PARSING API (public)
// ============================================================================
/// Parses a NEXUS file eagerly and returns all of its taxa, trees and
/// character matrices.
///
/// # Arguments
/// * `path` - Path to the file (accepting `&str`, `String`, `Path`, or `PathBuf`)
///
/// # Errors
/// Returns an error if the file cannot be opened or parsed.
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<DataSet, PhyloError> {
    let file = File::open(path)?;
    NexusParser::new(ByteParser::from_reader(file), &FormatOptions::default()).parse_data_set()
}

// =#========================================================================#=
// NEXUS READER & WRITER
// =#========================================================================#=
/// Whole-source NEXUS reader.
#[derive(Debug, Clone)]
pub struct NexusReader {
    options: FormatOptions,
}

impl NexusReader {
    pub fn new(options: FormatOptions) -> Self {
        Self { options }
    }
}

impl DataReader for NexusReader {
    fn read(&mut self, source: &mut dyn Read) -> Result<DataSet, PhyloError> {
        NexusParser::new(ByteParser::from_reader(source), &self.options).parse_data_set()
    }
}

/// Whole-data-set NEXUS writer.
#[derive(Debug, Clone)]
pub struct NexusDataWriter {
    options: FormatOptions,
}

impl NexusDataWriter {
    pub fn new(options: FormatOptions) -> Self {
        Self { options }
    }
}

impl DataWriter for NexusDataWriter {
    fn write(&mut self, data: &DataSet, sink: &mut dyn Write) -> Result<(), PhyloError> {
        NexusWriter::new(sink, &self.options).write_data_set(data)?;
        Ok(())
    }
}

// ============================================================================
// Registry Entry (pub)
// ============================================================================
/// Descriptor of the NEXUS format with all four capabilities.
pub fn data_format() -> DataFormat {
    DataFormat::new(FORMAT_NAME)
        .with_reader(new_reader)
        .with_writer(new_writer)
        .with_tree_source_iter(tree_source_iter)
        .with_tree_list_writer(tree_list_writer)
}

fn new_reader(options: &FormatOptions) -> Box<dyn DataReader> {
    Box::new(NexusReader::new(options.clone()))
}

fn new_writer(options: &FormatOptions) -> Box<dyn DataWriter> {
    Box::new(NexusDataWriter::new(options.clone()))
}

fn tree_source_iter<'a>(source: &'a mut dyn Read, options: &FormatOptions) -> TreeSourceIter<'a> {
    Box::new(NexusParser::new(ByteParser::from_reader(source), options).into_tree_iter())
}

fn tree_list_writer(
    trees: &TreeList,
    sink: &mut dyn Write,
    options: &FormatOptions,
) -> Result<(), PhyloError> {
    NexusWriter::new(sink, options).write_tree_list(trees)?;
    Ok(())
}
