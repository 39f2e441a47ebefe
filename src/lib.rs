//! Phylio is a library to read, write and simulate phylogenetic data.
//!
//! Core functionality provided:
//! - Format dispatch: a [registry](dataio::FormatRegistry) maps format names
//!   (case-insensitive) to readers, writers, lazy tree iterators and tree
//!   list writers. The functions at the crate root forward to a process-wide
//!   default registry that is filled by [init].
//! - Formats: [Newick](crate::newick) strings and [NEXUS](crate::nexus)
//!   files with TAXA, TREES and DATA/CHARACTERS blocks.
//! - Tree model: arena based [Tree](model::Tree) with nodes, edges and a
//!   shared [TaxonSet](model::TaxonSet); traversals, rerooting, ladderizing,
//!   splits and Robinson-Foulds distances. See [crate::model].
//! - Simulation: star trees, pure-birth trees, population trees and
//!   Kingman coalescent gene trees. See [crate::treesim].
//!
//! # Usage patterns
//! 1. Dispatch by format name through the default registry:
//!
//! ```
//! use phylio::dataio::FormatOptions;
//!
//! phylio::init();
//! let mut source: &[u8] = b"((A:1,B:1):1,C:2);";
//! let data = phylio::get_reader("Newick", &FormatOptions::default())?
//!     .read(&mut source)?;
//! assert_eq!(data.tree_lists[0].len(), 1);
//! # Ok::<(), phylio::error::PhyloError>(())
//! ```
//!
//! 2. Use an explicitly constructed registry, or the format modules directly:
//!
//! ```
//! use phylio::newick::{self, NewickStyle};
//!
//! let tree = newick::parse_str("((A:1,B:1):1,C:2);")?;
//! assert_eq!(newick::to_newick(&tree, &NewickStyle::default()), "((A:1,B:1):1,C:2);");
//! # Ok::<(), phylio::error::PhyloError>(())
//! ```

pub mod dataio;
pub mod error;
pub mod model;
pub mod newick;
pub mod nexus;
pub mod parser;
pub mod treesim;

pub use error::PhyloError;

use crate::dataio::{
    DataReader, DataWriter, FormatOptions, FormatRegistry, ReaderFactory, TreeListWriterFactory,
    TreeSourceIter, TreeSourceIterFactory, WriterFactory,
};
use crate::error::UnsupportedFormatError;
use crate::model::TreeList;
use std::io::{Read, Write};

// =#========================================================================#=
// DEFAULT REGISTRY FAÇADE
// =#========================================================================#=
/// Registers the built-in `newick` and `nexus` formats in the default
/// registry. Calling it again re-registers them.
pub fn init() {
    dataio::write_default().register_builtin_formats();
}

/// Registers (or replaces) a format in the default registry.
///
/// # Example
/// ```
/// use phylio::dataio::{DataReader, FormatOptions};
/// use phylio::error::PhyloError;
/// use phylio::model::DataSet;
/// use std::io::Read;
/// use std::sync::Arc;
///
/// struct Toy;
/// impl DataReader for Toy {
///     fn read(&mut self, _: &mut dyn Read) -> Result<DataSet, PhyloError> {
///         Ok(DataSet::new())
///     }
/// }
///
/// phylio::register("toy-doc", Some(Arc::new(|_: &FormatOptions| Box::new(Toy) as Box<dyn DataReader>)), None, None, None);
/// assert!(phylio::get_reader("TOY-DOC", &FormatOptions::default()).is_ok());
/// assert!(phylio::get_writer("toy-doc", &FormatOptions::default()).is_err());
/// ```
pub fn register(
    name: &str,
    reader: Option<ReaderFactory>,
    writer: Option<WriterFactory>,
    tree_source_iter: Option<TreeSourceIterFactory>,
    tree_list_writer: Option<TreeListWriterFactory>,
) {
    dataio::write_default().add(name, reader, writer, tree_source_iter, tree_list_writer);
}

/// Instantiates a reader of the default registry.
///
/// # Errors
/// [UnsupportedFormatError] if the name is unknown or the format cannot read.
pub fn get_reader(
    name: &str,
    options: &FormatOptions,
) -> Result<Box<dyn DataReader>, UnsupportedFormatError> {
    let factory = dataio::read_default().format(name)?.reader_factory()?.clone();
    Ok(factory(options))
}

/// Instantiates a writer of the default registry.
///
/// # Errors
/// [UnsupportedFormatError] if the name is unknown or the format cannot write.
pub fn get_writer(
    name: &str,
    options: &FormatOptions,
) -> Result<Box<dyn DataWriter>, UnsupportedFormatError> {
    let factory = dataio::read_default().format(name)?.writer_factory()?.clone();
    Ok(factory(options))
}

/// Opens a lazy tree stream over `source` via the default registry.
///
/// # Errors
/// [UnsupportedFormatError] if the name is unknown or the format cannot
/// stream trees.
pub fn tree_source_iter<'a>(
    source: &'a mut dyn Read,
    name: &str,
    options: &FormatOptions,
) -> Result<TreeSourceIter<'a>, UnsupportedFormatError> {
    let factory = dataio::read_default()
        .format(name)?
        .tree_source_iter_factory()?
        .clone();
    Ok(factory(source, options))
}

/// Writes a stand-alone tree list via the default registry.
///
/// # Errors
/// [PhyloError::UnsupportedFormat] before any output if the name is unknown
/// or the format lacks the capability; otherwise the writer's error.
pub fn write_tree_list(
    trees: &TreeList,
    sink: &mut dyn Write,
    name: &str,
    options: &FormatOptions,
) -> Result<(), PhyloError> {
    let factory = dataio::read_default()
        .format(name)?
        .tree_list_writer_factory()?
        .clone();
    factory(trees, sink, options)
}

/// Runs `f` with shared access to the default registry.
///
/// The registry stays locked while `f` runs; do not call the other
/// functions of this module from within `f`.
pub fn with_default_registry<T>(f: impl FnOnce(&FormatRegistry) -> T) -> T {
    f(&dataio::read_default())
}

/// Runs `f` with exclusive access to the default registry.
pub fn with_default_registry_mut<T>(f: impl FnOnce(&mut FormatRegistry) -> T) -> T {
    f(&mut dataio::write_default())
}
