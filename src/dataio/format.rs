//! Format descriptors: a name plus up to four capability factories.

use crate::dataio::FormatOptions;
use crate::error::{Capability, PhyloError, UnsupportedFormatError};
use crate::model::{DataSet, Tree, TreeList};
use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;

/// Reads a whole source into a [DataSet].
pub trait DataReader {
    /// Reads all data from `source`. The stream is not closed.
    fn read(&mut self, source: &mut dyn Read) -> Result<DataSet, PhyloError>;
}

/// Writes a [DataSet] to a sink.
pub trait DataWriter {
    /// Writes `data` to `sink`. The stream is not closed.
    fn write(&mut self, data: &DataSet, sink: &mut dyn Write) -> Result<(), PhyloError>;
}

/// Lazy, single-pass stream of trees over a borrowed source.
pub type TreeSourceIter<'a> = Box<dyn Iterator<Item = Result<Tree, PhyloError>> + 'a>;

pub type ReaderFactory = Arc<dyn Fn(&FormatOptions) -> Box<dyn DataReader> + Send + Sync>;
pub type WriterFactory = Arc<dyn Fn(&FormatOptions) -> Box<dyn DataWriter> + Send + Sync>;
pub type TreeSourceIterFactory =
    Arc<dyn for<'a> Fn(&'a mut dyn Read, &FormatOptions) -> TreeSourceIter<'a> + Send + Sync>;
pub type TreeListWriterFactory =
    Arc<dyn Fn(&TreeList, &mut dyn Write, &FormatOptions) -> Result<(), PhyloError> + Send + Sync>;

// =#========================================================================#=
// DATA FORMAT
// =#========================================================================#=
/// Descriptor of a data format: its name and optional capabilities.
///
/// Each capability has a `has_*` predicate and an accessor that fails with
/// [UnsupportedFormatError::CapabilityUnavailable] when it is unset.
///
/// # Example
/// ```
/// use phylio::dataio::{DataFormat, DataReader, FormatOptions};
/// use phylio::error::PhyloError;
/// use phylio::model::DataSet;
/// use std::io::Read;
///
/// struct Toy;
/// impl DataReader for Toy {
///     fn read(&mut self, _: &mut dyn Read) -> Result<DataSet, PhyloError> {
///         Ok(DataSet::new())
///     }
/// }
///
/// let format = DataFormat::new("toy").with_reader(|_: &FormatOptions| Box::new(Toy) as Box<dyn DataReader>);
/// assert!(format.has_reader());
/// assert!(!format.has_writer());
/// assert!(format.writer(&FormatOptions::default()).is_err());
/// ```
#[derive(Clone)]
pub struct DataFormat {
    name: String,
    reader: Option<ReaderFactory>,
    writer: Option<WriterFactory>,
    tree_source_iter: Option<TreeSourceIterFactory>,
    tree_list_writer: Option<TreeListWriterFactory>,
}

// ============================================================================
// Construction (pub)
// ============================================================================
impl DataFormat {
    /// Creates a descriptor without capabilities.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reader: None,
            writer: None,
            tree_source_iter: None,
            tree_list_writer: None,
        }
    }

    pub fn with_reader<F>(mut self, factory: F) -> Self
    where
        F: Fn(&FormatOptions) -> Box<dyn DataReader> + Send + Sync + 'static,
    {
        self.reader = Some(Arc::new(factory));
        self
    }

    pub fn with_writer<F>(mut self, factory: F) -> Self
    where
        F: Fn(&FormatOptions) -> Box<dyn DataWriter> + Send + Sync + 'static,
    {
        self.writer = Some(Arc::new(factory));
        self
    }

    pub fn with_tree_source_iter<F>(mut self, factory: F) -> Self
    where
        F: for<'a> Fn(&'a mut dyn Read, &FormatOptions) -> TreeSourceIter<'a> + Send + Sync + 'static,
    {
        self.tree_source_iter = Some(Arc::new(factory));
        self
    }

    pub fn with_tree_list_writer<F>(mut self, factory: F) -> Self
    where
        F: Fn(&TreeList, &mut dyn Write, &FormatOptions) -> Result<(), PhyloError> + Send + Sync + 'static,
    {
        self.tree_list_writer = Some(Arc::new(factory));
        self
    }

    /// Sets the capabilities from optional, already shared factories.
    pub(crate) fn with_factories(
        mut self,
        reader: Option<ReaderFactory>,
        writer: Option<WriterFactory>,
        tree_source_iter: Option<TreeSourceIterFactory>,
        tree_list_writer: Option<TreeListWriterFactory>,
    ) -> Self {
        self.reader = reader;
        self.writer = writer;
        self.tree_source_iter = tree_source_iter;
        self.tree_list_writer = tree_list_writer;
        self
    }
}

// ============================================================================
// Capabilities (pub)
// ============================================================================
impl DataFormat {
    /// Name as registered (not normalized).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_reader(&self) -> bool {
        self.reader.is_some()
    }

    pub fn has_writer(&self) -> bool {
        self.writer.is_some()
    }

    pub fn has_tree_source_iter(&self) -> bool {
        self.tree_source_iter.is_some()
    }

    pub fn has_tree_list_writer(&self) -> bool {
        self.tree_list_writer.is_some()
    }

    /// Instantiates a reader configured by `options`.
    ///
    /// # Errors
    /// [UnsupportedFormatError::CapabilityUnavailable] if the format cannot read.
    pub fn reader(&self, options: &FormatOptions) -> Result<Box<dyn DataReader>, UnsupportedFormatError> {
        let factory = self.reader_factory()?;
        Ok(factory(options))
    }

    /// Instantiates a writer configured by `options`.
    ///
    /// # Errors
    /// [UnsupportedFormatError::CapabilityUnavailable] if the format cannot write.
    pub fn writer(&self, options: &FormatOptions) -> Result<Box<dyn DataWriter>, UnsupportedFormatError> {
        let factory = self.writer_factory()?;
        Ok(factory(options))
    }

    /// Factory of readers.
    ///
    /// # Errors
    /// [UnsupportedFormatError::CapabilityUnavailable] if the format cannot read.
    pub fn reader_factory(&self) -> Result<&ReaderFactory, UnsupportedFormatError> {
        self.reader.as_ref().ok_or_else(|| self.unavailable(Capability::Reader))
    }

    pub fn writer_factory(&self) -> Result<&WriterFactory, UnsupportedFormatError> {
        self.writer.as_ref().ok_or_else(|| self.unavailable(Capability::Writer))
    }

    /// Factory of lazy tree streams.
    ///
    /// # Errors
    /// [UnsupportedFormatError::CapabilityUnavailable] if the format cannot stream trees.
    pub fn tree_source_iter_factory(&self) -> Result<&TreeSourceIterFactory, UnsupportedFormatError> {
        self.tree_source_iter
            .as_ref()
            .ok_or_else(|| self.unavailable(Capability::TreeSourceIter))
    }

    /// Factory of stand-alone tree list writers.
    ///
    /// # Errors
    /// [UnsupportedFormatError::CapabilityUnavailable] if the format cannot write tree lists.
    pub fn tree_list_writer_factory(&self) -> Result<&TreeListWriterFactory, UnsupportedFormatError> {
        self.tree_list_writer
            .as_ref()
            .ok_or_else(|| self.unavailable(Capability::TreeListWriter))
    }

    /// Opens a lazy tree stream over `source`.
    pub fn tree_source_iter<'a>(
        &self,
        source: &'a mut dyn Read,
        options: &FormatOptions,
    ) -> Result<TreeSourceIter<'a>, UnsupportedFormatError> {
        let factory = self.tree_source_iter_factory()?;
        Ok(factory(source, options))
    }

    /// Writes a stand-alone tree list to `sink`.
    pub fn write_tree_list(
        &self,
        trees: &TreeList,
        sink: &mut dyn Write,
        options: &FormatOptions,
    ) -> Result<(), PhyloError> {
        let factory = self.tree_list_writer_factory()?;
        factory(trees, sink, options)
    }

    fn unavailable(&self, capability: Capability) -> UnsupportedFormatError {
        UnsupportedFormatError::CapabilityUnavailable {
            name: self.name.clone(),
            capability,
        }
    }
}

impl fmt::Debug for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataFormat")
            .field("name", &self.name)
            .field("reader", &self.has_reader())
            .field("writer", &self.has_writer())
            .field("tree_source_iter", &self.has_tree_source_iter())
            .field("tree_list_writer", &self.has_tree_list_writer())
            .finish()
    }
}
