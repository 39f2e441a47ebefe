//! Registry mapping format names to [DataFormat] descriptors.

use crate::dataio::{
    DataFormat, DataReader, DataWriter, FormatOptions, ReaderFactory, TreeListWriterFactory,
    TreeSourceIter, TreeSourceIterFactory, WriterFactory,
};
use crate::error::{PhyloError, RegistryError, UnsupportedFormatError};
use crate::model::TreeList;
use crate::{newick, nexus};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::{OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

// =#========================================================================#=
// FORMAT REGISTRY
// =#========================================================================#=
/// Case-insensitive, insertion-ordered mapping of format names to
/// [DataFormat] descriptors.
///
/// Names are normalized once (trimmed, ASCII lowercase) on insertion and on
/// lookup. Registering a name twice replaces the earlier descriptor but keeps
/// its position. Lookups of unknown or empty names fail with
/// [UnsupportedFormatError::UnknownFormat]; no stream is touched before the
/// format and capability are resolved.
///
/// # Example
/// ```
/// use phylio::dataio::{FormatOptions, FormatRegistry};
///
/// let registry = FormatRegistry::with_builtin_formats();
/// assert!(registry.contains("NEXUS"));
///
/// let mut source: &[u8] = b"((A,B),C);";
/// let trees: Vec<_> = registry
///     .tree_source_iter(&mut source, "Newick", &FormatOptions::default())
///     .unwrap()
///     .collect::<Result<_, _>>()
///     .unwrap();
/// assert_eq!(trees.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct FormatRegistry {
    formats: Vec<DataFormat>,
    positions: HashMap<String, usize>,
}

// ============================================================================
// Construction & Mutation (pub)
// ============================================================================
impl FormatRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the formats shipped with this crate.
    pub fn with_builtin_formats() -> Self {
        let mut registry = Self::new();
        registry.register_builtin_formats();
        registry
    }

    /// Registers (or re-registers) the formats shipped with this crate.
    pub fn register_builtin_formats(&mut self) {
        self.add_format(newick::data_format());
        self.add_format(nexus::data_format());
    }

    /// Registers a format from its optional capability factories.
    ///
    /// # Arguments
    /// * `name` - Format name; matched case-insensitively later on
    /// * `reader`, `writer`, `tree_source_iter`, `tree_list_writer` - Capabilities, any may be absent
    pub fn add(
        &mut self,
        name: &str,
        reader: Option<ReaderFactory>,
        writer: Option<WriterFactory>,
        tree_source_iter: Option<TreeSourceIterFactory>,
        tree_list_writer: Option<TreeListWriterFactory>,
    ) {
        let format = DataFormat::new(name.trim()).with_factories(
            reader,
            writer,
            tree_source_iter,
            tree_list_writer,
        );
        self.add_format(format);
    }

    /// Registers a prebuilt descriptor under its own name.
    pub fn add_format(&mut self, format: DataFormat) {
        let key = normalize(format.name());
        match self.positions.get(&key) {
            Some(&pos) => {
                debug!("Replacing data format '{key}'");
                self.formats[pos] = format;
            }
            None => {
                debug!("Registering data format '{key}'");
                self.positions.insert(key, self.formats.len());
                self.formats.push(format);
            }
        }
    }

    /// Removes a format and returns its descriptor.
    ///
    /// # Errors
    /// [RegistryError::NotFound] if no format of that name is registered.
    pub fn remove(&mut self, name: &str) -> Result<DataFormat, RegistryError> {
        let key = normalize(name);
        let pos = self
            .positions
            .remove(&key)
            .ok_or_else(|| RegistryError::NotFound { name: name.to_string() })?;
        let format = self.formats.remove(pos);
        for p in self.positions.values_mut() {
            if *p > pos {
                *p -= 1;
            }
        }
        debug!("Removed data format '{key}'");
        Ok(format)
    }

    /// Removes the format registered under `format`'s name, e.g. a
    /// descriptor obtained from a format module's `data_format()`.
    ///
    /// # Errors
    /// [RegistryError::NotFound] if no format of that name is registered.
    pub fn remove_format(&mut self, format: &DataFormat) -> Result<DataFormat, RegistryError> {
        self.remove(format.name())
    }
}

// ============================================================================
// Lookup (pub)
// ============================================================================
impl FormatRegistry {
    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(&normalize(name))
    }

    pub fn len(&self) -> usize {
        self.formats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }

    /// Descriptor registered under `name`.
    ///
    /// # Errors
    /// [UnsupportedFormatError::UnknownFormat] if `name` is empty or unknown.
    pub fn format(&self, name: &str) -> Result<&DataFormat, UnsupportedFormatError> {
        self.positions
            .get(&normalize(name))
            .map(|&pos| &self.formats[pos])
            .ok_or_else(|| UnsupportedFormatError::UnknownFormat { name: name.to_string() })
    }

    /// Names in registration order, as given at registration.
    pub fn format_names(&self) -> Vec<&str> {
        self.formats.iter().map(DataFormat::name).collect()
    }

    /// Instantiates a reader for `name`.
    ///
    /// # Errors
    /// [UnsupportedFormatError] if the name is unknown or the format cannot read.
    pub fn get_reader(
        &self,
        name: &str,
        options: &FormatOptions,
    ) -> Result<Box<dyn DataReader>, UnsupportedFormatError> {
        debug!("Resolving reader for '{name}'");
        self.format(name)?.reader(options)
    }

    /// Instantiates a writer for `name`.
    ///
    /// # Errors
    /// [UnsupportedFormatError] if the name is unknown or the format cannot write.
    pub fn get_writer(
        &self,
        name: &str,
        options: &FormatOptions,
    ) -> Result<Box<dyn DataWriter>, UnsupportedFormatError> {
        debug!("Resolving writer for '{name}'");
        self.format(name)?.writer(options)
    }

    /// Opens a lazy tree stream of format `name` over `source`.
    ///
    /// Nothing is read from `source` until the first call to `next()`.
    ///
    /// # Errors
    /// [UnsupportedFormatError] if the name is unknown or the format cannot
    /// stream trees. Malformed input surfaces later as an `Err` item.
    pub fn tree_source_iter<'a>(
        &self,
        source: &'a mut dyn Read,
        name: &str,
        options: &FormatOptions,
    ) -> Result<TreeSourceIter<'a>, UnsupportedFormatError> {
        debug!("Opening tree source iterator for '{name}'");
        self.format(name)?.tree_source_iter(source, options)
    }

    /// Writes a stand-alone tree list in format `name`.
    ///
    /// # Errors
    /// [PhyloError::UnsupportedFormat] before any output if the name is
    /// unknown or the format lacks the capability; otherwise whatever the
    /// writer returns.
    pub fn write_tree_list(
        &self,
        trees: &TreeList,
        sink: &mut dyn Write,
        name: &str,
        options: &FormatOptions,
    ) -> Result<(), PhyloError> {
        debug!("Writing {} trees as '{name}'", trees.len());
        self.format(name)?.write_tree_list(trees, sink, options)
    }
}

/// Normalized registry key: trimmed and ASCII lowercase.
pub(crate) fn normalize(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

// =#========================================================================#=
// DEFAULT REGISTRY
// =#========================================================================#=
static DEFAULT_REGISTRY: OnceLock<RwLock<FormatRegistry>> = OnceLock::new();

fn default_registry() -> &'static RwLock<FormatRegistry> {
    DEFAULT_REGISTRY.get_or_init(|| RwLock::new(FormatRegistry::new()))
}

/// Read access to the process-wide registry.
///
/// A poisoned lock is recovered: registry mutations never leave it half
/// updated.
pub(crate) fn read_default() -> RwLockReadGuard<'static, FormatRegistry> {
    default_registry()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub(crate) fn write_default() -> RwLockWriteGuard<'static, FormatRegistry> {
    default_registry()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Capability;
    use crate::model::{DataSet, Tree};
    use std::sync::Arc;

    struct EmptyReader;

    impl DataReader for EmptyReader {
        fn read(&mut self, _source: &mut dyn Read) -> Result<DataSet, PhyloError> {
            Ok(DataSet::new())
        }
    }

    fn empty_reader(_: &FormatOptions) -> Box<dyn DataReader> {
        Box::new(EmptyReader)
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let registry = FormatRegistry::with_builtin_formats();
        for name in ["nexus", "NEXUS", "Nexus", "  nexus "] {
            assert!(registry.contains(name), "{name}");
            assert!(registry.get_reader(name, &FormatOptions::default()).is_ok());
        }
        assert_eq!(registry.format_names(), vec!["newick", "nexus"]);
    }

    #[test]
    fn test_unknown_and_empty_names() {
        let registry = FormatRegistry::with_builtin_formats();
        for name in ["", "   ", "phylip"] {
            let err = registry.get_writer(name, &FormatOptions::default()).err().unwrap();
            assert_eq!(
                err,
                UnsupportedFormatError::UnknownFormat { name: name.to_string() }
            );
        }
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut registry = FormatRegistry::with_builtin_formats();
        registry.add("NEWICK", Some(Arc::new(empty_reader)), None, None, None);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.format_names(), vec!["NEWICK", "nexus"]);
        let format = registry.format("newick").unwrap();
        assert!(format.has_reader());
        assert!(!format.has_writer());
        assert!(!format.has_tree_source_iter());
    }

    #[test]
    fn test_remove() {
        let mut registry = FormatRegistry::with_builtin_formats();
        let removed = registry.remove("Newick").unwrap();
        assert_eq!(removed.name(), "newick");
        assert!(!registry.contains("newick"));
        assert!(registry.format("nexus").is_ok());

        assert_eq!(
            registry.remove("newick").unwrap_err(),
            RegistryError::NotFound { name: "newick".to_string() }
        );
    }

    #[test]
    fn test_remove_format_by_descriptor() {
        let mut registry = FormatRegistry::with_builtin_formats();
        let removed = registry.remove_format(&nexus::data_format()).unwrap();
        assert!(removed.has_tree_source_iter());
        assert_eq!(registry.format_names(), vec!["newick"]);

        assert_eq!(
            registry.remove_format(&nexus::data_format()).unwrap_err(),
            RegistryError::NotFound { name: "nexus".to_string() }
        );
        registry.add_format(nexus::data_format());
        assert_eq!(registry.format_names(), vec!["newick", "nexus"]);
    }

    #[test]
    fn test_capability_error_before_io() {
        let mut registry = FormatRegistry::new();
        registry.add("toy", Some(Arc::new(empty_reader)), None, None, None);

        let mut sink: Vec<u8> = Vec::new();
        let trees = TreeList::new(crate::model::TaxonSet::new_shared());
        let err = registry
            .write_tree_list(&trees, &mut sink, "toy", &FormatOptions::default())
            .unwrap_err();
        match err {
            PhyloError::UnsupportedFormat(e) => {
                assert_eq!(e.capability(), Some(Capability::TreeListWriter));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(sink.is_empty());
    }

    #[test]
    fn test_tree_source_iter_is_lazy() {
        let registry = FormatRegistry::with_builtin_formats();
        let mut source: &[u8] = b"(A,B);\n((";
        let mut iter = registry
            .tree_source_iter(&mut source, "newick", &FormatOptions::default())
            .unwrap();
        let first: Tree = iter.next().unwrap().unwrap();
        assert_eq!(first.num_leaves(), 2);
        assert!(iter.next().unwrap().is_err());
        assert!(iter.next().is_none());
    }
}
