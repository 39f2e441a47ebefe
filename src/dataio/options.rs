//! Options bag handed to reader and writer factories.

use crate::model::{Rooting, SharedTaxonSet};
use std::collections::HashMap;
use std::fmt;

/// Key of the `extra` option keeping underscores in unquoted labels.
pub const PRESERVE_UNDERSCORES: &str = "preserve_underscores";

/// Key of the `extra` option controlling NEXUS `TRANSLATE` output.
pub const TRANSLATE: &str = "translate";

/// Value of a format-specific option.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        OptionValue::Int(value)
    }
}

impl From<f64> for OptionValue {
    fn from(value: f64) -> Self {
        OptionValue::Float(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Str(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Str(value)
    }
}

// =#========================================================================#=
// FORMAT OPTIONS
// =#========================================================================#=
/// Options for readers, writers and tree iterators.
///
/// Cross-format options are typed fields set through `with_*` methods;
/// format-specific keys go into the [extra](Self::with_extra) map. Formats
/// ignore options they do not understand.
///
/// # Example
/// ```
/// use phylio::dataio::{FormatOptions, PRESERVE_UNDERSCORES};
///
/// let options = FormatOptions::new()
///     .with_edge_lengths(false)
///     .with_extra(PRESERVE_UNDERSCORES, true);
/// assert!(!options.edge_lengths());
/// assert!(options.extra_bool(PRESERVE_UNDERSCORES, false));
/// ```
#[derive(Clone)]
pub struct FormatOptions {
    taxon_set: Option<SharedTaxonSet>,
    exclude_trees: bool,
    exclude_chars: bool,
    encode_splits: bool,
    edge_lengths: bool,
    internal_labels: bool,
    annotations: bool,
    rooting: Option<Rooting>,
    extra: HashMap<String, OptionValue>,
}

impl FormatOptions {
    /// Creates options with all defaults.
    pub fn new() -> Self {
        Self {
            taxon_set: None,
            exclude_trees: false,
            exclude_chars: false,
            encode_splits: false,
            edge_lengths: true,
            internal_labels: true,
            annotations: false,
            rooting: None,
            extra: HashMap::new(),
        }
    }

    /// Readers attach taxa to this set instead of creating a fresh one.
    pub fn with_taxon_set(mut self, taxon_set: SharedTaxonSet) -> Self {
        self.taxon_set = Some(taxon_set);
        self
    }

    /// Skip trees when reading or writing.
    pub fn with_exclude_trees(mut self, exclude_trees: bool) -> Self {
        self.exclude_trees = exclude_trees;
        self
    }

    /// Skip character matrices when reading or writing.
    pub fn with_exclude_chars(mut self, exclude_chars: bool) -> Self {
        self.exclude_chars = exclude_chars;
        self
    }

    /// Compute split bitmasks of every tree read.
    pub fn with_encode_splits(mut self, encode_splits: bool) -> Self {
        self.encode_splits = encode_splits;
        self
    }

    /// Write edge lengths.
    pub fn with_edge_lengths(mut self, edge_lengths: bool) -> Self {
        self.edge_lengths = edge_lengths;
        self
    }

    /// Write labels of internal nodes.
    pub fn with_internal_labels(mut self, internal_labels: bool) -> Self {
        self.internal_labels = internal_labels;
        self
    }

    /// Read and write `[&key=value]` annotations.
    pub fn with_annotations(mut self, annotations: bool) -> Self {
        self.annotations = annotations;
        self
    }

    /// Override the rooting state declared by the source.
    pub fn with_rooting(mut self, rooting: Rooting) -> Self {
        self.rooting = Some(rooting);
        self
    }

    /// Sets a format-specific option.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn taxon_set(&self) -> Option<&SharedTaxonSet> {
        self.taxon_set.as_ref()
    }

    pub fn exclude_trees(&self) -> bool {
        self.exclude_trees
    }

    pub fn exclude_chars(&self) -> bool {
        self.exclude_chars
    }

    pub fn encode_splits(&self) -> bool {
        self.encode_splits
    }

    pub fn edge_lengths(&self) -> bool {
        self.edge_lengths
    }

    pub fn internal_labels(&self) -> bool {
        self.internal_labels
    }

    pub fn annotations(&self) -> bool {
        self.annotations
    }

    pub fn rooting(&self) -> Option<Rooting> {
        self.rooting
    }

    /// Format-specific option, if set.
    pub fn extra(&self, key: &str) -> Option<&OptionValue> {
        self.extra.get(key)
    }

    /// Format-specific boolean option, or `default` if unset or not a bool.
    pub fn extra_bool(&self, key: &str, default: bool) -> bool {
        match self.extra.get(key) {
            Some(OptionValue::Bool(value)) => *value,
            _ => default,
        }
    }
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FormatOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatOptions")
            .field("taxon_set", &self.taxon_set.as_ref().map(|t| t.borrow().len()))
            .field("exclude_trees", &self.exclude_trees)
            .field("exclude_chars", &self.exclude_chars)
            .field("encode_splits", &self.encode_splits)
            .field("edge_lengths", &self.edge_lengths)
            .field("internal_labels", &self.internal_labels)
            .field("annotations", &self.annotations)
            .field("rooting", &self.rooting)
            .field("extra", &self.extra)
            .finish()
    }
}
