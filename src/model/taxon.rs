//! Taxa and taxon sets.
//!
//! A [TaxonSet] owns an ordered collection of unique [Taxon]s. Trees, tree
//! lists and character matrices reference the same set through a
//! [SharedTaxonSet] and the individual taxa through [Rc] pointers, so two
//! references to "the same taxon" are pointer-identical.
//!
//! # Label normalization
//! Labels are accessioned after trimming and collapsing runs of whitespace
//! into a single space. Lookups are case-insensitive by default; the label
//! stored on the [Taxon] keeps the casing it was first seen with.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::ops::Index;
use std::rc::Rc;

/// Taxon set shared between trees, tree lists and character matrices.
pub type SharedTaxonSet = Rc<RefCell<TaxonSet>>;

// =#========================================================================#=
// TAXON
// =#========================================================================#=
/// A named terminal unit (e.g. a species) referenced by leaves and matrix rows.
///
/// Taxa are created exclusively by their [TaxonSet] and never change after
/// creation. The `index` is the position within the owning set and doubles
/// as the bit position in split encodings.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Taxon {
    label: String,
    index: usize,
}

impl Taxon {
    /// Label of this taxon.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Position of this taxon in its taxon set.
    pub fn index(&self) -> usize {
        self.index
    }
}

impl fmt::Display for Taxon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

// =#========================================================================#=
// TAXON SET
// =#========================================================================#=
/// Ordered, de-duplicated collection of [Taxon]s.
///
/// # Example
/// ```
/// use phylio::model::TaxonSet;
/// use std::rc::Rc;
///
/// let mut taxa = TaxonSet::new();
/// let a = taxa.require_taxon("Apteryx  haastii");
/// let b = taxa.require_taxon("apteryx haastii ");
/// assert!(Rc::ptr_eq(&a, &b));
/// assert_eq!(taxa.len(), 1);
/// assert_eq!(a.label(), "Apteryx haastii");
/// ```
#[derive(Debug, Clone)]
pub struct TaxonSet {
    taxa: Vec<Rc<Taxon>>,
    /// Normalized lookup key -> index into `taxa`
    lookup: HashMap<String, usize>,
    case_sensitive: bool,
    label: Option<String>,
}

// ============================================================================
// New, Getters, etc. (pub)
// ============================================================================
impl TaxonSet {
    /// Creates an empty, case-insensitive taxon set.
    pub fn new() -> Self {
        Self {
            taxa: Vec::new(),
            lookup: HashMap::new(),
            case_sensitive: false,
            label: None,
        }
    }

    /// Creates an empty taxon set with case-sensitive label lookups.
    pub fn new_case_sensitive() -> Self {
        Self {
            case_sensitive: true,
            ..Self::new()
        }
    }

    /// Creates a taxon set holding the given labels in order
    /// (duplicates after normalization are dropped).
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut taxa = Self::new();
        for label in labels {
            taxa.require_taxon(label.as_ref());
        }
        taxa
    }

    /// Wraps this set for sharing between trees and matrices.
    pub fn into_shared(self) -> SharedTaxonSet {
        Rc::new(RefCell::new(self))
    }

    /// Creates a new, empty [SharedTaxonSet].
    pub fn new_shared() -> SharedTaxonSet {
        Self::new().into_shared()
    }

    /// Attaches a label to this taxon set.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Label of this taxon set, if any.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Whether lookups compare labels case-sensitively.
    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Number of taxa.
    pub fn len(&self) -> usize {
        self.taxa.len()
    }

    /// Whether the set holds no taxa.
    pub fn is_empty(&self) -> bool {
        self.taxa.is_empty()
    }

    /// Taxon at position `index`, if any.
    pub fn get(&self, index: usize) -> Option<&Rc<Taxon>> {
        self.taxa.get(index)
    }

    /// Iterates the taxa in accession order.
    pub fn iter(&self) -> std::slice::Iter<'_, Rc<Taxon>> {
        self.taxa.iter()
    }

    /// Labels of all taxa in accession order.
    pub fn labels(&self) -> Vec<&str> {
        self.taxa.iter().map(|t| t.label()).collect()
    }

    /// Whether `taxon` is a member of this set (by identity).
    pub fn contains(&self, taxon: &Rc<Taxon>) -> bool {
        self.taxa
            .get(taxon.index)
            .is_some_and(|t| Rc::ptr_eq(t, taxon))
    }
}

impl Default for TaxonSet {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<usize> for TaxonSet {
    type Output = Rc<Taxon>;

    fn index(&self, index: usize) -> &Self::Output {
        &self.taxa[index]
    }
}

impl<'a> IntoIterator for &'a TaxonSet {
    type Item = &'a Rc<Taxon>;
    type IntoIter = std::slice::Iter<'a, Rc<Taxon>>;

    fn into_iter(self) -> Self::IntoIter {
        self.taxa.iter()
    }
}

// ============================================================================
// Accessioning (pub)
// ============================================================================
impl TaxonSet {
    /// Returns the taxon with the given label, creating it if absent.
    ///
    /// Calling this twice with labels that are equal after normalization
    /// returns the identical [Rc] and does not grow the set.
    ///
    /// # Arguments
    /// * `label` - Label to look up; leading/trailing whitespace is trimmed,
    ///   internal whitespace runs collapse to a single space
    pub fn require_taxon(&mut self, label: &str) -> Rc<Taxon> {
        let normalized = normalize_label(label);
        let key = self.lookup_key(&normalized);
        if let Some(&index) = self.lookup.get(&key) {
            return Rc::clone(&self.taxa[index]);
        }

        let index = self.taxa.len();
        let taxon = Rc::new(Taxon {
            label: normalized,
            index,
        });
        self.taxa.push(Rc::clone(&taxon));
        self.lookup.insert(key, index);
        taxon
    }

    /// Returns the taxon with the given label, if present.
    pub fn get_taxon(&self, label: &str) -> Option<Rc<Taxon>> {
        let key = self.lookup_key(&normalize_label(label));
        self.lookup.get(&key).map(|&i| Rc::clone(&self.taxa[i]))
    }

    /// Whether a taxon with the given label is present.
    pub fn has_taxon(&self, label: &str) -> bool {
        self.lookup
            .contains_key(&self.lookup_key(&normalize_label(label)))
    }

    fn lookup_key(&self, normalized: &str) -> String {
        if self.case_sensitive {
            normalized.to_string()
        } else {
            normalized.to_lowercase()
        }
    }
}

/// Trims a label and collapses internal whitespace runs into single spaces.
pub(crate) fn normalize_label(label: &str) -> String {
    label.split_whitespace().collect::<Vec<_>>().join(" ")
}
