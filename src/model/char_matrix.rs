//! Aligned character data, one sequence per taxon.

use crate::model::taxon::{SharedTaxonSet, Taxon};
use std::rc::Rc;

/// Type of the characters of a [CharacterMatrix].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataType {
    #[default]
    Dna,
    Rna,
    Protein,
    Standard,
}

impl DataType {
    /// Parses a NEXUS `DATATYPE` value (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "DNA" | "NUCLEOTIDE" => Some(DataType::Dna),
            "RNA" => Some(DataType::Rna),
            "PROTEIN" => Some(DataType::Protein),
            "STANDARD" => Some(DataType::Standard),
            _ => None,
        }
    }

    /// Name as written in a NEXUS `FORMAT` command.
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Dna => "DNA",
            DataType::Rna => "RNA",
            DataType::Protein => "PROTEIN",
            DataType::Standard => "STANDARD",
        }
    }
}

/// Character matrix over a shared taxon set.
///
/// Rows keep their order of insertion; states are kept as raw characters.
#[derive(Debug, Clone)]
pub struct CharacterMatrix {
    taxon_set: SharedTaxonSet,
    datatype: DataType,
    rows: Vec<(Rc<Taxon>, String)>,
    label: Option<String>,
    missing: char,
    gap: char,
}

impl CharacterMatrix {
    /// Creates an empty matrix with `?` as missing and `-` as gap symbol.
    pub fn new(taxon_set: SharedTaxonSet, datatype: DataType) -> Self {
        Self {
            taxon_set,
            datatype,
            rows: Vec::new(),
            label: None,
            missing: '?',
            gap: '-',
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_symbols(mut self, missing: char, gap: char) -> Self {
        self.missing = missing;
        self.gap = gap;
        self
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn taxon_set(&self) -> &SharedTaxonSet {
        &self.taxon_set
    }

    pub fn datatype(&self) -> DataType {
        self.datatype
    }

    pub fn missing(&self) -> char {
        self.missing
    }

    pub fn gap(&self) -> char {
        self.gap
    }

    /// Sets the sequence of `taxon`, appending to an existing row.
    ///
    /// Appending supports matrices whose rows are split over several lines.
    pub fn extend_row(&mut self, taxon: Rc<Taxon>, states: &str) {
        match self.rows.iter_mut().find(|(t, _)| Rc::ptr_eq(t, &taxon)) {
            Some((_, row)) => row.push_str(states),
            None => self.rows.push((taxon, states.to_string())),
        }
    }

    /// Sequence of `taxon`, if present.
    pub fn row(&self, taxon: &Rc<Taxon>) -> Option<&str> {
        self.rows
            .iter()
            .find(|(t, _)| Rc::ptr_eq(t, taxon))
            .map(|(_, row)| row.as_str())
    }

    pub fn rows(&self) -> impl Iterator<Item = (&Rc<Taxon>, &str)> + '_ {
        self.rows.iter().map(|(t, row)| (t, row.as_str()))
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Length of the longest row.
    pub fn num_chars(&self) -> usize {
        self.rows.iter().map(|(_, r)| r.chars().count()).max().unwrap_or(0)
    }
}
