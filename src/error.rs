//! Error types of the crate.
//!
//! Every fallible public operation returns one of the errors defined here
//! or a [ParsingError] (for malformed input). [PhyloError] is the umbrella
//! type returned by readers, writers and the format registry; it wraps the
//! more specific errors unchanged so callers can match on the cause.

use crate::model::NodeIndex;
use crate::parser::ParsingError;
use std::fmt;
use thiserror::Error;

// =#========================================================================#=
// PHYLO ERROR
// =#========================================================================#=
/// Umbrella error for reading, writing and dispatching phylogenetic data.
#[derive(Debug, Error)]
pub enum PhyloError {
    /// Requested format is unknown or lacks the requested capability.
    #[error(transparent)]
    UnsupportedFormat(#[from] UnsupportedFormatError),

    /// Input did not match the format grammar.
    #[error(transparent)]
    Malformed(#[from] ParsingError),

    /// Operation would break a structural invariant of the tree model.
    #[error(transparent)]
    InvariantViolation(#[from] TreeError),

    /// Registry mutation failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Underlying stream failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =#========================================================================#=
// UNSUPPORTED FORMAT
// =#========================================================================#=
/// Capability a [DataFormat](crate::dataio::DataFormat) may provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Reader,
    Writer,
    TreeSourceIter,
    TreeListWriter,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::Reader => "Reading",
            Capability::Writer => "Writing",
            Capability::TreeSourceIter => "Iteration over source trees",
            Capability::TreeListWriter => "Writing of stand-alone tree lists",
        };
        f.write_str(name)
    }
}

/// Raised at resolution time, before any stream I/O happens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnsupportedFormatError {
    /// No format of this name is registered (includes the empty name).
    #[error("Format '{name}' is not a recognized data format name")]
    UnknownFormat { name: String },

    /// The format is registered, but without the requested capability.
    #[error("{capability} is not currently supported for data format '{name}'")]
    CapabilityUnavailable { name: String, capability: Capability },
}

impl UnsupportedFormatError {
    /// Name of the offending format as given by the caller.
    pub fn format_name(&self) -> &str {
        match self {
            UnsupportedFormatError::UnknownFormat { name } => name,
            UnsupportedFormatError::CapabilityUnavailable { name, .. } => name,
        }
    }

    /// Missing capability, if the format itself was known.
    pub fn capability(&self) -> Option<Capability> {
        match self {
            UnsupportedFormatError::UnknownFormat { .. } => None,
            UnsupportedFormatError::CapabilityUnavailable { capability, .. } => Some(*capability),
        }
    }
}

// =#========================================================================#=
// REGISTRY
// =#========================================================================#=
/// Errors of registry mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Cannot remove format '{name}': not registered")]
    NotFound { name: String },
}

// =#========================================================================#=
// TREE
// =#========================================================================#=
/// Violations of the tree model's structural invariants.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TreeError {
    #[error("Node {0} does not exist in this tree")]
    NoSuchNode(NodeIndex),

    #[error("Node {0} is not attached to the tree")]
    DetachedNode(NodeIndex),

    #[error("Node {child} is not a child of node {parent}")]
    NotAChild { parent: NodeIndex, child: NodeIndex },

    #[error("Node {0} already has a parent")]
    AlreadyAttached(NodeIndex),

    #[error("Attaching node {child} below node {parent} would create a cycle")]
    Cycle { parent: NodeIndex, child: NodeIndex },

    #[error("Cannot reroot at leaf node {0}")]
    RerootAtLeaf(NodeIndex),

    #[error("Edge length must be non-negative and finite, got {0}")]
    InvalidEdgeLength(f64),

    #[error("Operation needs at least {required} leaves, tree has {found}")]
    TooFewLeaves { required: usize, found: usize },

    #[error("Trees do not share the same taxon set")]
    ForeignTaxonSet,

    #[error("Leaf node {0} has no taxon assigned")]
    MissingTaxon(NodeIndex),
}

// =#========================================================================#=
// SIMULATION
// =#========================================================================#=
/// Invalid parameters handed to a tree simulation routine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("Too few ages specified: need {required}, got {found}")]
    TooFewAges { required: usize, found: usize },

    #[error("Too few number of gene samples specified: need {required}, got {found}")]
    TooFewNumGenes { required: usize, found: usize },

    #[error("Too few population sizes specified: need {required}, got {found}")]
    TooFewPopSizes { required: usize, found: usize },

    #[error("Rate parameter must be positive and finite, got {0}")]
    InvalidRate(f64),

    #[error("Population size must be positive and finite, got {0}")]
    InvalidPopSize(f64),

    #[error("Taxon set is empty")]
    EmptyTaxonSet,

    #[error("Population tree leaf {0} has no '{1}' annotation")]
    MissingAnnotation(NodeIndex, String),

    #[error(transparent)]
    Tree(#[from] TreeError),
}
