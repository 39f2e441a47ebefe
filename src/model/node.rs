//! Nodes and edges of a [Tree](crate::model::Tree).
//!
//! Both live in the tree's arena: a [Node] is addressed by its [NodeIndex]
//! and owns the [Edge] connecting it to its parent. Parent and tail
//! references are plain indices, never owning pointers.

use crate::error::TreeError;
use crate::model::annotation::Annotations;
use crate::model::splits::Split;
use crate::model::taxon::Taxon;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

/// Index of a node in a tree (arena).
pub type NodeIndex = usize;

// =#========================================================================#=
// NODE
// =#========================================================================#=
/// A node of a phylogenetic tree.
///
/// Children are kept in an ordered list of indices; the order is
/// significant for writing and is what [ladderize](crate::model::Tree::ladderize)
/// rearranges.
#[derive(Debug, Clone)]
pub struct Node {
    /// Index of this node in the tree arena
    index: NodeIndex,
    /// Index of the parent node; `None` for the seed and detached nodes
    pub(crate) parent: Option<NodeIndex>,
    /// Ordered child indices
    pub(crate) children: Vec<NodeIndex>,
    /// Shared reference into the tree's taxon set
    pub(crate) taxon: Option<Rc<Taxon>>,
    /// Free label, e.g. internal node support values
    pub(crate) label: Option<String>,
    /// Edge towards the parent (owned)
    pub(crate) edge: Edge,
    pub(crate) annotations: Annotations,
}

impl Node {
    pub(crate) fn new(index: NodeIndex) -> Self {
        Self {
            index,
            parent: None,
            children: Vec::new(),
            taxon: None,
            label: None,
            edge: Edge::new(index),
            annotations: Annotations::new(),
        }
    }

    /// Returns the index of this node.
    pub fn index(&self) -> NodeIndex {
        self.index
    }

    /// Returns the index of the parent node, if any.
    pub fn parent(&self) -> Option<NodeIndex> {
        self.parent
    }

    /// Returns the ordered child indices.
    pub fn children(&self) -> &[NodeIndex] {
        &self.children
    }

    /// Returns the number of children.
    pub fn num_children(&self) -> usize {
        self.children.len()
    }

    /// Whether this node has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Whether this node has children.
    pub fn is_internal(&self) -> bool {
        !self.children.is_empty()
    }

    /// Returns the taxon of this node, if any.
    pub fn taxon(&self) -> Option<&Rc<Taxon>> {
        self.taxon.as_ref()
    }

    /// Returns the label of this node, if any.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Returns the edge connecting this node to its parent.
    pub fn edge(&self) -> &Edge {
        &self.edge
    }

    /// Shortcut for the length of this node's edge.
    pub fn edge_length(&self) -> Option<f64> {
        self.edge.length.map(|l| *l)
    }

    /// Annotations of this node.
    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }
}

// =#========================================================================#=
// EDGE
// =#========================================================================#=
/// The edge connecting a node (its head) to the parent node (its tail).
#[derive(Debug, Clone)]
pub struct Edge {
    pub(crate) head: NodeIndex,
    pub(crate) tail: Option<NodeIndex>,
    pub(crate) length: Option<EdgeLength>,
    pub(crate) annotations: Annotations,
    pub(crate) split: Option<Split>,
}

impl Edge {
    fn new(head: NodeIndex) -> Self {
        Self {
            head,
            tail: None,
            length: None,
            annotations: Annotations::new(),
            split: None,
        }
    }

    /// Index of the node this edge belongs to.
    pub fn head(&self) -> NodeIndex {
        self.head
    }

    /// Index of the parent node, `None` for the seed's edge.
    pub fn tail(&self) -> Option<NodeIndex> {
        self.tail
    }

    /// Length of this edge; `None` means unknown / not applicable.
    pub fn length(&self) -> Option<f64> {
        self.length.map(|l| *l)
    }

    /// Annotations of this edge.
    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    /// Split bitmask, available after
    /// [encode_splits](crate::model::Tree::encode_splits).
    pub fn split(&self) -> Option<&Split> {
        self.split.as_ref()
    }
}

// =#========================================================================#=
// EDGE LENGTH
// =#========================================================================#=
/// Non-negative, finite edge length.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct EdgeLength(f64);

impl EdgeLength {
    /// Creates a new edge length.
    ///
    /// # Arguments
    /// * `length` - The edge length value (must be non-negative)
    ///
    /// # Panics
    /// Panics if `length` is negative or not finite.
    pub fn new(length: f64) -> Self {
        assert!(length >= 0.0, "Edge length must be non-negative, got {}", length);
        assert!(length.is_finite(), "Edge length must be finite, got {}", length);
        EdgeLength(length)
    }

    /// Fallible version of [new](Self::new).
    pub fn try_new(length: f64) -> Result<Self, TreeError> {
        if length >= 0.0 && length.is_finite() {
            Ok(EdgeLength(length))
        } else {
            Err(TreeError::InvalidEdgeLength(length))
        }
    }
}

impl Deref for EdgeLength {
    type Target = f64;
    fn deref(&self) -> &f64 {
        &self.0
    }
}

impl fmt::Display for EdgeLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
