//! Core tree structure using the arena pattern.
//!
//! A [Tree] stores all of its [Node]s in a contiguous vector and references
//! them by [NodeIndex]. Exactly one node is the seed (root); every other node
//! reachable from it has exactly one parent. Nodes created but not (or no
//! longer) attached stay in the arena as detached slots and are ignored by
//! traversals and metrics.

use crate::error::TreeError;
use crate::model::annotation::Annotations;
use crate::model::node::{EdgeLength, Node, NodeIndex};
use crate::model::taxon::{SharedTaxonSet, Taxon};
use std::ops::Index;
use std::rc::Rc;

/// Float comparison tolerance
pub(crate) const EPSILON: f64 = 1e-7;

/// Rooting state of a tree, as declared by its source or creator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rooting {
    Rooted,
    Unrooted,
    #[default]
    Unspecified,
}

// =#========================================================================#=
// TREE
// =#========================================================================#=
/// A rooted or unrooted n-ary phylogenetic tree.
///
/// # Structure
/// - All nodes are stored in the arena; the seed is created with the tree
/// - No assumption on order of indices (leaves need not come first)
/// - Leaves (and possibly internal nodes) reference taxa of the shared
///   taxon set
/// - Edge lengths are optional, but if set must be non-negative
///
/// # Cloning
/// [Clone] is a deep clone of the node arena: the copy is fully independent
/// of the original (mutating one never affects the other) but references
/// the *same* taxon set and the same [Taxon] objects.
///
/// # Example
/// ```
/// use phylio::model::{TaxonSet, Tree};
///
/// let taxa = TaxonSet::new_shared();
/// let a = taxa.borrow_mut().require_taxon("A");
/// let b = taxa.borrow_mut().require_taxon("B");
///
/// let mut tree = Tree::new(taxa);
/// let seed = tree.seed_index();
/// tree.new_child(seed, Some(a), Some(1.0)).unwrap();
/// tree.new_child(seed, Some(b), Some(2.0)).unwrap();
///
/// assert!(tree.is_valid());
/// assert_eq!(tree.num_leaves(), 2);
/// assert_eq!(tree.length(), 3.0);
/// ```
#[derive(Debug, Clone)]
pub struct Tree {
    /// Nodes of this tree (arena pattern)
    nodes: Vec<Node>,
    /// Index of the seed (root) node
    seed: NodeIndex,
    taxon_set: SharedTaxonSet,
    /// Label of tree; optional, e.g. when parsed from Nexus file
    label: Option<String>,
    rooting: Rooting,
}

// ============================================================================
// New, Getters / Accessors, etc. (pub)
// ============================================================================
impl Tree {
    /// Creates a new tree consisting of a single seed node.
    ///
    /// # Arguments
    /// * `taxon_set` - The taxon set this tree's taxa belong to
    pub fn new(taxon_set: SharedTaxonSet) -> Self {
        Tree {
            nodes: vec![Node::new(0)],
            seed: 0,
            taxon_set,
            label: None,
            rooting: Rooting::Unspecified,
        }
    }

    /// Creates a star tree: a seed with one leaf child per taxon of
    /// `taxon_set`, in taxon set order, all edge lengths unset.
    pub fn star(taxon_set: SharedTaxonSet) -> Self {
        let taxa: Vec<Rc<Taxon>> = taxon_set.borrow().iter().cloned().collect();
        let mut tree = Tree::new(taxon_set);
        let seed = tree.seed;
        for taxon in taxa {
            let leaf = tree.push_node();
            tree.nodes[leaf].taxon = Some(taxon);
            tree.attach(seed, leaf);
        }
        tree
    }

    /// Attaches a label to this tree.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Label of this tree, if any.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Sets or clears the label of this tree.
    pub fn set_label(&mut self, label: Option<String>) {
        self.label = label;
    }

    /// Rooting state of this tree.
    pub fn rooting(&self) -> Rooting {
        self.rooting
    }

    /// Sets the rooting state of this tree.
    pub fn set_rooting(&mut self, rooting: Rooting) {
        self.rooting = rooting;
    }

    /// Whether this tree is explicitly rooted.
    pub fn is_rooted(&self) -> bool {
        self.rooting == Rooting::Rooted
    }

    /// The taxon set this tree references.
    pub fn taxon_set(&self) -> &SharedTaxonSet {
        &self.taxon_set
    }

    /// Index of the seed (root) node.
    pub fn seed_index(&self) -> NodeIndex {
        self.seed
    }

    /// The seed (root) node.
    pub fn seed(&self) -> &Node {
        &self.nodes[self.seed]
    }

    /// Makes the detached node `index` the seed of this tree.
    ///
    /// The previous seed (and everything below it) becomes detached.
    ///
    /// # Errors
    /// [TreeError::NoSuchNode] if the index is out of bounds,
    /// [TreeError::AlreadyAttached] if the node has a parent.
    pub fn set_seed(&mut self, index: NodeIndex) -> Result<(), TreeError> {
        self.check_exists(index)?;
        if self.nodes[index].parent.is_some() {
            return Err(TreeError::AlreadyAttached(index));
        }
        self.seed = index;
        Ok(())
    }

    /// Returns the node at `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    pub fn node(&self, index: NodeIndex) -> &Node {
        &self.nodes[index]
    }

    /// Returns the node at `index`, or `None` if out of bounds.
    pub fn get_node(&self, index: NodeIndex) -> Option<&Node> {
        self.nodes.get(index)
    }

    /// Number of slots in the arena, including detached nodes.
    pub fn arena_len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether `index` is reachable from the seed.
    pub fn is_attached(&self, index: NodeIndex) -> bool {
        if index >= self.nodes.len() {
            return false;
        }
        self.ancestor_indices(index).last() == Some(&self.seed)
    }
}

impl Index<NodeIndex> for Tree {
    type Output = Node;

    fn index(&self, index: NodeIndex) -> &Self::Output {
        &self.nodes[index]
    }
}

// ============================================================================
// Construction & Mutation (pub)
// ============================================================================
impl Tree {
    /// Creates a new detached node and returns its index.
    pub fn new_node(&mut self) -> NodeIndex {
        self.push_node()
    }

    /// Appends `child` to the end of `parent`'s child list, setting the
    /// child's parent back-reference and edge tail. O(1) amortized.
    ///
    /// # Errors
    /// * [TreeError::NoSuchNode] if either index is out of bounds
    /// * [TreeError::AlreadyAttached] if `child` already has a parent
    /// * [TreeError::Cycle] if `child` is the seed, `parent` itself or one of
    ///   `parent`'s ancestors (e.g. the root of a detached fragment containing `parent`)
    pub fn add_child(&mut self, parent: NodeIndex, child: NodeIndex) -> Result<(), TreeError> {
        self.check_exists(parent)?;
        self.check_exists(child)?;
        if child == parent || child == self.seed {
            return Err(TreeError::Cycle { parent, child });
        }
        if self.nodes[child].parent.is_some() {
            return Err(TreeError::AlreadyAttached(child));
        }
        // Parent links are acyclic, so this walk ends
        if self.ancestor_indices(parent).contains(&child) {
            return Err(TreeError::Cycle { parent, child });
        }
        self.attach(parent, child);
        Ok(())
    }

    /// Creates a new node and appends it as child of `parent`.
    ///
    /// # Arguments
    /// * `parent` - Index of the parent node
    /// * `taxon` - Optional taxon of the new node; must be from this tree's taxon set
    /// * `edge_length` - Optional length of the new node's edge
    ///
    /// # Returns
    /// Index of the new child.
    pub fn new_child(
        &mut self,
        parent: NodeIndex,
        taxon: Option<Rc<Taxon>>,
        edge_length: Option<f64>,
    ) -> Result<NodeIndex, TreeError> {
        self.check_exists(parent)?;
        let length = edge_length.map(EdgeLength::try_new).transpose()?;
        if let Some(taxon) = &taxon {
            self.check_taxon(taxon)?;
        }
        let child = self.push_node();
        self.nodes[child].taxon = taxon;
        self.nodes[child].edge.length = length;
        self.attach(parent, child);
        Ok(child)
    }

    /// Detaches `child` from `parent`. The child (with its subtree) stays
    /// in the arena as a detached fragment.
    ///
    /// # Errors
    /// [TreeError::NotAChild] if `child` is not a child of `parent`.
    pub fn remove_child(&mut self, parent: NodeIndex, child: NodeIndex) -> Result<(), TreeError> {
        self.check_exists(parent)?;
        self.check_exists(child)?;
        self.detach(parent, child)
            .map(|_| ())
            .ok_or(TreeError::NotAChild { parent, child })
    }

    /// Sets or clears the length of the edge of `node`.
    ///
    /// # Errors
    /// [TreeError::InvalidEdgeLength] if the length is negative or not finite.
    pub fn set_edge_length(&mut self, node: NodeIndex, length: Option<f64>) -> Result<(), TreeError> {
        self.check_exists(node)?;
        self.nodes[node].edge.length = length.map(EdgeLength::try_new).transpose()?;
        Ok(())
    }

    /// Sets or clears the taxon of `node`.
    ///
    /// # Errors
    /// [TreeError::ForeignTaxonSet] if the taxon is not part of this tree's taxon set.
    pub fn set_taxon(&mut self, node: NodeIndex, taxon: Option<Rc<Taxon>>) -> Result<(), TreeError> {
        self.check_exists(node)?;
        if let Some(taxon) = &taxon {
            self.check_taxon(taxon)?;
        }
        self.nodes[node].taxon = taxon;
        Ok(())
    }

    /// Sets or clears the free label of `node`.
    pub fn set_node_label(&mut self, node: NodeIndex, label: Option<String>) -> Result<(), TreeError> {
        self.check_exists(node)?;
        self.nodes[node].label = label;
        Ok(())
    }

    /// Mutable access to the annotations of `node`.
    ///
    /// # Panics
    /// Panics if `node` is out of bounds.
    pub fn node_annotations_mut(&mut self, node: NodeIndex) -> &mut Annotations {
        &mut self.nodes[node].annotations
    }

    /// Mutable access to the annotations of the edge of `node`.
    ///
    /// # Panics
    /// Panics if `node` is out of bounds.
    pub fn edge_annotations_mut(&mut self, node: NodeIndex) -> &mut Annotations {
        &mut self.nodes[node].edge.annotations
    }
}

// ============================================================================
// Validation & Metrics (pub)
// ============================================================================
impl Tree {
    /// Validates the tree structure and all index references.
    ///
    /// Checks:
    /// - Seed index is valid and the seed has no parent
    /// - All node and edge indices match their arena position
    /// - Every reachable child points back to its parent (also via edge tail)
    /// - No node is reachable twice
    /// - All taxa belong to this tree's taxon set
    ///
    /// # Returns
    /// `true` if tree is valid, `false` otherwise
    pub fn is_valid(&self) -> bool {
        if self.seed >= self.nodes.len() {
            return false;
        }
        let seed = &self.nodes[self.seed];
        if seed.parent.is_some() || seed.edge.tail.is_some() {
            return false;
        }

        let taxon_set = self.taxon_set.borrow();
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![self.seed];
        while let Some(index) = stack.pop() {
            if visited[index] {
                return false;
            }
            visited[index] = true;

            let node = &self.nodes[index];
            if node.index() != index || node.edge.head != index {
                return false;
            }
            if let Some(taxon) = &node.taxon {
                if !taxon_set.contains(taxon) {
                    return false;
                }
            }
            for &child in &node.children {
                if child >= self.nodes.len() {
                    return false;
                }
                let child_node = &self.nodes[child];
                if child_node.parent != Some(index) || child_node.edge.tail != Some(index) {
                    return false;
                }
                stack.push(child);
            }
        }

        true
    }

    /// Number of nodes reachable from the seed.
    pub fn num_nodes(&self) -> usize {
        self.preorder_node_iter().count()
    }

    /// Number of leaves reachable from the seed.
    pub fn num_leaves(&self) -> usize {
        self.leaf_iter().count()
    }

    /// Number of internal nodes (including the seed if it has children).
    pub fn num_internal(&self) -> usize {
        self.preorder_node_iter().filter(|n| n.is_internal()).count()
    }

    /// Sum of all edge lengths (unset lengths and the seed's edge count as 0).
    pub fn length(&self) -> f64 {
        self.preorder_node_iter()
            .filter(|n| n.index() != self.seed)
            .map(|n| n.edge_length().unwrap_or(0.0))
            .sum()
    }

    /// Whether every non-seed edge has a length set.
    pub fn has_edge_lengths(&self) -> bool {
        self.preorder_node_iter()
            .filter(|n| n.index() != self.seed)
            .all(|n| n.edge.length.is_some())
    }

    /// Sum of edge lengths along the unique path from `node` up to the seed.
    ///
    /// Unset edge lengths count as 0; the seed's own edge is not included.
    ///
    /// # Panics
    /// Panics if `node` is out of bounds.
    pub fn distance_from_root(&self, node: NodeIndex) -> f64 {
        let mut distance = 0.0;
        let mut current = node;
        while let Some(parent) = self.nodes[current].parent {
            distance += self.nodes[current].edge_length().unwrap_or(0.0);
            current = parent;
        }
        distance
    }

    /// Length of the longest path from `node` down to a leaf of its subtree.
    ///
    /// Unset edge lengths count as 0; a leaf has distance 0.
    ///
    /// # Panics
    /// Panics if `node` is out of bounds.
    pub fn distance_from_tip(&self, node: NodeIndex) -> f64 {
        let mut from_tip = std::collections::HashMap::new();
        for n in self.postorder_iter_from(node) {
            let d = n
                .children
                .iter()
                .map(|&c| from_tip[&c] + self.nodes[c].edge_length().unwrap_or(0.0))
                .fold(0.0, f64::max);
            from_tip.insert(n.index(), d);
        }
        from_tip[&node]
    }

    /// Maximal distance from the seed to any leaf.
    pub fn max_distance_from_root(&self) -> f64 {
        self.distance_from_tip(self.seed)
    }

    /// Returns whether all leaves have the same distance to the seed
    /// (up to a small tolerance).
    pub fn is_ultrametric(&self) -> bool {
        let mut distances = self.leaf_iter().map(|l| self.distance_from_root(l.index()));
        match distances.next() {
            None => true,
            Some(first) => distances.all(|d| (d - first).abs() < EPSILON.max(EPSILON * first)),
        }
    }

    /// Most recent common ancestor of `a` and `b`.
    ///
    /// # Errors
    /// [TreeError::DetachedNode] if one of the nodes is not attached.
    pub fn mrca(&self, a: NodeIndex, b: NodeIndex) -> Result<NodeIndex, TreeError> {
        let path_a = self.path_to_seed(a)?;
        let path_b = self.path_to_seed(b)?;
        let on_path_a: std::collections::HashSet<NodeIndex> = path_a.into_iter().collect();
        path_b
            .into_iter()
            .find(|n| on_path_a.contains(n))
            .ok_or(TreeError::DetachedNode(b))
    }

    /// Sum of edge lengths along the path between `a` and `b`.
    pub fn path_length(&self, a: NodeIndex, b: NodeIndex) -> Result<f64, TreeError> {
        let mrca = self.mrca(a, b)?;
        Ok(self.distance_from_root(a) + self.distance_from_root(b)
            - 2.0 * self.distance_from_root(mrca))
    }

    /// Path lengths between all unordered pairs of leaves, sorted ascending.
    ///
    /// This multiset is invariant under rerooting.
    pub fn pairwise_leaf_distances(&self) -> Vec<f64> {
        let leaves: Vec<NodeIndex> = self.leaf_iter().map(|n| n.index()).collect();
        let mut distances = Vec::with_capacity(leaves.len() * leaves.len().saturating_sub(1) / 2);
        for (i, &a) in leaves.iter().enumerate() {
            let from_a = self.undirected_distances(a);
            for &b in &leaves[i + 1..] {
                distances.push(from_a[b]);
            }
        }
        distances.sort_by(f64::total_cmp);
        distances
    }
}

// ============================================================================
// Helpers (crate)
// ============================================================================
impl Tree {
    pub(crate) fn push_node(&mut self) -> NodeIndex {
        let index = self.nodes.len();
        self.nodes.push(Node::new(index));
        index
    }

    /// Appends `child` to `parent` without checks.
    pub(crate) fn attach(&mut self, parent: NodeIndex, child: NodeIndex) {
        self.nodes[parent].children.push(child);
        self.nodes[child].parent = Some(parent);
        self.nodes[child].edge.tail = Some(parent);
    }

    /// Inserts `child` into `parent`'s child list at `position` without checks.
    pub(crate) fn attach_at(&mut self, parent: NodeIndex, position: usize, child: NodeIndex) {
        let position = position.min(self.nodes[parent].children.len());
        self.nodes[parent].children.insert(position, child);
        self.nodes[child].parent = Some(parent);
        self.nodes[child].edge.tail = Some(parent);
    }

    /// Removes `child` from `parent`, returning its former position.
    pub(crate) fn detach(&mut self, parent: NodeIndex, child: NodeIndex) -> Option<usize> {
        let position = self.nodes[parent].children.iter().position(|&c| c == child)?;
        self.nodes[parent].children.remove(position);
        self.nodes[child].parent = None;
        self.nodes[child].edge.tail = None;
        Some(position)
    }

    pub(crate) fn node_mut(&mut self, index: NodeIndex) -> &mut Node {
        &mut self.nodes[index]
    }

    pub(crate) fn nodes_slice(&self) -> &[Node] {
        &self.nodes
    }

    pub(crate) fn set_seed_unchecked(&mut self, index: NodeIndex) {
        self.seed = index;
    }

    pub(crate) fn check_exists(&self, index: NodeIndex) -> Result<(), TreeError> {
        if index < self.nodes.len() {
            Ok(())
        } else {
            Err(TreeError::NoSuchNode(index))
        }
    }

    fn check_taxon(&self, taxon: &Rc<Taxon>) -> Result<(), TreeError> {
        if self.taxon_set.borrow().contains(taxon) {
            Ok(())
        } else {
            Err(TreeError::ForeignTaxonSet)
        }
    }

    /// `node` followed by all of its ancestors, ending at a parentless node.
    pub(crate) fn ancestor_indices(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut path = vec![node];
        let mut current = node;
        while let Some(parent) = self.nodes[current].parent {
            path.push(parent);
            current = parent;
        }
        path
    }

    /// Like [ancestor_indices](Self::ancestor_indices), but fails unless the
    /// path ends at the seed.
    pub(crate) fn path_to_seed(&self, node: NodeIndex) -> Result<Vec<NodeIndex>, TreeError> {
        self.check_exists(node)?;
        let path = self.ancestor_indices(node);
        if path.last() == Some(&self.seed) {
            Ok(path)
        } else {
            Err(TreeError::DetachedNode(node))
        }
    }

    /// Distances from `source` to every attached node, ignoring edge direction.
    /// Detached slots hold `f64::INFINITY`.
    pub(crate) fn undirected_distances(&self, source: NodeIndex) -> Vec<f64> {
        let mut distances = vec![f64::INFINITY; self.nodes.len()];
        distances[source] = 0.0;
        let mut stack = vec![source];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            let base = distances[index];
            if let Some(parent) = node.parent {
                if distances[parent].is_infinite() {
                    distances[parent] = base + node.edge_length().unwrap_or(0.0);
                    stack.push(parent);
                }
            }
            for &child in &node.children {
                if distances[child].is_infinite() {
                    distances[child] = base + self.nodes[child].edge_length().unwrap_or(0.0);
                    stack.push(child);
                }
            }
        }
        distances
    }
}
