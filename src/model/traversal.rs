//! Traversal of a [Tree].
//!
//! All iterators are lazy and borrow the tree immutably; every call starts a
//! fresh traversal of the current tree state from the seed. Detached nodes
//! are never visited.
//!
//! | Method | Order |
//! |--------|-------|
//! | [preorder_node_iter](Tree::preorder_node_iter) | parent before children, children left to right |
//! | [postorder_node_iter](Tree::postorder_node_iter) | children (left to right) before parent |
//! | [level_order_node_iter](Tree::level_order_node_iter) | breadth first |
//! | [leaf_iter](Tree::leaf_iter) | leaves only, left to right |
//! | [preorder_edge_iter](Tree::preorder_edge_iter), [postorder_edge_iter](Tree::postorder_edge_iter) | edges of the above node orders |
//! | [ancestor_iter](Tree::ancestor_iter) | from a node up to the seed |
//!
//! Custom orderings are available through [nodes](Tree::nodes), which takes
//! a filter predicate and a comparator.

use crate::model::node::{Edge, Node, NodeIndex};
use crate::model::tree::Tree;
use std::cmp::Ordering;
use std::collections::VecDeque;

// ============================================================================
// Traversal API (pub)
// ============================================================================
impl Tree {
    /// Returns an iterator over nodes in pre-order: a node is visited
    /// strictly before all of its descendants.
    pub fn preorder_node_iter(&self) -> PreOrderIter<'_> {
        PreOrderIter::new(self, self.seed_index())
    }

    /// Returns an iterator over nodes in post-order: all children of a node
    /// are visited strictly before the node itself.
    pub fn postorder_node_iter(&self) -> PostOrderIter<'_> {
        PostOrderIter::new(self, self.seed_index())
    }

    /// Returns an iterator over nodes in breadth-first order.
    pub fn level_order_node_iter(&self) -> LevelOrderIter<'_> {
        let mut queue = VecDeque::new();
        queue.push_back(self.seed_index());
        LevelOrderIter { tree: self, queue }
    }

    /// Returns an iterator over the leaves, from left to right.
    pub fn leaf_iter(&self) -> impl Iterator<Item = &Node> + '_ {
        self.preorder_node_iter().filter(|n| n.is_leaf())
    }

    /// Returns an iterator over edges, ordered by their head nodes in pre-order.
    /// Includes the seed's edge.
    pub fn preorder_edge_iter(&self) -> impl Iterator<Item = &Edge> + '_ {
        self.preorder_node_iter().map(|n| n.edge())
    }

    /// Returns an iterator over edges, ordered by their head nodes in post-order.
    /// Includes the seed's edge (last).
    pub fn postorder_edge_iter(&self) -> impl Iterator<Item = &Edge> + '_ {
        self.postorder_node_iter().map(|n| n.edge())
    }

    /// Returns an iterator over the children of `node`, in order.
    ///
    /// # Panics
    /// Panics if `node` is out of bounds.
    pub fn child_nodes(&self, node: NodeIndex) -> impl Iterator<Item = &Node> + '_ {
        self[node].children().iter().map(move |&c| &self[c])
    }

    /// Returns an iterator over the ancestors of `node`, starting with its
    /// parent and ending with the topmost ancestor (the seed if attached).
    ///
    /// # Panics
    /// Panics if `node` is out of bounds.
    pub fn ancestor_iter(&self, node: NodeIndex) -> AncestorIter<'_> {
        AncestorIter {
            tree: self,
            current: self[node].parent(),
        }
    }

    /// Collects references to the nodes accepted by `filter`, ordered by
    /// `cmp` (stable: nodes comparing equal stay in pre-order).
    ///
    /// # Arguments
    /// * `filter` - Predicate selecting nodes, e.g. `|n| n.is_internal()`
    /// * `cmp` - Comparator defining the order of the result
    ///
    /// # Example
    /// ```
    /// use phylio::model::{TaxonSet, Tree};
    ///
    /// let tree = Tree::star(TaxonSet::from_labels(["C", "A", "B"]).into_shared());
    /// let leaves = tree.nodes(
    ///     |n| n.is_leaf(),
    ///     |a, b| a.taxon().unwrap().label().cmp(b.taxon().unwrap().label()),
    /// );
    /// let labels: Vec<&str> = leaves.iter().map(|n| n.taxon().unwrap().label()).collect();
    /// assert_eq!(labels, vec!["A", "B", "C"]);
    /// ```
    pub fn nodes<F, C>(&self, mut filter: F, mut cmp: C) -> Vec<&Node>
    where
        F: FnMut(&Node) -> bool,
        C: FnMut(&Node, &Node) -> Ordering,
    {
        let mut nodes: Vec<&Node> = self.preorder_node_iter().filter(|n| filter(*n)).collect();
        nodes.sort_by(|a, b| cmp(*a, *b));
        nodes
    }

    /// Post-order iterator over the subtree rooted at `node`.
    pub(crate) fn postorder_iter_from(&self, node: NodeIndex) -> PostOrderIter<'_> {
        PostOrderIter::new(self, node)
    }

    /// Pre-order iterator over the subtree rooted at `node`.
    pub fn preorder_iter_from(&self, node: NodeIndex) -> PreOrderIter<'_> {
        PreOrderIter::new(self, node)
    }
}

/// Compares two floats, treating values within `tolerance` of each other as
/// equal. Intended for sorting by distances, where accumulated rounding
/// would otherwise split ties.
pub fn cmp_with_tolerance(a: f64, b: f64, tolerance: f64) -> Ordering {
    if (a - b).abs() <= tolerance {
        Ordering::Equal
    } else {
        a.total_cmp(&b)
    }
}

// =#========================================================================#=
// ITERATORS
// =#========================================================================#=
/// Post-order node iterator, created by [Tree::postorder_node_iter].
pub struct PostOrderIter<'a> {
    tree: &'a Tree,
    stack: Vec<(NodeIndex, bool)>, // (index, children_visited)
}

impl<'a> PostOrderIter<'a> {
    fn new(tree: &'a Tree, start: NodeIndex) -> Self {
        Self {
            tree,
            stack: vec![(start, false)],
        }
    }
}

impl<'a> Iterator for PostOrderIter<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((index, children_visited)) = self.stack.pop() {
            let node = &self.tree[index];

            if children_visited || node.is_leaf() {
                return Some(node);
            }

            self.stack.push((index, true));
            // Push children in reverse, so the leftmost is processed first
            for &child in node.children().iter().rev() {
                self.stack.push((child, false));
            }
        }
        None
    }
}

/// Pre-order node iterator, created by [Tree::preorder_node_iter].
pub struct PreOrderIter<'a> {
    tree: &'a Tree,
    stack: Vec<NodeIndex>,
}

impl<'a> PreOrderIter<'a> {
    fn new(tree: &'a Tree, start: NodeIndex) -> Self {
        Self {
            tree,
            stack: vec![start],
        }
    }
}

impl<'a> Iterator for PreOrderIter<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.stack.pop()?;
        let node = &self.tree[index];
        self.stack.extend(node.children().iter().rev());
        Some(node)
    }
}

/// Breadth-first node iterator, created by [Tree::level_order_node_iter].
pub struct LevelOrderIter<'a> {
    tree: &'a Tree,
    queue: VecDeque<NodeIndex>,
}

impl<'a> Iterator for LevelOrderIter<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.queue.pop_front()?;
        let node = &self.tree[index];
        self.queue.extend(node.children());
        Some(node)
    }
}

/// Iterator from a node's parent up to the topmost ancestor,
/// created by [Tree::ancestor_iter].
pub struct AncestorIter<'a> {
    tree: &'a Tree,
    current: Option<NodeIndex>,
}

impl<'a> Iterator for AncestorIter<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = &self.tree[self.current?];
        self.current = node.parent();
        Some(node)
    }
}

// =#========================================================================#=
// TESTS
// =#========================================================================#=
#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TaxonSet;

    /// (((A,B)x,C)y,(D,E)z)r;
    fn labelled_tree() -> Tree {
        let taxa = TaxonSet::new_shared();
        let mut tree = Tree::new(taxa.clone());
        let r = tree.seed_index();
        tree.set_node_label(r, Some("r".into())).unwrap();
        let y = tree.new_child(r, None, None).unwrap();
        tree.set_node_label(y, Some("y".into())).unwrap();
        let z = tree.new_child(r, None, None).unwrap();
        tree.set_node_label(z, Some("z".into())).unwrap();
        let x = tree.new_child(y, None, None).unwrap();
        tree.set_node_label(x, Some("x".into())).unwrap();
        for (parent, label) in [(x, "A"), (x, "B"), (y, "C"), (z, "D"), (z, "E")] {
            let taxon = taxa.borrow_mut().require_taxon(label);
            let leaf = tree.new_child(parent, Some(taxon), None).unwrap();
            tree.set_node_label(leaf, Some(label.into())).unwrap();
        }
        tree
    }

    fn labels<'a>(nodes: impl Iterator<Item = &'a Node>) -> String {
        nodes.map(|n| n.label().unwrap()).collect()
    }

    #[test]
    fn test_preorder() {
        let tree = labelled_tree();
        assert_eq!(labels(tree.preorder_node_iter()), "ryxABCzDE");
    }

    #[test]
    fn test_postorder() {
        let tree = labelled_tree();
        assert_eq!(labels(tree.postorder_node_iter()), "ABxCyDEzr");
    }

    #[test]
    fn test_level_order() {
        let tree = labelled_tree();
        assert_eq!(labels(tree.level_order_node_iter()), "ryzxCDEAB");
    }

    #[test]
    fn test_leaf_iter() {
        let tree = labelled_tree();
        assert_eq!(labels(tree.leaf_iter()), "ABCDE");
    }

    #[test]
    fn test_edge_iters_follow_nodes() {
        let tree = labelled_tree();
        let heads: Vec<NodeIndex> = tree.postorder_edge_iter().map(|e| e.head()).collect();
        let nodes: Vec<NodeIndex> = tree.postorder_node_iter().map(|n| n.index()).collect();
        assert_eq!(heads, nodes);
        assert_eq!(tree.preorder_edge_iter().next().unwrap().tail(), None);
    }

    #[test]
    fn test_ancestor_iter() {
        let tree = labelled_tree();
        let a = tree.leaf_iter().next().unwrap().index();
        assert_eq!(labels(tree.ancestor_iter(a)), "xyr");
    }

    #[test]
    fn test_nodes_filter_and_order() {
        let tree = labelled_tree();
        let internal = tree.nodes(|n| n.is_internal(), |a, b| b.label().cmp(&a.label()));
        assert_eq!(labels(internal.into_iter()), "zyxr");
    }

    #[test]
    fn test_cmp_with_tolerance() {
        assert_eq!(cmp_with_tolerance(1.0, 1.0 + 1e-12, 1e-9), Ordering::Equal);
        assert_eq!(cmp_with_tolerance(1.0, 2.0, 1e-9), Ordering::Less);
    }
}
