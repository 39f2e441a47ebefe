//! Topology-changing operations on a [Tree]: rerooting, ladderizing and
//! suppressing unifurcations.
//!
//! Rerooting keeps every leaf and the multiset of pairwise leaf path
//! lengths; only the seed and the distribution of edge lengths around it
//! change. Ladderizing only reorders children.

use crate::error::TreeError;
use crate::model::node::{EdgeLength, NodeIndex};
use crate::model::tree::{EPSILON, Rooting, Tree};
use tracing::trace;

// ============================================================================
// Rerooting (pub)
// ============================================================================
impl Tree {
    /// Makes `new_seed` the seed of this tree by reversing the edges on the
    /// path between it and the current seed.
    ///
    /// Each reversed edge keeps its length and annotations. If the former
    /// seed is left with a single child, it is suppressed and its two
    /// adjacent edge lengths are summed; if it is left as a leaf without
    /// taxon, it is removed. Rerooting at the current seed is a no-op.
    ///
    /// # Errors
    /// * [TreeError::DetachedNode] if `new_seed` is not reachable from the seed
    /// * [TreeError::RerootAtLeaf] if `new_seed` is a leaf
    pub fn reroot_at_node(&mut self, new_seed: NodeIndex) -> Result<(), TreeError> {
        let path = self.path_to_seed(new_seed)?;
        if new_seed == self.seed_index() {
            return Ok(());
        }
        if self[new_seed].is_leaf() {
            return Err(TreeError::RerootAtLeaf(new_seed));
        }
        trace!(new_seed, path_len = path.len(), "rerooting");

        let old_seed = self.seed_index();

        // Edge data of path[i] travels to path[i + 1] once the edge is reversed
        let mut moved = Vec::with_capacity(path.len() - 1);
        for window in path.windows(2) {
            let (child, parent) = (window[0], window[1]);
            self.detach(parent, child);
            let edge = &mut self.node_mut(child).edge;
            moved.push((edge.length.take(), std::mem::take(&mut edge.annotations)));
        }
        for (window, (length, annotations)) in path.windows(2).zip(moved) {
            let (child, parent) = (window[0], window[1]);
            self.attach(child, parent);
            let edge = &mut self.node_mut(parent).edge;
            edge.length = length;
            edge.annotations = annotations;
            edge.split = None;
        }
        self.set_seed_unchecked(new_seed);

        self.tidy_former_seed(old_seed);
        Ok(())
    }

    /// Splits the edge of `node` by inserting a new node at
    /// `distance_from_tail` from its parent, then reroots at the new node.
    ///
    /// # Errors
    /// * [TreeError::DetachedNode] if `node` is the seed or detached
    /// * [TreeError::InvalidEdgeLength] if `distance_from_tail` is negative or
    ///   exceeds the edge length
    ///
    /// # Returns
    /// The index of the new seed.
    pub fn reroot_at_edge(
        &mut self,
        node: NodeIndex,
        distance_from_tail: f64,
    ) -> Result<NodeIndex, TreeError> {
        let new_seed = self.split_edge(node, distance_from_tail)?;
        self.reroot_at_node(new_seed)?;
        Ok(new_seed)
    }

    /// Reroots this tree at the midpoint of the longest path between any
    /// two leaves. Unset edge lengths count as 0.
    ///
    /// If the midpoint coincides (within tolerance) with an existing
    /// internal node, that node becomes the seed; otherwise the edge
    /// containing the midpoint is split.
    ///
    /// The tree is marked [Rooted](Rooting::Rooted) afterwards.
    ///
    /// # Errors
    /// [TreeError::TooFewLeaves] if the tree has fewer than two leaves.
    pub fn reroot_at_midpoint(&mut self) -> Result<(), TreeError> {
        self.find_and_reroot_at_midpoint()?;
        self.set_rooting(Rooting::Rooted);
        Ok(())
    }

    fn find_and_reroot_at_midpoint(&mut self) -> Result<(), TreeError> {
        let leaves: Vec<NodeIndex> = self.leaf_iter().map(|n| n.index()).collect();
        if leaves.len() < 2 {
            return Err(TreeError::TooFewLeaves {
                required: 2,
                found: leaves.len(),
            });
        }

        // Longest leaf-to-leaf path
        let (mut leaf_a, mut leaf_b, mut max_distance) = (leaves[0], leaves[1], f64::NEG_INFINITY);
        for (i, &a) in leaves.iter().enumerate() {
            let from_a = self.undirected_distances(a);
            for &b in &leaves[i + 1..] {
                if from_a[b] > max_distance {
                    (leaf_a, leaf_b, max_distance) = (a, b, from_a[b]);
                }
            }
        }
        if max_distance <= EPSILON {
            return Ok(());
        }
        let half = max_distance / 2.0;

        // Walk up from whichever leaf lies farther from the MRCA
        let mrca = self.mrca(leaf_a, leaf_b)?;
        let mrca_depth = self.distance_from_root(mrca);
        let start = if self.distance_from_root(leaf_a) - mrca_depth >= half {
            leaf_a
        } else {
            leaf_b
        };

        let mut walked = 0.0;
        let mut current = start;
        loop {
            let length = self[current].edge_length().unwrap_or(0.0);
            if walked + length >= half - EPSILON {
                let from_head = half - walked;
                trace!(leaf_a, leaf_b, max_distance, node = current, from_head, "midpoint found");
                if from_head <= EPSILON {
                    return self.reroot_at_node(current);
                }
                let parent = self[current].parent().ok_or(TreeError::DetachedNode(current))?;
                if length - from_head <= EPSILON {
                    return self.reroot_at_node(parent);
                }
                self.reroot_at_edge(current, length - from_head)?;
                return Ok(());
            }
            walked += length;
            current = self[current].parent().ok_or(TreeError::DetachedNode(current))?;
        }
    }

    /// Inserts a new node on the edge of `node`, at `distance_from_tail`
    /// from its parent. The new node takes `node`'s position among the
    /// parent's children.
    ///
    /// # Returns
    /// The index of the inserted node.
    pub fn split_edge(
        &mut self,
        node: NodeIndex,
        distance_from_tail: f64,
    ) -> Result<NodeIndex, TreeError> {
        self.check_exists(node)?;
        let parent = self[node].parent().ok_or(TreeError::DetachedNode(node))?;
        let length = self[node].edge_length().unwrap_or(0.0);
        if !(0.0..=length + EPSILON).contains(&distance_from_tail) {
            return Err(TreeError::InvalidEdgeLength(distance_from_tail));
        }

        let position = self
            .detach(parent, node)
            .ok_or(TreeError::NotAChild { parent, child: node })?;
        let middle = self.push_node();
        self.attach_at(parent, position, middle);
        self.attach(middle, node);
        self.node_mut(middle).edge.length = Some(EdgeLength::try_new(distance_from_tail)?);
        self.node_mut(node).edge.length =
            Some(EdgeLength::try_new((length - distance_from_tail).max(0.0))?);
        Ok(middle)
    }

    /// Removes every attached node with exactly one child by connecting the
    /// child to the grandparent; edge lengths are summed. A seed with a
    /// single child is replaced by that child.
    ///
    /// # Returns
    /// The number of suppressed nodes.
    pub fn suppress_unifurcations(&mut self) -> usize {
        let unifurcations: Vec<NodeIndex> = self
            .postorder_node_iter()
            .filter(|n| n.num_children() == 1)
            .map(|n| n.index())
            .collect();
        for &node in &unifurcations {
            self.splice_out(node);
        }
        unifurcations.len()
    }
}

// ============================================================================
// Ladderizing (pub)
// ============================================================================
impl Tree {
    /// Sorts the children of every internal node by the number of nodes in
    /// their subtrees: ascending if `right` is `false`, descending otherwise.
    ///
    /// The sort is stable, so children of equal size keep their relative
    /// order and a second call with the same flag changes nothing.
    pub fn ladderize(&mut self, right: bool) {
        let mut num_descendants = vec![0usize; self.arena_len()];
        let order: Vec<NodeIndex> = self.postorder_node_iter().map(|n| n.index()).collect();
        for &index in &order {
            num_descendants[index] = self[index]
                .children()
                .iter()
                .map(|&c| 1 + num_descendants[c])
                .sum();
        }

        for &index in &order {
            let children = &mut self.node_mut(index).children;
            if right {
                children.sort_by(|a, b| num_descendants[*b].cmp(&num_descendants[*a]));
            } else {
                children.sort_by(|a, b| num_descendants[*a].cmp(&num_descendants[*b]));
            }
        }
    }
}

// ============================================================================
// Helpers (private)
// ============================================================================
impl Tree {
    /// Cleans up a former seed after rerooting.
    fn tidy_former_seed(&mut self, old_seed: NodeIndex) {
        match self[old_seed].num_children() {
            1 => self.splice_out(old_seed),
            0 if self[old_seed].taxon().is_none() => {
                if let Some(parent) = self[old_seed].parent() {
                    self.detach(parent, old_seed);
                }
            }
            _ => {}
        }
    }

    /// Removes unifurcating `node`, connecting its only child to its parent
    /// at the same position.
    fn splice_out(&mut self, node: NodeIndex) {
        let child = self[node].children()[0];
        let summed = match (self[node].edge.length, self[child].edge.length) {
            (None, None) => None,
            (a, b) => Some(EdgeLength::new(
                a.map_or(0.0, |l| *l) + b.map_or(0.0, |l| *l),
            )),
        };

        self.detach(node, child);
        match self[node].parent() {
            Some(parent) => {
                if let Some(position) = self.detach(parent, node) {
                    self.attach_at(parent, position, child);
                }
                self.node_mut(child).edge.length = summed;
            }
            None => {
                // Unifurcating seed: its child takes over
                self.set_seed_unchecked(child);
            }
        }
    }
}

// =#========================================================================#=
// TESTS
// =#========================================================================#=
#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TaxonSet;

    /// ((A:1,B:2):3,(C:4,D:5):6);
    fn quartet() -> (Tree, Vec<NodeIndex>) {
        let taxa = TaxonSet::from_labels(["A", "B", "C", "D"]).into_shared();
        let taxon = |i: usize| Some(taxa.borrow()[i].clone());
        let mut tree = Tree::new(taxa.clone());
        let seed = tree.seed_index();
        let ab = tree.new_child(seed, None, Some(3.0)).unwrap();
        let cd = tree.new_child(seed, None, Some(6.0)).unwrap();
        let a = tree.new_child(ab, taxon(0), Some(1.0)).unwrap();
        let b = tree.new_child(ab, taxon(1), Some(2.0)).unwrap();
        let c = tree.new_child(cd, taxon(2), Some(4.0)).unwrap();
        let d = tree.new_child(cd, taxon(3), Some(5.0)).unwrap();
        (tree, vec![ab, cd, a, b, c, d])
    }

    #[test]
    fn test_reroot_at_node_preserves_distances() {
        let (mut tree, nodes) = quartet();
        let before = tree.pairwise_leaf_distances();
        tree.reroot_at_node(nodes[1]).unwrap();
        assert!(tree.is_valid());
        assert_eq!(tree.seed_index(), nodes[1]);
        assert_eq!(tree.num_leaves(), 4);
        // Former bifurcating seed suppressed: cd now has C, D and ab
        assert_eq!(tree.seed().num_children(), 3);
        assert_eq!(tree[nodes[0]].edge_length(), Some(9.0));
        assert_eq!(tree.pairwise_leaf_distances(), before);
    }

    #[test]
    fn test_reroot_at_leaf_fails() {
        let (mut tree, nodes) = quartet();
        assert_eq!(tree.reroot_at_node(nodes[2]), Err(TreeError::RerootAtLeaf(nodes[2])));
    }

    #[test]
    fn test_reroot_at_seed_is_noop() {
        let (mut tree, _) = quartet();
        let seed = tree.seed_index();
        tree.reroot_at_node(seed).unwrap();
        assert_eq!(tree.seed_index(), seed);
        assert_eq!(tree.num_nodes(), 7);
    }

    #[test]
    fn test_midpoint() {
        let (mut tree, nodes) = quartet();
        let before = tree.pairwise_leaf_distances();
        tree.reroot_at_midpoint().unwrap();
        assert!(tree.is_valid());
        assert_eq!(tree.pairwise_leaf_distances(), before);
        // Longest path B-D = 2 + 3 + 6 + 5 = 16, so both lie at 8 from the seed
        assert!((tree.distance_from_root(nodes[3]) - 8.0).abs() < 1e-9);
        assert!((tree.distance_from_root(nodes[5]) - 8.0).abs() < 1e-9);
        assert_eq!(tree.seed().num_children(), 2);
        assert!(tree.is_rooted());
    }

    #[test]
    fn test_ladderize() {
        let taxa = TaxonSet::from_labels(["A", "B", "C"]).into_shared();
        let mut tree = Tree::new(taxa);
        let seed = tree.seed_index();
        let big = tree.new_child(seed, None, None).unwrap();
        tree.new_child(big, None, None).unwrap();
        tree.new_child(big, None, None).unwrap();
        let small = tree.new_child(seed, None, None).unwrap();

        tree.ladderize(false);
        assert_eq!(tree.seed().children(), &[small, big]);
        tree.ladderize(true);
        assert_eq!(tree.seed().children(), &[big, small]);
    }

    #[test]
    fn test_suppress_unifurcations() {
        let taxa = TaxonSet::from_labels(["A", "B"]).into_shared();
        let (a, b) = (taxa.borrow()[0].clone(), taxa.borrow()[1].clone());
        let mut tree = Tree::new(taxa);
        let seed = tree.seed_index();
        let mid = tree.new_child(seed, None, Some(1.0)).unwrap();
        let inner = tree.new_child(mid, None, Some(2.0)).unwrap();
        tree.new_child(inner, Some(a), Some(1.0)).unwrap();
        tree.new_child(inner, Some(b), Some(1.0)).unwrap();

        assert_eq!(tree.suppress_unifurcations(), 2);
        assert_eq!(tree.seed_index(), inner);
        assert_eq!(tree.num_nodes(), 3);
    }

    #[test]
    fn test_split_edge() {
        let (mut tree, nodes) = quartet();
        let middle = tree.split_edge(nodes[1], 2.0).unwrap();
        assert_eq!(tree.seed().children()[1], middle);
        assert_eq!(tree[middle].edge_length(), Some(2.0));
        assert_eq!(tree[nodes[1]].edge_length(), Some(4.0));
        assert!(tree.split_edge(nodes[1], 7.0).is_err());
    }
}
