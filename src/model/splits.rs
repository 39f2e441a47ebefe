//! Split (bipartition) encoding of edges.
//!
//! Each edge separates the leaf set into the leaves below it and the rest.
//! A [Split] stores the former as a bitmask over taxon indices. For unrooted
//! comparisons splits are normalized so that the bit of taxon 0 is unset,
//! which makes a split and its complement compare equal.

use crate::error::TreeError;
use crate::model::node::NodeIndex;
use crate::model::tree::Tree;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use tracing::trace;

const BITS: usize = u64::BITS as usize;

/// Bitmask over taxon indices.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Split(Vec<u64>);

impl Split {
    /// Creates an empty split able to hold `num_taxa` bits.
    pub fn new(num_taxa: usize) -> Self {
        Split(vec![0; num_taxa.div_ceil(BITS)])
    }

    /// Sets the bit of taxon `index`, growing the mask if needed.
    pub fn set(&mut self, index: usize) {
        let word = index / BITS;
        if word >= self.0.len() {
            self.0.resize(word + 1, 0);
        }
        self.0[word] |= 1u64 << (index % BITS);
    }

    /// Whether the bit of taxon `index` is set.
    pub fn is_set(&self, index: usize) -> bool {
        self.0
            .get(index / BITS)
            .is_some_and(|w| *w & (1u64 << (index % BITS)) != 0)
    }

    /// Number of set bits, i.e. leaves on this side of the split.
    pub fn count_ones(&self) -> usize {
        self.0.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// In-place bitwise or.
    pub fn union_with(&mut self, other: &Split) {
        if other.0.len() > self.0.len() {
            self.0.resize(other.0.len(), 0);
        }
        for (a, b) in self.0.iter_mut().zip(&other.0) {
            *a |= b;
        }
    }

    /// Complement with respect to the first `num_taxa` taxa.
    pub fn complement(&self, num_taxa: usize) -> Split {
        let mut complement = Split::new(num_taxa);
        for index in 0..num_taxa {
            if !self.is_set(index) {
                complement.set(index);
            }
        }
        complement
    }

    /// Returns this split or its complement, whichever has taxon 0 unset.
    pub fn normalized(&self, num_taxa: usize) -> Split {
        if self.is_set(0) {
            self.complement(num_taxa)
        } else {
            self.trimmed(num_taxa)
        }
    }

    /// Indices of the set bits in ascending order.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().enumerate().flat_map(|(w, &word)| {
            (0..BITS).filter(move |b| word & (1u64 << b) != 0).map(move |b| w * BITS + b)
        })
    }

    /// Copy resized to exactly hold `num_taxa` bits, so that equal sets
    /// compare equal regardless of how the masks were grown.
    fn trimmed(&self, num_taxa: usize) -> Split {
        let mut words = self.0.clone();
        words.resize(num_taxa.div_ceil(BITS), 0);
        Split(words)
    }
}

// ============================================================================
// Split encoding (pub)
// ============================================================================
impl Tree {
    /// Computes the split of every attached edge and stores it on the edge.
    ///
    /// # Errors
    /// [TreeError::MissingTaxon] if a leaf has no taxon.
    pub fn encode_splits(&mut self) -> Result<(), TreeError> {
        let num_taxa = self.taxon_set().borrow().len();
        let order: Vec<NodeIndex> = self.postorder_node_iter().map(|n| n.index()).collect();
        for &index in &order {
            let node = &self[index];
            let split = if node.is_leaf() {
                let taxon = node.taxon().ok_or(TreeError::MissingTaxon(index))?;
                let mut split = Split::new(num_taxa);
                split.set(taxon.index());
                split
            } else {
                let mut split = Split::new(num_taxa);
                for &child in node.children() {
                    if let Some(child_split) = &self[child].edge().split {
                        split.union_with(child_split);
                    }
                }
                split
            };
            self.node_mut(index).edge.split = Some(split);
        }
        trace!(num_edges = order.len(), "encoded splits");
        Ok(())
    }

    /// Maps the split of each non-trivial internal edge to its head node.
    ///
    /// Leaf edges and the seed's edge are skipped. If the tree is not
    /// [rooted](Tree::is_rooted), splits are normalized.
    ///
    /// # Errors
    /// [TreeError::MissingTaxon] if a leaf has no taxon.
    pub fn split_edges(&self) -> Result<HashMap<Split, NodeIndex>, TreeError> {
        let mut copy = self.clone();
        copy.encode_splits()?;
        let num_taxa = copy.taxon_set().borrow().len();
        let normalize = !copy.is_rooted();
        let seed = copy.seed_index();

        let splits = copy
            .preorder_node_iter()
            .filter(|n| n.is_internal() && n.index() != seed)
            .filter_map(|n| {
                let split = n.edge().split()?;
                let split = if normalize {
                    split.normalized(num_taxa)
                } else {
                    split.trimmed(num_taxa)
                };
                Some((split, n.index()))
            })
            .collect();
        Ok(splits)
    }

    /// Robinson-Foulds distance: number of internal splits present in
    /// exactly one of the two trees.
    ///
    /// Splits are normalized unless both trees are rooted.
    ///
    /// # Errors
    /// * [TreeError::ForeignTaxonSet] unless both trees share a taxon set
    /// * [TreeError::MissingTaxon] if a leaf has no taxon
    pub fn symmetric_difference(&self, other: &Tree) -> Result<usize, TreeError> {
        if !Rc::ptr_eq(self.taxon_set(), other.taxon_set()) {
            return Err(TreeError::ForeignTaxonSet);
        }
        let normalize = !(self.is_rooted() && other.is_rooted());
        let splits_a = self.comparable_splits(normalize)?;
        let splits_b = other.comparable_splits(normalize)?;
        Ok(splits_a.symmetric_difference(&splits_b).count())
    }

    fn comparable_splits(&self, normalize: bool) -> Result<HashSet<Split>, TreeError> {
        let mut copy = self.clone();
        copy.encode_splits()?;
        let num_taxa = copy.taxon_set().borrow().len();
        let num_leaves = copy.num_leaves();
        let seed = copy.seed_index();

        let mut splits = HashSet::new();
        for node in copy.preorder_node_iter() {
            if node.is_leaf() || node.index() == seed {
                continue;
            }
            let Some(split) = node.edge().split() else {
                continue;
            };
            // A clade holding all leaves but one is trivial once unrooted
            if normalize && split.count_ones() + 1 >= num_leaves {
                continue;
            }
            splits.insert(if normalize {
                split.normalized(num_taxa)
            } else {
                split.trimmed(num_taxa)
            });
        }
        Ok(splits)
    }
}

// =#========================================================================#=
// TESTS
// =#========================================================================#=
#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Rooting, SharedTaxonSet, TaxonSet};

    fn caterpillar(taxa: &SharedTaxonSet, order: [usize; 4]) -> Tree {
        let t = |i: usize| Some(taxa.borrow()[i].clone());
        let mut tree = Tree::new(taxa.clone());
        let seed = tree.seed_index();
        let inner = tree.new_child(seed, None, None).unwrap();
        tree.new_child(seed, t(order[3]), None).unwrap();
        let cherry = tree.new_child(inner, None, None).unwrap();
        tree.new_child(inner, t(order[2]), None).unwrap();
        tree.new_child(cherry, t(order[0]), None).unwrap();
        tree.new_child(cherry, t(order[1]), None).unwrap();
        tree
    }

    #[test]
    fn test_split_bits() {
        let mut split = Split::new(70);
        split.set(0);
        split.set(65);
        assert!(split.is_set(65));
        assert!(!split.is_set(64));
        assert_eq!(split.count_ones(), 2);
        assert_eq!(split.indices().collect::<Vec<_>>(), vec![0, 65]);
        let normalized = split.normalized(70);
        assert!(!normalized.is_set(0));
        assert_eq!(normalized.count_ones(), 68);
    }

    #[test]
    fn test_encode_splits() {
        let taxa = TaxonSet::from_labels(["A", "B", "C", "D"]).into_shared();
        let mut tree = caterpillar(&taxa, [0, 1, 2, 3]);
        tree.encode_splits().unwrap();
        let seed_split = tree.seed().edge().split().unwrap();
        assert_eq!(seed_split.count_ones(), 4);
        let cherry = tree.nodes(|n| n.num_children() == 2, |_, _| std::cmp::Ordering::Equal)[2];
        assert_eq!(cherry.edge().split().unwrap().indices().collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn test_symmetric_difference() {
        let taxa = TaxonSet::from_labels(["A", "B", "C", "D"]).into_shared();
        let t1 = caterpillar(&taxa, [0, 1, 2, 3]);
        let t2 = caterpillar(&taxa, [1, 0, 2, 3]);
        let t3 = caterpillar(&taxa, [0, 2, 1, 3]);
        assert_eq!(t1.symmetric_difference(&t2).unwrap(), 0);
        assert_eq!(t1.symmetric_difference(&t3).unwrap(), 2);
    }

    #[test]
    fn test_symmetric_difference_rooted() {
        let taxa = TaxonSet::from_labels(["A", "B", "C", "D"]).into_shared();
        let mut t1 = caterpillar(&taxa, [0, 1, 2, 3]);
        let mut t2 = caterpillar(&taxa, [2, 3, 1, 0]);
        // Unrooted both are AB|CD
        assert_eq!(t1.symmetric_difference(&t2).unwrap(), 0);
        t1.set_rooting(Rooting::Rooted);
        t2.set_rooting(Rooting::Rooted);
        assert_eq!(t1.symmetric_difference(&t2).unwrap(), 4);
    }

    #[test]
    fn test_foreign_taxon_sets() {
        let t1 = caterpillar(&TaxonSet::from_labels(["A", "B", "C", "D"]).into_shared(), [0, 1, 2, 3]);
        let t2 = caterpillar(&TaxonSet::from_labels(["A", "B", "C", "D"]).into_shared(), [0, 1, 2, 3]);
        assert_eq!(t1.symmetric_difference(&t2), Err(TreeError::ForeignTaxonSet));
    }
}
