//! Star trees and uniform-rate pure-birth (Yule) trees.

use crate::error::SimulationError;
use crate::model::{Rooting, SharedTaxonSet, Taxon, Tree};
use rand::Rng;
use rand_distr::Exp;
use std::rc::Rc;
use tracing::trace;

/// Builds a star tree: one leaf below the seed per taxon, in taxon set order.
///
/// # Example
/// ```
/// use phylio::model::TaxonSet;
/// use phylio::treesim::star_tree;
///
/// let taxa = TaxonSet::from_labels(["a", "b", "c", "d", "e"]).into_shared();
/// let tree = star_tree(taxa);
/// assert_eq!(tree.num_leaves(), 5);
/// assert_eq!(tree.seed().num_children(), 5);
/// ```
pub fn star_tree(taxon_set: SharedTaxonSet) -> Tree {
    Tree::star(taxon_set)
}

/// Generates a tree under a pure-birth process with uniform `birth_rate`.
///
/// Starting from a single seed, a random leaf splits into two children
/// until there are as many leaves as taxa. Both children get the waiting
/// time `Exp(num_leaves / birth_rate)` as edge length. Afterwards the
/// taxa are assigned to the leaves in leaf (pre)order.
///
/// # Arguments
/// * `taxon_set` - Taxa of the leaves; must not be empty
/// * `birth_rate` - Birth rate, positive and finite
/// * `ultrametricize` - Extend leaf edges so all leaves end at the same depth
/// * `rng` - Source of randomness
///
/// # Returns
/// A rooted tree.
///
/// # Errors
/// [SimulationError::EmptyTaxonSet] or [SimulationError::InvalidRate].
pub fn uniform_pure_birth<R: Rng + ?Sized>(
    taxon_set: SharedTaxonSet,
    birth_rate: f64,
    ultrametricize: bool,
    rng: &mut R,
) -> Result<Tree, SimulationError> {
    if !(birth_rate > 0.0 && birth_rate.is_finite()) {
        return Err(SimulationError::InvalidRate(birth_rate));
    }
    let taxa: Vec<Rc<Taxon>> = taxon_set.borrow().iter().cloned().collect();
    if taxa.is_empty() {
        return Err(SimulationError::EmptyTaxonSet);
    }

    let mut tree = Tree::new(taxon_set);
    let mut leaves = vec![tree.seed_index()];
    while leaves.len() < taxa.len() {
        let rate = leaves.len() as f64 / birth_rate;
        let exp = Exp::new(rate).map_err(|_| SimulationError::InvalidRate(rate))?;
        let edge_length = rng.sample(exp);

        let parent = leaves.swap_remove(rng.random_range(0..leaves.len()));
        for _ in 0..2 {
            leaves.push(tree.new_child(parent, None, Some(edge_length))?);
        }
    }

    let leaves: Vec<_> = tree.leaf_iter().map(|n| n.index()).collect();
    for (leaf, taxon) in leaves.iter().zip(taxa) {
        tree.set_taxon(*leaf, Some(taxon))?;
    }

    if ultrametricize {
        let depths: Vec<f64> = leaves.iter().map(|&l| tree.distance_from_root(l)).collect();
        let max_depth = depths.iter().copied().fold(0.0, f64::max);
        for (&leaf, depth) in leaves.iter().zip(depths) {
            let length = tree.node(leaf).edge_length().unwrap_or(0.0) + (max_depth - depth);
            if leaf != tree.seed_index() {
                tree.set_edge_length(leaf, Some(length))?;
            }
        }
    }

    tree.set_rooting(Rooting::Rooted);
    trace!(num_leaves = leaves.len(), "simulated pure-birth tree");
    Ok(tree)
}
