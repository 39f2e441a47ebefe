//! Kingman coalescent primitives acting on lineages of a tree arena.

use crate::error::SimulationError;
use crate::model::{NodeIndex, Tree};
use rand::Rng;
use rand_distr::Exp;

/// Draws the waiting time until the next coalescence among `num_lineages`
/// lineages in a population of size `pop_size`.
///
/// The time is exponentially distributed with rate `n(n-1)/2`, scaled by
/// `pop_size`. With fewer than two lineages nothing can coalesce and the
/// waiting time is infinite.
///
/// # Errors
/// [SimulationError::InvalidPopSize] if `pop_size` is not positive and finite.
pub fn time_to_coalescence<R: Rng + ?Sized>(
    num_lineages: usize,
    pop_size: f64,
    rng: &mut R,
) -> Result<f64, SimulationError> {
    check_pop_size(pop_size)?;
    if num_lineages < 2 {
        return Ok(f64::INFINITY);
    }
    let n = num_lineages as f64;
    let rate = n * (n - 1.0) / 2.0;
    let exp = Exp::new(rate).map_err(|_| SimulationError::InvalidRate(rate))?;
    Ok(rng.sample(exp) * pop_size)
}

/// Runs the coalescent on `lineages`, which must be detached nodes of `tree`.
///
/// Each coalescence joins two randomly picked lineages below a new node,
/// whose edge starts at length 0. All waiting times are added to the edges
/// of the lineages alive at that time.
///
/// # Arguments
/// * `tree` - Arena the lineages live in; new ancestors are created here
/// * `lineages` - Detached nodes to coalesce
/// * `pop_size` - Population size scaling the waiting times
/// * `period` - Time span available; `None` coalesces down to one lineage
/// * `rng` - Source of randomness
///
/// # Returns
/// The lineages left uncoalesced. When a period is given, their edges are
/// extended so that every lineage spans the whole period.
///
/// # Errors
/// [SimulationError::InvalidPopSize] if `pop_size` is not positive and finite.
pub fn coalesce<R: Rng + ?Sized>(
    tree: &mut Tree,
    lineages: Vec<NodeIndex>,
    pop_size: f64,
    period: Option<f64>,
    rng: &mut R,
) -> Result<Vec<NodeIndex>, SimulationError> {
    check_pop_size(pop_size)?;
    let mut lineages = lineages;
    let mut elapsed = 0.0;

    while lineages.len() > 1 {
        let waiting = time_to_coalescence(lineages.len(), pop_size, rng)?;
        if let Some(period) = period {
            if elapsed + waiting > period {
                break;
            }
        }
        elapsed += waiting;
        for &lineage in &lineages {
            extend_edge(tree, lineage, waiting)?;
        }

        let first = lineages.swap_remove(rng.random_range(0..lineages.len()));
        let second = lineages.swap_remove(rng.random_range(0..lineages.len()));
        let ancestor = tree.new_node();
        tree.set_edge_length(ancestor, Some(0.0))?;
        tree.add_child(ancestor, first)?;
        tree.add_child(ancestor, second)?;
        lineages.push(ancestor);
    }

    if let Some(period) = period {
        let remaining = period - elapsed;
        if remaining > 0.0 {
            for &lineage in &lineages {
                extend_edge(tree, lineage, remaining)?;
            }
        }
    }
    Ok(lineages)
}

fn extend_edge(tree: &mut Tree, node: NodeIndex, by: f64) -> Result<(), SimulationError> {
    let length = tree.node(node).edge_length().unwrap_or(0.0) + by;
    tree.set_edge_length(node, Some(length))?;
    Ok(())
}

pub(crate) fn check_pop_size(pop_size: f64) -> Result<(), SimulationError> {
    if pop_size > 0.0 && pop_size.is_finite() {
        Ok(())
    } else {
        Err(SimulationError::InvalidPopSize(pop_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TaxonSet;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn detached_leaves(tree: &mut Tree, n: usize) -> Vec<NodeIndex> {
        (0..n)
            .map(|_| {
                let node = tree.new_node();
                tree.set_edge_length(node, Some(0.0)).unwrap();
                node
            })
            .collect()
    }

    #[test]
    fn test_unbounded_coalescence_leaves_one_lineage() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut tree = Tree::new(TaxonSet::new_shared());
        let leaves = detached_leaves(&mut tree, 6);

        let remaining = coalesce(&mut tree, leaves.clone(), 1.0, None, &mut rng).unwrap();
        assert_eq!(remaining.len(), 1);

        tree.set_seed(remaining[0]).unwrap();
        assert_eq!(tree.num_leaves(), 6);
        assert_eq!(tree.num_nodes(), 11);
        assert!(tree.is_valid());
        assert!(tree.is_ultrametric());
    }

    #[test]
    fn test_bounded_coalescence_spans_period() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut tree = Tree::new(TaxonSet::new_shared());
        let leaves = detached_leaves(&mut tree, 20);

        let period = 0.01;
        let remaining = coalesce(&mut tree, leaves, 1.0, Some(period), &mut rng).unwrap();
        assert!(remaining.len() > 1);
        for &lineage in &remaining {
            let depth = tree.distance_from_tip(lineage) + tree.node(lineage).edge_length().unwrap();
            assert!((depth - period).abs() < 1e-9);
        }
    }

    #[test]
    fn test_invalid_pop_size() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            time_to_coalescence(3, 0.0, &mut rng),
            Err(SimulationError::InvalidPopSize(0.0))
        );
        assert_eq!(time_to_coalescence(1, 1.0, &mut rng), Ok(f64::INFINITY));
    }
}
