//! Population trees decorated with divergence ages, gene sample counts and
//! population sizes.

use crate::error::SimulationError;
use crate::model::{NodeIndex, SharedTaxonSet, Tree, cmp_with_tolerance};
use crate::treesim::uniform_pure_birth;
use rand::Rng;
use std::cmp::Ordering;

/// Default annotation key of the per-leaf gene sample count.
pub const NUM_GENES_ATTR: &str = "num_genes";

/// Default annotation key of the per-edge population size.
pub const POP_SIZE_ATTR: &str = "pop_size";

/// Distances from the root closer than this are treated as equal when
/// ordering divergences.
const AGE_ORDER_TOLERANCE: f64 = 1e-7;

/// Tree to decorate, or the taxa of a pure-birth tree to generate first.
#[derive(Debug, Clone)]
pub enum PopTreeSource {
    Tree(Tree),
    TaxonSet(SharedTaxonSet),
}

/// Number of genes sampled per population.
#[derive(Debug, Clone, PartialEq)]
pub enum NumGenes {
    /// Same count for every population.
    Uniform(u32),
    /// One count per population (leaf), in leaf order.
    PerPopulation(Vec<u32>),
}

// =#========================================================================#=
// POP GEN CONFIG
// =#========================================================================#=
/// Parameters of [pop_gen_tree].
///
/// # Example
/// ```
/// use phylio::model::TaxonSet;
/// use phylio::treesim::{NumGenes, PopGenConfig, pop_gen_tree};
/// use rand::SeedableRng;
/// use rand::rngs::StdRng;
///
/// let taxa = TaxonSet::from_labels(["A", "B", "C"]).into_shared();
/// let config = PopGenConfig::from_taxon_set(taxa)
///     .with_ages(vec![1.0, 2.0])
///     .with_num_genes(NumGenes::Uniform(4));
/// let tree = pop_gen_tree(config, &mut StdRng::seed_from_u64(1)).unwrap();
/// assert!((tree.max_distance_from_root() - 2.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone)]
pub struct PopGenConfig {
    source: PopTreeSource,
    ages: Option<Vec<f64>>,
    num_genes: Option<NumGenes>,
    pop_sizes: Option<Vec<f64>>,
    num_genes_attr: String,
    pop_size_attr: String,
}

impl PopGenConfig {
    /// Decorates the given tree.
    pub fn from_tree(tree: Tree) -> Self {
        Self::new(PopTreeSource::Tree(tree))
    }

    /// Generates a pure-birth tree (birth rate 1) over `taxon_set` first.
    pub fn from_taxon_set(taxon_set: SharedTaxonSet) -> Self {
        Self::new(PopTreeSource::TaxonSet(taxon_set))
    }

    fn new(source: PopTreeSource) -> Self {
        Self {
            source,
            ages: None,
            num_genes: None,
            pop_sizes: None,
            num_genes_attr: NUM_GENES_ATTR.to_string(),
            pop_size_attr: POP_SIZE_ATTR.to_string(),
        }
    }

    /// Ages of the first, second, ... divergence, as time before present.
    /// Needs at least `num_pops - 1` values.
    pub fn with_ages(mut self, ages: Vec<f64>) -> Self {
        self.ages = Some(ages);
        self
    }

    pub fn with_num_genes(mut self, num_genes: NumGenes) -> Self {
        self.num_genes = Some(num_genes);
        self
    }

    /// Population sizes of the edges in postorder (seed edge last).
    /// Needs at least `2 * num_pops + 1` values.
    pub fn with_pop_sizes(mut self, pop_sizes: Vec<f64>) -> Self {
        self.pop_sizes = Some(pop_sizes);
        self
    }

    pub fn with_num_genes_attr(mut self, key: impl Into<String>) -> Self {
        self.num_genes_attr = key.into();
        self
    }

    pub fn with_pop_size_attr(mut self, key: impl Into<String>) -> Self {
        self.pop_size_attr = key.into();
        self
    }
}

/// Builds a population tree whose leaves carry gene sample counts and whose
/// edges carry population sizes.
///
/// Steps, each only if its parameter is set:
/// 1. Ages: internal nodes ordered from the most recent divergence (largest
///    distance from the root, ties by node index) get `ages[0]`, `ages[1]`,
///    ...; the edges to their children are set so that the divergence lies
///    at that age before the present.
/// 2. Gene counts: every leaf gets a `num_genes` annotation.
/// 3. Population sizes: every edge, in postorder, gets a `pop_size`
///    annotation. Without ages, edge lengths are multiplied by it, turning
///    population units into generations.
///
/// # Errors
/// * [SimulationError::TooFewAges], [SimulationError::TooFewNumGenes] or
///   [SimulationError::TooFewPopSizes] if a vector is too short
/// * [SimulationError::Tree] if an age results in a negative edge length
pub fn pop_gen_tree<R: Rng + ?Sized>(
    config: PopGenConfig,
    rng: &mut R,
) -> Result<Tree, SimulationError> {
    let PopGenConfig {
        source,
        ages,
        num_genes,
        pop_sizes,
        num_genes_attr,
        pop_size_attr,
    } = config;

    let mut tree = match source {
        PopTreeSource::Tree(tree) => tree,
        PopTreeSource::TaxonSet(taxon_set) => uniform_pure_birth(taxon_set, 1.0, true, rng)?,
    };
    let num_pops = tree.num_leaves();

    if let Some(ages) = &ages {
        let required = num_pops.saturating_sub(1);
        if ages.len() < required {
            return Err(SimulationError::TooFewAges { required, found: ages.len() });
        }
    }
    let samples = match num_genes {
        None => None,
        Some(NumGenes::Uniform(n)) => Some(vec![n; num_pops]),
        Some(NumGenes::PerPopulation(counts)) => {
            if counts.len() < num_pops {
                return Err(SimulationError::TooFewNumGenes {
                    required: num_pops,
                    found: counts.len(),
                });
            }
            Some(counts)
        }
    };
    if let Some(pop_sizes) = &pop_sizes {
        let required = 2 * num_pops + 1;
        if pop_sizes.len() < required {
            return Err(SimulationError::TooFewPopSizes { required, found: pop_sizes.len() });
        }
    }

    if let Some(ages) = &ages {
        assign_ages(&mut tree, ages)?;
    }

    if let Some(samples) = samples {
        let leaves: Vec<NodeIndex> = tree.leaf_iter().map(|n| n.index()).collect();
        for (leaf, count) in leaves.into_iter().zip(samples) {
            tree.node_annotations_mut(leaf)
                .set(num_genes_attr.as_str(), i64::from(count));
        }
    }

    if let Some(pop_sizes) = pop_sizes {
        let edges: Vec<NodeIndex> = tree.postorder_edge_iter().map(|e| e.head()).collect();
        for (head, pop_size) in edges.into_iter().zip(pop_sizes) {
            tree.edge_annotations_mut(head).set(pop_size_attr.as_str(), pop_size);
            if ages.is_none() {
                if let Some(length) = tree.node(head).edge_length() {
                    tree.set_edge_length(head, Some(length * pop_size))?;
                }
            }
        }
    }

    Ok(tree)
}

fn assign_ages(tree: &mut Tree, ages: &[f64]) -> Result<(), SimulationError> {
    let mut internal: Vec<(NodeIndex, f64)> = tree
        .preorder_node_iter()
        .filter(|n| n.is_internal())
        .map(|n| (n.index(), tree.distance_from_root(n.index())))
        .collect();
    internal.sort_by(|(a, da), (b, db)| match cmp_with_tolerance(*db, *da, AGE_ORDER_TOLERANCE) {
        Ordering::Equal => a.cmp(b),
        ord => ord,
    });

    for ((node, _), &age) in internal.iter().zip(ages) {
        let children = tree.node(*node).children().to_vec();
        for child in children {
            let length = age - tree.distance_from_tip(child);
            tree.set_edge_length(child, Some(length))?;
        }
    }
    Ok(())
}
