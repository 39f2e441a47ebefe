//! Gene trees under Kingman's coalescent, free or constrained by a
//! population tree.

use crate::error::SimulationError;
use crate::model::{NodeIndex, Rooting, SharedTaxonSet, TaxonSet, Tree};
use crate::treesim::coalescent::{check_pop_size, coalesce};
use crate::treesim::popgen::{NUM_GENES_ATTR, POP_SIZE_ATTR};
use rand::Rng;
use tracing::{debug, trace};

/// Annotation key of the number of uncoalesced gene lineages recorded on
/// each population tree node.
pub const GENE_NODES_ATTR: &str = "gene_nodes";

/// Generates a gene tree under the unconstrained Kingman coalescent, one
/// leaf per taxon of `taxon_set`.
///
/// # Errors
/// [SimulationError::EmptyTaxonSet] or [SimulationError::InvalidPopSize].
pub fn pure_kingman<R: Rng + ?Sized>(
    taxon_set: SharedTaxonSet,
    pop_size: f64,
    rng: &mut R,
) -> Result<Tree, SimulationError> {
    check_pop_size(pop_size)?;
    let taxa: Vec<_> = taxon_set.borrow().iter().cloned().collect();
    if taxa.is_empty() {
        return Err(SimulationError::EmptyTaxonSet);
    }

    let mut tree = Tree::new(taxon_set);
    let mut lineages = Vec::with_capacity(taxa.len());
    for taxon in taxa {
        let leaf = tree.new_node();
        tree.set_taxon(leaf, Some(taxon))?;
        tree.set_edge_length(leaf, Some(0.0))?;
        lineages.push(leaf);
    }

    let root = coalesce(&mut tree, lineages, pop_size, None, rng)?;
    set_coalesced_root(&mut tree, &root)?;
    Ok(tree)
}

/// Label of a sampled gene: population label and 1-based gene number.
pub fn default_gene_label(population: &str, gene: usize) -> String {
    format!("{population}_{gene:02}")
}

// =#========================================================================#=
// CONSTRAINED KINGMAN
// =#========================================================================#=
/// Parameters of [constrained_kingman].
#[derive(Debug, Clone)]
pub struct ConstrainedKingmanConfig {
    gene_taxon_set: Option<SharedTaxonSet>,
    gene_label: fn(&str, usize) -> String,
    num_genes_attr: String,
    pop_size_attr: String,
    decorate_original_tree: bool,
}

impl Default for ConstrainedKingmanConfig {
    fn default() -> Self {
        Self {
            gene_taxon_set: None,
            gene_label: default_gene_label,
            num_genes_attr: NUM_GENES_ATTR.to_string(),
            pop_size_attr: POP_SIZE_ATTR.to_string(),
            decorate_original_tree: false,
        }
    }
}

impl ConstrainedKingmanConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Taxon set receiving the gene taxa (fresh set by default).
    pub fn with_gene_taxon_set(mut self, taxon_set: SharedTaxonSet) -> Self {
        self.gene_taxon_set = Some(taxon_set);
        self
    }

    /// Labels genes from the population label and the 1-based gene number.
    pub fn with_gene_label(mut self, gene_label: fn(&str, usize) -> String) -> Self {
        self.gene_label = gene_label;
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

    /// Records the gene lineages on the given population tree itself
    /// instead of on a copy.
    pub fn with_decorate_original_tree(mut self, decorate: bool) -> Self {
        self.decorate_original_tree = decorate;
        self
    }
}

/// Result of [constrained_kingman].
#[derive(Debug, Clone)]
pub struct ConstrainedKingman {
    /// Simulated, rooted gene tree.
    pub gene_tree: Tree,
    /// Population tree with a `gene_nodes` annotation on every node.
    pub pop_tree: Tree,
    /// Gene tree nodes entering each population node (from its children,
    /// or the sampled genes for leaves), indexed by population node index.
    pub gene_nodes: Vec<Vec<NodeIndex>>,
}

/// Simulates a gene tree within the population tree `pop_tree`.
///
/// Every population leaf needs a `num_genes` annotation; for each, that
/// many gene leaves labelled by [default_gene_label] (or the configured
/// function) are created. Edges are visited in postorder: the lineages
/// entering an edge coalesce for the duration of its length, scaled by its
/// `pop_size` annotation (1 if absent), and the remaining lineages pass on
/// to the parent population. At the seed, coalescence is unconstrained.
///
/// The population tree is copied unless
/// [ConstrainedKingmanConfig::with_decorate_original_tree] is set, in which
/// case `pop_tree` itself receives the `gene_nodes` annotations as well.
///
/// # Errors
/// * [SimulationError::MissingAnnotation] if a leaf lacks `num_genes`
/// * [SimulationError::InvalidPopSize] if a `pop_size` is not positive
/// * [SimulationError::EmptyTaxonSet] if no gene was sampled at all
pub fn constrained_kingman<R: Rng + ?Sized>(
    pop_tree: &mut Tree,
    config: &ConstrainedKingmanConfig,
    rng: &mut R,
) -> Result<ConstrainedKingman, SimulationError> {
    let gene_taxa = config
        .gene_taxon_set
        .clone()
        .unwrap_or_else(TaxonSet::new_shared);
    let mut gene_tree = Tree::new(gene_taxa.clone());
    let mut gene_nodes: Vec<Vec<NodeIndex>> = vec![Vec::new(); pop_tree.arena_len()];

    let leaves: Vec<NodeIndex> = pop_tree.leaf_iter().map(|n| n.index()).collect();
    for leaf in leaves {
        let node = pop_tree.node(leaf);
        let count = node
            .annotations()
            .get(&config.num_genes_attr)
            .and_then(|v| v.as_i64())
            .ok_or_else(|| SimulationError::MissingAnnotation(leaf, config.num_genes_attr.clone()))?;
        let population = match (node.taxon(), node.label()) {
            (Some(taxon), _) => taxon.label().to_string(),
            (None, Some(label)) => label.to_string(),
            (None, None) => leaf.to_string(),
        };
        for gene in 1..=count.max(0) as usize {
            let taxon = gene_taxa
                .borrow_mut()
                .require_taxon(&(config.gene_label)(&population, gene));
            let gene_node = gene_tree.new_node();
            gene_tree.set_taxon(gene_node, Some(taxon))?;
            gene_tree.set_edge_length(gene_node, Some(0.0))?;
            gene_nodes[leaf].push(gene_node);
        }
    }

    let seed = pop_tree.seed_index();
    let edges: Vec<(NodeIndex, Option<NodeIndex>, Option<f64>, f64)> = pop_tree
        .postorder_edge_iter()
        .map(|e| {
            let pop_size = e
                .annotations()
                .get(&config.pop_size_attr)
                .and_then(|v| v.as_f64())
                .unwrap_or(1.0);
            (e.head(), e.tail(), e.length(), pop_size)
        })
        .collect();

    let mut root_lineages = Vec::new();
    for (head, tail, length, pop_size) in edges {
        let entering = gene_nodes[head].clone();
        if head == seed {
            root_lineages = coalesce(&mut gene_tree, entering, pop_size, None, rng)?;
        } else {
            let uncoalesced = coalesce(&mut gene_tree, entering, pop_size, length, rng)?;
            if let Some(tail) = tail {
                gene_nodes[tail].extend(uncoalesced);
            }
        }
    }
    if root_lineages.is_empty() {
        return Err(SimulationError::EmptyTaxonSet);
    }
    set_coalesced_root(&mut gene_tree, &root_lineages)?;

    let working = if config.decorate_original_tree {
        decorate(pop_tree, &gene_nodes);
        pop_tree.clone()
    } else {
        let mut working = pop_tree.clone();
        decorate(&mut working, &gene_nodes);
        working
    };

    debug!(
        num_genes = gene_tree.num_leaves(),
        num_pops = working.num_leaves(),
        "simulated constrained gene tree"
    );
    Ok(ConstrainedKingman {
        gene_tree,
        pop_tree: working,
        gene_nodes,
    })
}

fn decorate(pop_tree: &mut Tree, gene_nodes: &[Vec<NodeIndex>]) {
    let nodes: Vec<NodeIndex> = pop_tree.preorder_node_iter().map(|n| n.index()).collect();
    for node in nodes {
        pop_tree
            .node_annotations_mut(node)
            .set(GENE_NODES_ATTR, gene_nodes[node].len());
    }
}

fn set_coalesced_root(tree: &mut Tree, lineages: &[NodeIndex]) -> Result<(), SimulationError> {
    if let [root] = lineages {
        tree.set_seed(*root)?;
        tree.set_edge_length(*root, None)?;
        tree.set_rooting(Rooting::Rooted);
        trace!(num_leaves = tree.num_leaves(), "coalesced to a single root");
    }
    Ok(())
}
