//! Tree simulation and generation.
//!
//! This module provides:
//! - [star_tree] - one leaf per taxon below the seed
//! - [uniform_pure_birth] - Yule trees with a uniform birth rate
//! - [pop_gen_tree] - population trees decorated with divergence ages,
//!   gene sample counts and population sizes
//! - [pure_kingman] / [constrained_kingman] - gene trees under Kingman's
//!   coalescent, free or within a population tree
//! - [coalescent] - the underlying coalescence primitives
//!
//! All randomized functions take the random number generator as argument,
//! so runs are reproducible with a seeded generator.
//!
//! # Example
//! ```
//! use phylio::model::TaxonSet;
//! use phylio::treesim::uniform_pure_birth;
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//!
//! let taxa = TaxonSet::from_labels(["A", "B", "C", "D"]).into_shared();
//! let tree = uniform_pure_birth(taxa, 1.0, true, &mut StdRng::seed_from_u64(42)).unwrap();
//! assert_eq!(tree.num_leaves(), 4);
//! assert!(tree.is_ultrametric());
//! ```

pub mod coalescent;
mod kingman;
mod popgen;
mod pure_birth;

pub use self::coalescent::{coalesce, time_to_coalescence};
pub use self::kingman::{
    ConstrainedKingman, ConstrainedKingmanConfig, GENE_NODES_ATTR, constrained_kingman,
    default_gene_label, pure_kingman,
};
pub use self::popgen::{
    NUM_GENES_ATTR, NumGenes, POP_SIZE_ATTR, PopGenConfig, PopTreeSource, pop_gen_tree,
};
pub use self::pure_birth::{star_tree, uniform_pure_birth};
