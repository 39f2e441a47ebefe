//! Data model for phylogenetic trees, taxa and character data.
//!
//! A [Tree] is an arena of [Node]s connected by [Edge]s, rooted at a seed
//! node. Taxa live in a [TaxonSet] shared between all trees and matrices
//! read from the same source.

pub mod annotation;
pub mod char_matrix;
pub mod node;
mod restructure;
pub mod splits;
pub mod taxon;
pub mod traversal;
pub mod tree;
pub mod tree_list;

pub use annotation::{AnnotationValue, Annotations};
pub use char_matrix::{CharacterMatrix, DataType};
pub use node::{Edge, EdgeLength, Node, NodeIndex};
pub use splits::Split;
pub use taxon::{SharedTaxonSet, Taxon, TaxonSet};
pub use traversal::cmp_with_tolerance;
pub use tree::{Rooting, Tree};
pub use tree_list::{DataSet, TreeList};
