//! Collections of trees and whole data sets.

use crate::error::TreeError;
use crate::model::char_matrix::CharacterMatrix;
use crate::model::taxon::SharedTaxonSet;
use crate::model::tree::Tree;
use std::ops::Index;
use std::rc::Rc;

// =#========================================================================#=
// TREE LIST
// =#========================================================================#=
/// Ordered list of trees over one shared taxon set.
#[derive(Debug, Clone)]
pub struct TreeList {
    taxon_set: SharedTaxonSet,
    trees: Vec<Tree>,
    label: Option<String>,
}

impl TreeList {
    /// Creates an empty tree list over `taxon_set`.
    pub fn new(taxon_set: SharedTaxonSet) -> Self {
        Self {
            taxon_set,
            trees: Vec::new(),
            label: None,
        }
    }

    /// Attaches a label to this tree list.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Label of this tree list, if any.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// The taxon set shared by all trees of this list.
    pub fn taxon_set(&self) -> &SharedTaxonSet {
        &self.taxon_set
    }

    /// Appends a tree.
    ///
    /// # Errors
    /// [TreeError::ForeignTaxonSet] if the tree references a different taxon set.
    pub fn push(&mut self, tree: Tree) -> Result<(), TreeError> {
        if !Rc::ptr_eq(tree.taxon_set(), &self.taxon_set) {
            return Err(TreeError::ForeignTaxonSet);
        }
        self.trees.push(tree);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Tree> {
        self.trees.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tree> {
        self.trees.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Tree> {
        self.trees.iter_mut()
    }

    /// Consumes the list, returning its trees.
    pub fn into_trees(self) -> Vec<Tree> {
        self.trees
    }
}

impl Index<usize> for TreeList {
    type Output = Tree;

    fn index(&self, index: usize) -> &Self::Output {
        &self.trees[index]
    }
}

impl<'a> IntoIterator for &'a TreeList {
    type Item = &'a Tree;
    type IntoIter = std::slice::Iter<'a, Tree>;

    fn into_iter(self) -> Self::IntoIter {
        self.trees.iter()
    }
}

// =#========================================================================#=
// DATA SET
// =#========================================================================#=
/// Everything read from one source: taxon sets, tree lists and character
/// matrices, each in order of appearance.
#[derive(Debug, Clone, Default)]
pub struct DataSet {
    pub taxon_sets: Vec<SharedTaxonSet>,
    pub tree_lists: Vec<TreeList>,
    pub char_matrices: Vec<CharacterMatrix>,
}

impl DataSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a data set holding a single tree list and its taxon set.
    pub fn from_tree_list(tree_list: TreeList) -> Self {
        Self {
            taxon_sets: vec![Rc::clone(tree_list.taxon_set())],
            tree_lists: vec![tree_list],
            char_matrices: Vec::new(),
        }
    }

    /// Registers `taxon_set` unless it is already part of this data set.
    pub fn add_taxon_set(&mut self, taxon_set: &SharedTaxonSet) {
        if !self.taxon_sets.iter().any(|t| Rc::ptr_eq(t, taxon_set)) {
            self.taxon_sets.push(Rc::clone(taxon_set));
        }
    }

    /// Iterates all trees of all tree lists in order.
    pub fn trees(&self) -> impl Iterator<Item = &Tree> + '_ {
        self.tree_lists.iter().flat_map(|l| l.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TaxonSet;

    #[test]
    fn test_push_rejects_foreign_trees() {
        let taxa = TaxonSet::from_labels(["A", "B"]).into_shared();
        let mut list = TreeList::new(taxa.clone());
        list.push(Tree::star(taxa.clone())).unwrap();
        let foreign = Tree::star(TaxonSet::from_labels(["A", "B"]).into_shared());
        assert_eq!(list.push(foreign), Err(TreeError::ForeignTaxonSet));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_data_set_dedups_taxon_sets() {
        let taxa = TaxonSet::new_shared();
        let mut data = DataSet::from_tree_list(TreeList::new(taxa.clone()));
        data.add_taxon_set(&taxa);
        assert_eq!(data.taxon_sets.len(), 1);
    }
}
