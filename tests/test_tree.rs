use phylio::error::TreeError;
use phylio::model::{NodeIndex, Rooting, TaxonSet, Tree};
use phylio::newick::parse_str;
use phylio::treesim::uniform_pure_birth;
use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::rc::Rc;

fn random_tree(num_taxa: usize, seed: u64) -> Tree {
    let labels: Vec<String> = (0..num_taxa).map(|i| format!("T{i}")).collect();
    let taxa = TaxonSet::from_labels(&labels).into_shared();
    uniform_pure_birth(taxa, 1.0, false, &mut StdRng::seed_from_u64(seed)).unwrap()
}

fn assert_all_close(a: &[f64], b: &[f64]) {
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(b) {
        assert!((x - y).abs() < 1e-9, "{x} != {y}");
    }
}

fn preorder_indices(tree: &Tree) -> Vec<NodeIndex> {
    tree.preorder_node_iter().map(|n| n.index()).collect()
}

// --- PROPERTY TESTS ---
proptest! {
    #[test]
    fn test_traversals_visit_every_node(num_taxa in 2..20usize, seed in any::<u64>()) {
        let tree = random_tree(num_taxa, seed);
        prop_assert!(tree.is_valid());
        prop_assert_eq!(tree.num_leaves(), num_taxa);
        prop_assert_eq!(tree.num_nodes(), 2 * num_taxa - 1);

        let pre = preorder_indices(&tree);
        let post: Vec<NodeIndex> = tree.postorder_node_iter().map(|n| n.index()).collect();
        let level: Vec<NodeIndex> = tree.level_order_node_iter().map(|n| n.index()).collect();
        prop_assert_eq!(pre.len(), tree.num_nodes());
        prop_assert_eq!(post.len(), tree.num_nodes());
        prop_assert_eq!(level.len(), tree.num_nodes());
        prop_assert_eq!(pre[0], tree.seed_index());
        prop_assert_eq!(*post.last().unwrap(), tree.seed_index());

        // Children strictly before their parent in postorder
        let mut position = vec![usize::MAX; tree.arena_len()];
        for (i, &node) in post.iter().enumerate() {
            position[node] = i;
        }
        for &node in &post {
            for &child in tree[node].children() {
                prop_assert!(position[child] < position[node]);
            }
        }

        // Depth never decreases in level order
        let depths: Vec<usize> = level.iter().map(|&n| tree.ancestor_iter(n).count()).collect();
        prop_assert!(depths.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_reroot_preserves_leaf_distances(num_taxa in 3..16usize, seed in any::<u64>(), pick in any::<usize>()) {
        let mut tree = random_tree(num_taxa, seed);
        let before = tree.pairwise_leaf_distances();
        let internal: Vec<NodeIndex> = tree
            .preorder_node_iter()
            .filter(|n| n.is_internal())
            .map(|n| n.index())
            .collect();
        let new_seed = internal[pick % internal.len()];

        tree.reroot_at_node(new_seed).unwrap();
        prop_assert_eq!(tree.seed_index(), new_seed);
        prop_assert!(tree.is_valid());
        prop_assert_eq!(tree.num_leaves(), num_taxa);
        assert_all_close(&before, &tree.pairwise_leaf_distances());
    }

    #[test]
    fn test_midpoint_rooting(num_taxa in 2..16usize, seed in any::<u64>()) {
        let mut tree = random_tree(num_taxa, seed);
        let before = tree.pairwise_leaf_distances();
        let diameter = before.last().copied().unwrap();

        tree.reroot_at_midpoint().unwrap();
        prop_assert_eq!(tree.rooting(), Rooting::Rooted);
        prop_assert!(tree.is_valid());
        assert_all_close(&before, &tree.pairwise_leaf_distances());
        prop_assert!((2.0 * tree.max_distance_from_root() - diameter).abs() < 1e-9);
    }

    #[test]
    fn test_ladderize_idempotent(num_taxa in 2..20usize, seed in any::<u64>(), right in any::<bool>()) {
        let mut tree = random_tree(num_taxa, seed);
        let length = tree.length();

        tree.ladderize(right);
        let once = preorder_indices(&tree);
        tree.ladderize(right);
        prop_assert_eq!(once, preorder_indices(&tree));
        prop_assert!((tree.length() - length).abs() < 1e-12);
        prop_assert!(tree.is_valid());
    }
}

// --- TESTS TAXA ---
#[test]
fn test_require_taxon_identity() {
    let mut taxa = TaxonSet::new();
    let a = taxa.require_taxon("Sula bassana");
    let b = taxa.require_taxon("sula_bassana");
    assert!(Rc::ptr_eq(&a, &b));
    assert_eq!(taxa.len(), 1);
    assert_eq!(a.label(), "Sula bassana");
}

#[test]
fn test_star_tree() {
    let taxa = TaxonSet::from_labels(["A", "B", "C", "D", "E"]).into_shared();
    let tree = Tree::star(taxa);
    assert_eq!(tree.num_leaves(), 5);
    assert_eq!(tree.num_internal(), 1);
    assert_eq!(tree.seed().num_children(), 5);
    assert!(!tree.has_edge_lengths());
    let labels: Vec<&str> = tree.leaf_iter().map(|n| n.taxon().unwrap().label()).collect();
    assert_eq!(labels, vec!["A", "B", "C", "D", "E"]);
}

// --- TESTS CONSTRUCTION ---
#[test]
fn test_reattach_detached_fragment() {
    let taxa = TaxonSet::from_labels(["A", "B", "C"]).into_shared();
    let (a, b) = (taxa.borrow().get_taxon("A"), taxa.borrow().get_taxon("B"));
    let mut tree = Tree::new(taxa.clone());
    let seed = tree.seed_index();
    let ab = tree.new_child(seed, None, Some(1.0)).unwrap();
    let leaf_a = tree.new_child(ab, a, Some(1.0)).unwrap();
    let leaf_b = tree.new_child(ab, b, Some(2.0)).unwrap();

    tree.remove_child(seed, ab).unwrap();
    assert!(!tree.is_attached(leaf_a));

    // A fragment cannot hang below one of its own nodes
    assert_eq!(tree.add_child(leaf_a, ab), Err(TreeError::Cycle { parent: leaf_a, child: ab }));
    assert_eq!(tree.add_child(leaf_b, ab), Err(TreeError::Cycle { parent: leaf_b, child: ab }));
    assert_eq!(tree.ancestor_iter(leaf_a).count(), 1);
    assert!(!tree.is_attached(leaf_a));

    // Its members stay attached within the fragment
    assert_eq!(tree.add_child(seed, leaf_b), Err(TreeError::AlreadyAttached(leaf_b)));

    tree.add_child(seed, ab).unwrap();
    assert!(tree.is_attached(leaf_a));
    assert!(tree.is_valid());
    assert!((tree.distance_from_root(leaf_b) - 3.0).abs() < 1e-12);
    assert_eq!(tree.add_child(seed, ab), Err(TreeError::AlreadyAttached(ab)));
}

#[test]
fn test_build_and_reject_invalid_links() {
    let taxa = TaxonSet::from_labels(["A", "B"]).into_shared();
    let a = taxa.borrow().get_taxon("A");
    let mut tree = Tree::new(taxa.clone());
    let seed = tree.seed_index();

    let leaf = tree.new_child(seed, a, Some(1.0)).unwrap();
    assert_eq!(tree.add_child(leaf, seed), Err(TreeError::Cycle { parent: leaf, child: seed }));
    assert_eq!(tree.add_child(seed, leaf), Err(TreeError::AlreadyAttached(leaf)));
    assert!(matches!(
        tree.new_child(seed, None, Some(-1.0)),
        Err(TreeError::InvalidEdgeLength(_))
    ));

    let foreign = TaxonSet::from_labels(["B"]).into_shared().borrow().get_taxon("B");
    assert_eq!(tree.set_taxon(leaf, foreign), Err(TreeError::ForeignTaxonSet));

    let other = tree.new_node();
    tree.add_child(seed, other).unwrap();
    tree.remove_child(seed, other).unwrap();
    assert!(!tree.is_attached(other));
    assert_eq!(tree.num_nodes(), 2);
    assert_eq!(
        tree.remove_child(seed, other),
        Err(TreeError::NotAChild { parent: seed, child: other })
    );
}

#[test]
fn test_distances_and_mrca() {
    let tree = parse_str("((A:1,B:2):3,(C:4,D:5):6);").unwrap();
    let leaf = |label: &str| {
        tree.leaf_iter()
            .find(|n| n.taxon().unwrap().label() == label)
            .unwrap()
            .index()
    };
    let (a, b, c) = (leaf("A"), leaf("B"), leaf("C"));

    assert_eq!(tree.mrca(a, b).unwrap(), tree[a].parent().unwrap());
    assert_eq!(tree.mrca(a, c).unwrap(), tree.seed_index());
    assert!((tree.path_length(a, c).unwrap() - 14.0).abs() < 1e-12);
    assert!((tree.distance_from_tip(tree.seed_index()) - 11.0).abs() < 1e-12);
    assert!((tree.max_distance_from_root() - 11.0).abs() < 1e-12);
    assert!(!tree.is_ultrametric());
    assert_eq!(tree.pairwise_leaf_distances().len(), 6);
}

#[test]
fn test_reroot_at_edge_and_suppress() {
    let mut tree = parse_str("((A:1,B:2):3,(C:4,D:5):6);").unwrap();
    let before = tree.pairwise_leaf_distances();
    let c = tree
        .leaf_iter()
        .find(|n| n.taxon().unwrap().label() == "C")
        .unwrap()
        .index();

    assert_eq!(tree.reroot_at_node(c), Err(TreeError::RerootAtLeaf(c)));

    let new_seed = tree.reroot_at_edge(c, 1.5).unwrap();
    assert_eq!(tree.seed_index(), new_seed);
    assert_eq!(tree.seed().num_children(), 2);
    assert!(tree.is_valid());
    assert_all_close(&before, &tree.pairwise_leaf_distances());

    // Splitting an edge creates a unifurcation that can be suppressed again
    let d = tree
        .leaf_iter()
        .find(|n| n.taxon().unwrap().label() == "D")
        .unwrap()
        .index();
    tree.split_edge(d, 2.0).unwrap();
    assert_eq!(tree.suppress_unifurcations(), 1);
    assert_all_close(&before, &tree.pairwise_leaf_distances());
}
