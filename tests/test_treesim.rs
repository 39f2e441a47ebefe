use phylio::dataio::FormatOptions;
use phylio::error::SimulationError;
use phylio::model::{TaxonSet, Tree, TreeList};
use phylio::newick::{self, NewickStyle, to_newick};
use phylio::treesim::{
    ConstrainedKingmanConfig, GENE_NODES_ATTR, NumGenes, PopGenConfig, constrained_kingman,
    pop_gen_tree, pure_kingman, star_tree, uniform_pure_birth,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn sorted_leaf_labels(tree: &Tree) -> Vec<String> {
    let mut labels: Vec<String> = tree
        .leaf_iter()
        .map(|n| n.taxon().unwrap().label().to_string())
        .collect();
    labels.sort();
    labels
}

// --- TESTS GENERATORS ---
#[test]
fn test_same_seed_same_tree() {
    let taxa = TaxonSet::from_labels(["A", "B", "C", "D", "E", "F", "G"]).into_shared();
    let style = NewickStyle::default();

    let a = uniform_pure_birth(taxa.clone(), 0.5, true, &mut StdRng::seed_from_u64(77)).unwrap();
    let b = uniform_pure_birth(taxa.clone(), 0.5, true, &mut StdRng::seed_from_u64(77)).unwrap();
    assert_eq!(to_newick(&a, &style), to_newick(&b, &style));

    let a = pure_kingman(taxa.clone(), 3.0, &mut StdRng::seed_from_u64(78)).unwrap();
    let b = pure_kingman(taxa, 3.0, &mut StdRng::seed_from_u64(78)).unwrap();
    assert_eq!(to_newick(&a, &style), to_newick(&b, &style));
}

#[test]
fn test_generated_trees_cover_all_taxa() {
    let labels = ["Alle alle", "Uria lomvia", "Cepphus grylle", "Alca torda", "Synthliboramphus antiquus"];
    let taxa = TaxonSet::from_labels(labels).into_shared();
    let mut expected: Vec<String> = labels.iter().map(|l| l.to_string()).collect();
    expected.sort();

    let mut rng = StdRng::seed_from_u64(3);
    let star = star_tree(taxa.clone());
    let yule = uniform_pure_birth(taxa.clone(), 1.0, false, &mut rng).unwrap();
    let kingman = pure_kingman(taxa.clone(), 1.0, &mut rng).unwrap();

    for tree in [&star, &yule, &kingman] {
        assert!(tree.is_valid());
        assert_eq!(sorted_leaf_labels(tree), expected);
        assert!(std::rc::Rc::ptr_eq(tree.taxon_set(), &taxa));
    }
    assert_eq!(yule.num_nodes(), 9);
    assert_eq!(kingman.num_nodes(), 9);
    assert!(yule.is_rooted());
    assert!(kingman.is_ultrametric());
}

#[test]
fn test_invalid_parameters() {
    let taxa = TaxonSet::from_labels(["A", "B"]).into_shared();
    let mut rng = StdRng::seed_from_u64(0);

    assert_eq!(
        pure_kingman(taxa.clone(), 0.0, &mut rng).unwrap_err(),
        SimulationError::InvalidPopSize(0.0)
    );
    assert_eq!(
        uniform_pure_birth(taxa, -1.0, true, &mut rng).unwrap_err(),
        SimulationError::InvalidRate(-1.0)
    );
    assert_eq!(
        pure_kingman(TaxonSet::new_shared(), 1.0, &mut rng).unwrap_err(),
        SimulationError::EmptyTaxonSet
    );
}

// --- TESTS POPULATION PIPELINE ---
#[test]
fn test_population_to_gene_tree_pipeline() {
    let pops = TaxonSet::from_labels(["North", "South", "East", "West"]).into_shared();
    let mut rng = StdRng::seed_from_u64(2024);

    let config = PopGenConfig::from_taxon_set(pops)
        .with_ages(vec![0.5, 1.0, 1.5])
        .with_num_genes(NumGenes::PerPopulation(vec![3, 1, 2, 4]))
        .with_pop_sizes(vec![2.0; 9]);
    let mut pop_tree = pop_gen_tree(config, &mut rng).unwrap();
    assert!(pop_tree.is_ultrametric());
    assert!((pop_tree.max_distance_from_root() - 1.5).abs() < 1e-9);

    let gene_taxa = TaxonSet::new_shared();
    let config = ConstrainedKingmanConfig::new().with_gene_taxon_set(gene_taxa.clone());
    let result = constrained_kingman(&mut pop_tree, &config, &mut rng).unwrap();
    let gene_tree = result.gene_tree;

    assert!(gene_tree.is_valid());
    assert!(gene_tree.is_rooted());
    assert!(gene_tree.is_ultrametric());
    assert_eq!(gene_tree.num_leaves(), 10);
    assert_eq!(gene_taxa.borrow().len(), 10);
    assert!(gene_tree.max_distance_from_root() >= 1.5 - 1e-9);

    // Every population leaf records exactly its sampled genes
    for leaf in result.pop_tree.leaf_iter() {
        let genes = leaf.annotations().get("num_genes").unwrap().as_i64().unwrap();
        let recorded = leaf.annotations().get(GENE_NODES_ATTR).unwrap().as_i64().unwrap();
        assert_eq!(genes, recorded);
        assert_eq!(result.gene_nodes[leaf.index()].len() as i64, genes);
    }

    // The gene tree survives a trip through the Newick format
    let mut trees = TreeList::new(gene_taxa.clone());
    trees.push(gene_tree).unwrap();
    let mut buffer = Vec::new();
    newick::write_tree_list(&mut buffer, &trees, &NewickStyle::default()).unwrap();
    let reread = newick::read_trees(&mut buffer.as_slice(), gene_taxa, &FormatOptions::default()).unwrap();

    assert_eq!(sorted_leaf_labels(&reread[0]), sorted_leaf_labels(&trees[0]));
    assert!(sorted_leaf_labels(&reread[0]).contains(&"North_03".to_string()));
    assert_eq!(reread[0].symmetric_difference(&trees[0]).unwrap(), 0);
}
