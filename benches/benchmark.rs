use criterion::{Criterion, criterion_group, criterion_main};
use phylio::dataio::{FormatOptions, FormatRegistry};
use phylio::model::{TaxonSet, TreeList};
use phylio::newick::{self, NewickStyle};
use phylio::treesim::{
    ConstrainedKingmanConfig, NumGenes, PopGenConfig, constrained_kingman, pop_gen_tree,
    pure_kingman, uniform_pure_birth,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

const FIXTURE_FILES: &[(&str, &str, &str)] = &[
    ("alcids", "newick", "tests/fixtures/alcids.nwk"),
    ("penguins", "nexus", "tests/fixtures/penguins.nex"),
];

/// Newick source of `num_trees` Yule trees over `num_taxa` taxa.
fn simulated_newick(num_taxa: usize, num_trees: usize) -> String {
    let labels: Vec<String> = (1..=num_taxa).map(|i| format!("taxon{i}")).collect();
    let taxa = TaxonSet::from_labels(&labels).into_shared();
    let mut rng = StdRng::seed_from_u64(42);
    let mut trees = TreeList::new(taxa.clone());
    for _ in 0..num_trees {
        trees
            .push(uniform_pure_birth(taxa.clone(), 1.0, true, &mut rng).unwrap())
            .unwrap();
    }
    let mut out = Vec::new();
    newick::write_tree_list(&mut out, &trees, &NewickStyle::default()).unwrap();
    String::from_utf8(out).unwrap()
}

fn count_trees(registry: &FormatRegistry, source: &[u8], format: &str) -> usize {
    let mut source = source;
    registry
        .tree_source_iter(&mut source, format, &FormatOptions::default())
        .unwrap()
        .map(|tree| tree.unwrap())
        .count()
}

fn fixture_parsing(c: &mut Criterion) {
    let registry = FormatRegistry::with_builtin_formats();
    for (name, format, path) in FIXTURE_FILES {
        let content = std::fs::read(path).unwrap();
        c.bench_function(name, |b| {
            b.iter(|| count_trees(&registry, &content, format));
        });
    }
}

fn simulated_parsing(c: &mut Criterion) {
    let registry = FormatRegistry::with_builtin_formats();
    let content = simulated_newick(200, 100);
    c.bench_function("yule-n200-100", |b| {
        b.iter(|| count_trees(&registry, content.as_bytes(), "newick"));
    });
}

fn simulation(c: &mut Criterion) {
    let labels: Vec<String> = (1..=100).map(|i| format!("t{i}")).collect();
    let taxa = TaxonSet::from_labels(&labels).into_shared();

    c.bench_function("pure_birth-n100", |b| {
        let mut rng = StdRng::seed_from_u64(1);
        b.iter(|| uniform_pure_birth(taxa.clone(), 1.0, true, &mut rng).unwrap());
    });
    c.bench_function("kingman-n100", |b| {
        let mut rng = StdRng::seed_from_u64(2);
        b.iter(|| pure_kingman(taxa.clone(), 1.0, &mut rng).unwrap());
    });

    let pops = TaxonSet::from_labels(&labels[..10]).into_shared();
    c.bench_function("constrained_kingman-p10-g10", |b| {
        let mut rng = StdRng::seed_from_u64(3);
        b.iter(|| {
            let config = PopGenConfig::from_taxon_set(pops.clone()).with_num_genes(NumGenes::Uniform(10));
            let mut pop_tree = pop_gen_tree(config, &mut rng).unwrap();
            constrained_kingman(&mut pop_tree, &ConstrainedKingmanConfig::new(), &mut rng).unwrap()
        });
    });
}

criterion_group!(regression, fixture_parsing, simulation);
criterion_group! {
    name = reporting;
    config = Criterion::default().sample_size(10);
    targets = simulated_parsing
}
criterion_main!(regression, reporting);
