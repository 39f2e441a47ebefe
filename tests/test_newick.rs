use phylio::dataio::{FormatOptions, PRESERVE_UNDERSCORES};
use phylio::error::PhyloError;
use phylio::model::{Rooting, TaxonSet, Tree};
use phylio::newick::{self, NewickParser, NewickStyle, TaxonStyle, parse_file, parse_str, to_newick};
use phylio::parser::ByteParser;
use phylio::parser::ParsingErrorType;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

fn leaf_labels(tree: &Tree) -> Vec<String> {
    let mut labels: Vec<String> = tree
        .leaf_iter()
        .map(|n| n.taxon().unwrap().label().to_string())
        .collect();
    labels.sort();
    labels
}

// --- TESTS NEWICK STRING PARSING ---
#[test]
fn test_basic_tree() {
    let tree = parse_str("((A:1.0,B:2.0):3.0,C:4.0):0.5;").unwrap();

    assert_eq!(tree.num_leaves(), 3);
    assert_eq!(tree.num_internal(), 2);
    assert_eq!(tree.num_nodes(), 5);
    assert_eq!(tree.taxon_set().borrow().len(), 3);
    assert!(tree.is_valid());

    // Root has children (internal, C)
    let root = tree.seed();
    let internal = &tree[root.children()[0]];
    let leaf_c = &tree[root.children()[1]];
    assert!(internal.is_internal());
    assert_eq!(leaf_c.taxon().unwrap().label(), "C");
    assert_eq!(leaf_c.edge_length(), Some(4.0));
    assert_eq!(root.edge_length(), Some(0.5));

    // Parent relationships
    assert_eq!(internal.parent(), Some(root.index()));
    for &child in internal.children() {
        assert_eq!(tree[child].parent(), Some(internal.index()));
        assert_eq!(tree[child].edge().tail(), Some(internal.index()));
    }

    assert!((tree.distance_from_root(internal.children()[1]) - 5.0).abs() < 1e-12);
    assert!((tree.length() - 10.0).abs() < 1e-12);
}

#[test]
fn test_quoted_labels_and_whitespace() {
    let newick = " ( 'Wilson''s storm-petrel' : 1 ,\n\t Fregetta_grallaria:2 ) ; ";
    let tree = parse_str(newick).unwrap();
    assert_eq!(leaf_labels(&tree), vec!["Fregetta grallaria", "Wilson's storm-petrel"]);
}

#[test]
fn test_multiple_trees_share_taxa() {
    let taxa = TaxonSet::new_shared();
    let mut parser = NewickParser::new(taxa.clone());
    let trees = parser
        .parse_all(ByteParser::for_str("(A,B,(C,D));\n[second] ((A,C),(B,D));"))
        .unwrap();

    assert_eq!(trees.len(), 2);
    assert_eq!(taxa.borrow().len(), 4);
    let a0 = trees[0].leaf_iter().next().unwrap().taxon().unwrap().clone();
    let a1 = trees[1].leaf_iter().next().unwrap().taxon().unwrap().clone();
    assert!(std::rc::Rc::ptr_eq(&a0, &a1));
}

#[test]
fn test_preserve_underscores_option() {
    let options = FormatOptions::new().with_extra(PRESERVE_UNDERSCORES, true);
    let mut source: &[u8] = b"(Alca_torda,Uria_aalge);";
    let trees = newick::read_trees(&mut source, TaxonSet::new_shared(), &options).unwrap();
    assert_eq!(leaf_labels(&trees[0]), vec!["Alca_torda", "Uria_aalge"]);
}

#[test]
fn test_rooting_override() {
    let options = FormatOptions::new().with_rooting(Rooting::Unrooted);
    let mut source: &[u8] = b"[&R] (A,(B,C));";
    let trees = newick::read_trees(&mut source, TaxonSet::new_shared(), &options).unwrap();
    assert_eq!(trees[0].rooting(), Rooting::Unrooted);
}

#[test]
fn test_malformed_inputs() {
    for newick in ["((A,B);", "(A,B):x;", "(A,B)", "(A:-1,B);"] {
        match parse_str(newick) {
            Err(PhyloError::Malformed(err)) => {
                assert!(!err.to_string().is_empty(), "{newick}");
            }
            other => panic!("expected malformed error for {newick}, got {other:?}"),
        }
    }

    match parse_str("((A,B),") {
        Err(PhyloError::Malformed(err)) => assert_eq!(*err.kind(), ParsingErrorType::UnexpectedEOF),
        other => panic!("expected unexpected EOF, got {other:?}"),
    }
}

// --- TESTS NEWICK FILES ---
#[test]
fn test_parse_fixture_file() {
    let path = Path::new("tests").join("fixtures").join("alcids.nwk");
    let trees = parse_file(path).unwrap();

    assert_eq!(trees.len(), 3);
    assert_eq!(trees.taxon_set().borrow().len(), 5);
    assert!(trees[0].is_rooted());
    assert_eq!(trees[2].rooting(), Rooting::Unrooted);
    assert_eq!(trees[2].seed().num_children(), 5);

    let puffins = trees[1]
        .preorder_node_iter()
        .find(|n| n.label() == Some("puffins"))
        .unwrap();
    assert_eq!(puffins.num_children(), 2);

    for tree in &trees {
        assert_eq!(
            leaf_labels(tree),
            vec![
                "Alca torda",
                "Cerorhinca monocerata",
                "Fratercula arctica",
                "Fratercula cirrhata",
                "Fratercula corniculata"
            ]
        );
    }
}

#[test]
fn test_file_round_trip() {
    let path = Path::new("tests").join("fixtures").join("alcids.nwk");
    let original = parse_file(&path).unwrap();

    let mut file = tempfile::tempfile().unwrap();
    phylio::dataio::FormatRegistry::with_builtin_formats()
        .write_tree_list(&original, &mut file, "newick", &FormatOptions::default())
        .unwrap();
    file.flush().unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();

    // Re-read into the same taxon set so trees are comparable
    let reread = newick::read_trees(&mut file, original.taxon_set().clone(), &FormatOptions::default()).unwrap();
    assert_eq!(reread.len(), original.len());
    assert_eq!(original.taxon_set().borrow().len(), 5);

    for (a, b) in original.iter().zip(reread.iter()) {
        assert_eq!(a.rooting(), b.rooting());
        assert_eq!(leaf_labels(a), leaf_labels(b));
        assert_eq!(a.symmetric_difference(b).unwrap(), 0);
        let la: Vec<_> = a.preorder_node_iter().map(|n| n.edge_length()).collect();
        let lb: Vec<_> = b.preorder_node_iter().map(|n| n.edge_length()).collect();
        for (x, y) in la.iter().zip(&lb) {
            match (x, y) {
                (Some(x), Some(y)) => assert!((x - y).abs() < 1e-3),
                (None, None) => {}
                _ => panic!("edge length presence differs"),
            }
        }
    }
}

// --- TESTS NEWICK WRITING ---
#[test]
fn test_writer_styles() {
    let tree = parse_str("[&R] ((A:1,B:2)ab:0.5,C:3);").unwrap();

    let plain = NewickStyle::default()
        .with_edge_lengths(false)
        .with_internal_labels(false)
        .with_rooting_token(false);
    assert_eq!(to_newick(&tree, &plain), "((A,B),C);");

    let indexed = NewickStyle::default().with_taxon_style(TaxonStyle::OneIndexed);
    assert_eq!(to_newick(&tree, &indexed), "[&R] ((1:1,2:2)ab:0.5,3:3);");
}

#[test]
fn test_annotations_round_trip() {
    let options = FormatOptions::new().with_annotations(true);
    let mut source: &[u8] = b"((A[&pop_size=2.5]:1,B:1)[&support=0.9]:1,C:2);";
    let trees = newick::read_trees(&mut source, TaxonSet::new_shared(), &options).unwrap();
    let tree = &trees[0];

    let a = tree.leaf_iter().next().unwrap();
    assert_eq!(a.annotations().get("pop_size").unwrap().as_f64(), Some(2.5));

    let written = to_newick(tree, &NewickStyle::from_options(&options));
    assert!(written.contains("A[&pop_size=2.5]:1"), "{written}");
    assert!(written.contains("[&support=0.9]"), "{written}");
}
