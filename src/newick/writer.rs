//! Newick format writing for [Tree]s.

use crate::dataio::FormatOptions;
use crate::model::{AnnotationValue, Annotations, NodeIndex, Rooting, Tree, TreeList};
use crate::parser::utils::escape_label;
use std::io::{self, Write};

/// Extra buffer in Newick string length/capacity estimate
const BUFFER_CHARS: usize = 10;

/// Controls how taxa are represented in the output string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaxonStyle {
    /// Use escaped taxon labels
    #[default]
    Label,
    /// Use 1-based taxon set positions (as in NEXUS `TRANSLATE` commands)
    OneIndexed,
}

/// Style for serializing a tree to Newick format.
///
/// # Example
/// ```
/// use phylio::model::{TaxonSet, Tree};
/// use phylio::newick::{to_newick, NewickStyle};
///
/// let taxa = TaxonSet::from_labels(["Kea", "Kaka"]).into_shared();
/// let tree = Tree::star(taxa);
/// assert_eq!(to_newick(&tree, &NewickStyle::default()), "(Kea,Kaka);");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct NewickStyle {
    taxa: TaxonStyle,
    edge_lengths: bool,
    internal_labels: bool,
    annotations: bool,
    rooting_token: bool,
}

impl Default for NewickStyle {
    fn default() -> Self {
        Self {
            taxa: TaxonStyle::Label,
            edge_lengths: true,
            internal_labels: true,
            annotations: false,
            rooting_token: true,
        }
    }
}

impl NewickStyle {
    /// Style derived from writer options.
    pub fn from_options(options: &FormatOptions) -> Self {
        Self {
            edge_lengths: options.edge_lengths(),
            internal_labels: options.internal_labels(),
            annotations: options.annotations(),
            ..Self::default()
        }
    }

    pub fn with_taxon_style(mut self, taxa: TaxonStyle) -> Self {
        self.taxa = taxa;
        self
    }

    pub fn with_edge_lengths(mut self, edge_lengths: bool) -> Self {
        self.edge_lengths = edge_lengths;
        self
    }

    pub fn with_internal_labels(mut self, internal_labels: bool) -> Self {
        self.internal_labels = internal_labels;
        self
    }

    pub fn with_annotations(mut self, annotations: bool) -> Self {
        self.annotations = annotations;
        self
    }

    /// Whether to prefix `[&R]`/`[&U]` for trees with known rooting state.
    pub fn with_rooting_token(mut self, rooting_token: bool) -> Self {
        self.rooting_token = rooting_token;
        self
    }
}

/// Writes the trees of a tree list in Newick format, one tree per line.
///
/// # Errors
/// Returns an I/O error if writing fails.
pub fn write_tree_list<W: Write + ?Sized>(
    writer: &mut W,
    trees: &TreeList,
    style: &NewickStyle,
) -> io::Result<()> {
    let Some(first) = trees.get(0) else {
        return Ok(());
    };

    let estimated_capacity = estimate_newick_len(style, first);
    for tree in trees {
        let newick = to_newick_with_capacity(style, tree, estimated_capacity);
        writer.write_all(newick.as_bytes())?;
        writer.write_all(b"\n")?;
    }
    writer.flush()
}

/// Writes a single tree in Newick format followed by a newline.
pub fn write_tree<W: Write + ?Sized>(writer: &mut W, tree: &Tree, style: &NewickStyle) -> io::Result<()> {
    writer.write_all(to_newick(tree, style).as_bytes())?;
    writer.write_all(b"\n")
}

/// Returns the Newick representation of this tree with closing semicolon.
///
/// # Example
/// ```
/// use phylio::model::{TaxonSet, Tree};
/// use phylio::newick::{to_newick, NewickStyle};
///
/// let taxa = TaxonSet::new_shared();
/// let kiwi = taxa.borrow_mut().require_taxon("Little Spotted Kiwi");
/// let mut tree = Tree::new(taxa);
/// let seed = tree.seed_index();
/// tree.new_child(seed, Some(kiwi), Some(1.0)).unwrap();
///
/// assert_eq!(to_newick(&tree, &NewickStyle::default()), "(Little_Spotted_Kiwi:1);");
/// ```
pub fn to_newick(tree: &Tree, style: &NewickStyle) -> String {
    let estimated_capacity = estimate_newick_len(style, tree);
    to_newick_with_capacity(style, tree, estimated_capacity)
}

/// Returns the Newick representation of a tree with pre-allocated capacity.
pub(crate) fn to_newick_with_capacity(style: &NewickStyle, tree: &Tree, estimated_capacity: usize) -> String {
    let mut newick = String::with_capacity(estimated_capacity);

    if style.rooting_token {
        match tree.rooting() {
            Rooting::Rooted => newick.push_str("[&R] "),
            Rooting::Unrooted => newick.push_str("[&U] "),
            Rooting::Unspecified => {}
        }
    }

    build_newick(tree, &mut newick, tree.seed_index(), style);
    newick.push(';');

    newick
}

/// Recursive helper for building the Newick string.
fn build_newick(tree: &Tree, newick: &mut String, index: NodeIndex, style: &NewickStyle) {
    let node = &tree[index];

    if node.is_internal() {
        newick.push('(');
        for (i, &child) in node.children().iter().enumerate() {
            if i > 0 {
                newick.push(',');
            }
            build_newick(tree, newick, child, style);
        }
        newick.push(')');
    }

    if node.is_leaf() || style.internal_labels {
        if let Some(taxon) = node.taxon() {
            match style.taxa {
                TaxonStyle::Label => newick.push_str(&escape_label(taxon.label())),
                TaxonStyle::OneIndexed => newick.push_str(&(taxon.index() + 1).to_string()),
            }
        } else if let Some(label) = node.label() {
            newick.push_str(&escape_label(label));
        }
    }

    if style.annotations {
        push_annotations(newick, node.annotations());
    }

    if style.edge_lengths {
        if let Some(length) = node.edge_length() {
            newick.push(':');
            newick.push_str(&length.to_string());
            if style.annotations {
                push_annotations(newick, node.edge().annotations());
            }
        }
    }
}

/// Appends `[&key=value,...]` unless there are no annotations.
fn push_annotations(newick: &mut String, annotations: &Annotations) {
    if annotations.is_empty() {
        return;
    }
    newick.push_str("[&");
    for (i, (key, value)) in annotations.iter().enumerate() {
        if i > 0 {
            newick.push(',');
        }
        newick.push_str(key);
        newick.push('=');
        match value {
            // Debug keeps the decimal point so the value is read back as a float
            AnnotationValue::Float(v) => newick.push_str(&format!("{v:?}")),
            AnnotationValue::Int(v) => newick.push_str(&v.to_string()),
            AnnotationValue::String(s) => newick.push_str(&annotation_string(s)),
        }
    }
    newick.push(']');
}

/// Quotes string annotation values that would otherwise be misread.
fn annotation_string(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value.contains([',', ']', '[', '=', '"', ' '])
        || value.parse::<f64>().is_ok();
    if value.starts_with('{') && value.ends_with('}') {
        value.to_string()
    } else if needs_quotes && !value.contains('"') {
        format!("\"{value}\"")
    } else if needs_quotes {
        format!("'{value}'")
    } else {
        value.to_string()
    }
}

/// Estimates the length of a Newick string for a given tree, used to
/// pre-allocate string capacity.
pub(crate) fn estimate_newick_len(style: &NewickStyle, tree: &Tree) -> usize {
    // Each internal node: "()" plus commas ~= 3 chars
    const INTERNAL_NODE_CHARS: usize = 3;
    // Edge lengths: ~20 chars each (e.g., ":0.009529961339106089")
    const EDGE_LENGTH_CHARS: usize = 20;
    // Index digits, generous
    const INDEX_CHARS: usize = 4;

    let num_leaves = tree.num_leaves();
    let structure_capacity = tree.num_internal() * INTERNAL_NODE_CHARS;

    let label_capacity = match style.taxa {
        TaxonStyle::Label => tree
            .leaf_iter()
            .filter_map(|leaf| leaf.taxon())
            .map(|taxon| taxon.label().len() + 2)
            .sum(),
        TaxonStyle::OneIndexed => num_leaves * INDEX_CHARS,
    };

    let edge_capacity = if style.edge_lengths && tree.has_edge_lengths() {
        tree.num_nodes() * EDGE_LENGTH_CHARS
    } else {
        0
    };

    structure_capacity + label_capacity + edge_capacity + BUFFER_CHARS
}
