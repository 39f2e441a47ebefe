//! NEXUS format writer for [DataSet]s and [TreeList]s.

use crate::dataio::{FormatOptions, TRANSLATE as TRANSLATE_OPTION};
use crate::model::{CharacterMatrix, DataSet, SharedTaxonSet, TreeList};
use crate::newick::writer::{estimate_newick_len, to_newick_with_capacity};
use crate::newick::{NewickStyle, TaxonStyle};
use crate::nexus::defs::{
    BLOCK_BEGIN, BLOCK_END, CHARACTERS, DATATYPE, DIMENSIONS, FORMAT, GAP, MATRIX, MISSING, NCHAR,
    NEXUS_HEADER, NTAX, TAXA, TAXLABELS, TRANSLATE, TREE, TREES,
};
use crate::parser::utils::escape_label;
use std::io::{self, BufWriter, Write};

// =#========================================================================#=
// NEXUS WRITER
// =#========================================================================#=
/// Writer for taxa, character matrices and trees in NEXUS format.
///
/// # Format Structure
/// The writer produces a NEXUS file with the following structure:
/// - `#NEXUS` header
/// - `TAXA` block with dimensions and tax labels (per non-empty taxon set)
/// - `CHARACTERS` block per character matrix, unless chars are excluded
/// - `TREES` block per tree list with `TRANSLATE` command (unless disabled
///   through the `translate` option) and tree definitions
///
/// # Example
/// ```
/// use phylio::dataio::FormatOptions;
/// use phylio::model::{TaxonSet, Tree, TreeList};
/// use phylio::nexus::NexusWriter;
///
/// let taxa = TaxonSet::from_labels(["Kea", "Kaka"]).into_shared();
/// let mut trees = TreeList::new(taxa.clone());
/// trees.push(Tree::star(taxa)).unwrap();
///
/// let mut out = Vec::new();
/// NexusWriter::new(&mut out, &FormatOptions::default()).write_tree_list(&trees).unwrap();
/// let text = String::from_utf8(out).unwrap();
/// assert!(text.starts_with("#NEXUS"));
/// assert!(text.contains("TREE tree_1 = (1,2);"));
/// ```
pub struct NexusWriter<W: Write> {
    bw: BufWriter<W>,
    style: NewickStyle,
    translate: bool,
    exclude_trees: bool,
    exclude_chars: bool,
}

// ============================================================================
// API (public)
// ============================================================================
impl<W: Write> NexusWriter<W> {
    /// Creates a new NEXUS writer configured by writer options.
    ///
    /// # Arguments
    /// * `writer` - The sink to write to
    /// * `options` - `edge_lengths`, `internal_labels`, `annotations`,
    ///   `exclude_trees`, `exclude_chars` and the `translate` extra are honoured
    pub fn new(writer: W, options: &FormatOptions) -> NexusWriter<W> {
        let translate = options.extra_bool(TRANSLATE_OPTION, true);
        let taxa = if translate { TaxonStyle::OneIndexed } else { TaxonStyle::Label };
        NexusWriter {
            bw: BufWriter::new(writer),
            style: NewickStyle::from_options(options).with_taxon_style(taxa),
            translate,
            exclude_trees: options.exclude_trees(),
            exclude_chars: options.exclude_chars(),
        }
    }

    /// Writes a complete NEXUS file with all taxon sets, matrices and tree lists.
    ///
    /// # Errors
    /// Returns an I/O error if writing fails
    pub fn write_data_set(&mut self, data: &DataSet) -> io::Result<()> {
        self.header()?;
        for taxon_set in &data.taxon_sets {
            self.taxa_block(taxon_set)?;
        }
        if !self.exclude_chars {
            for matrix in &data.char_matrices {
                self.characters_block(matrix)?;
            }
        }
        if !self.exclude_trees {
            for tree_list in &data.tree_lists {
                self.trees_block(tree_list)?;
            }
        }
        self.bw.flush()
    }

    /// Writes a complete NEXUS file with the TAXA and TREES block of one tree list.
    ///
    /// # Errors
    /// Returns an I/O error if writing fails
    pub fn write_tree_list(&mut self, trees: &TreeList) -> io::Result<()> {
        self.header()?
            .taxa_block(trees.taxon_set())?
            .trees_block(trees)?;
        self.bw.flush()
    }
}

// ============================================================================
// Nexus Block & Command Writing (private)
// ============================================================================
impl<W: Write> NexusWriter<W> {
    /// Writes the NEXUS file header ("#NEXUS"), returning itself for chaining.
    fn header(&mut self) -> io::Result<&mut Self> {
        self.write_all(NEXUS_HEADER)?.newline()?.newline()?;
        Ok(self)
    }

    /// Writes the TAXA block with dimensions and taxon labels, returning itself for chaining.
    /// Empty taxon sets are skipped.
    fn taxa_block(&mut self, taxon_set: &SharedTaxonSet) -> io::Result<&mut Self> {
        let taxa = taxon_set.borrow();
        if taxa.is_empty() {
            return Ok(self);
        }

        // "BEGIN TAXA;"
        self.write_all(BLOCK_BEGIN)?.space()?.write_all(TAXA)?.semicolon_ln()?;

        // "\tDIMENSIONS NTAX=n;"
        self.tab()?
            .write_all(DIMENSIONS)?
            .space()?
            .write_all(NTAX)?
            .equals()?
            .write_all(taxa.len().to_string().as_bytes())?
            .semicolon_ln()?;

        // "\tTAXLABELS\n\t\tlabel\n...;"
        self.tab()?.write_all(TAXLABELS)?.newline()?;
        for taxon in taxa.iter() {
            let escaped_label = escape_label(taxon.label());
            self.tab()?.tab()?.write_all(escaped_label.as_bytes())?.newline()?;
        }
        self.tab()?.semicolon_ln()?;

        // "END;"
        self.write_all(BLOCK_END)?.newline()?.newline()?;

        Ok(self)
    }

    /// Writes a CHARACTERS block with one row per taxon, returning itself for chaining.
    fn characters_block(&mut self, matrix: &CharacterMatrix) -> io::Result<&mut Self> {
        self.write_all(BLOCK_BEGIN)?.space()?.write_all(CHARACTERS)?.semicolon_ln()?;

        // "\tDIMENSIONS NCHAR=n;"
        self.tab()?
            .write_all(DIMENSIONS)?
            .space()?
            .write_all(NCHAR)?
            .equals()?
            .write_all(matrix.num_chars().to_string().as_bytes())?
            .semicolon_ln()?;

        // "\tFORMAT DATATYPE=DNA MISSING=? GAP=-;"
        let missing = matrix.missing().to_string();
        let gap = matrix.gap().to_string();
        self.tab()?
            .write_all(FORMAT)?
            .space()?
            .write_all(DATATYPE)?
            .equals()?
            .write_all(matrix.datatype().as_str().as_bytes())?
            .space()?
            .write_all(MISSING)?
            .equals()?
            .write_all(missing.as_bytes())?
            .space()?
            .write_all(GAP)?
            .equals()?
            .write_all(gap.as_bytes())?
            .semicolon_ln()?;

        // "\tMATRIX\n\t\tlabel    states\n...;"
        self.tab()?.write_all(MATRIX)?.newline()?;
        let width = matrix
            .rows()
            .map(|(taxon, _)| escape_label(taxon.label()).len())
            .max()
            .unwrap_or(0);
        for (taxon, row) in matrix.rows() {
            let label = format!("{:<width$}", escape_label(taxon.label()));
            self.tab()?
                .tab()?
                .write_all(label.as_bytes())?
                .space()?
                .space()?
                .write_all(row.as_bytes())?
                .newline()?;
        }
        self.tab()?.semicolon_ln()?;

        self.write_all(BLOCK_END)?.newline()?.newline()?;
        Ok(self)
    }

    /// Writes the TREES block with TRANSLATE command and tree list, returning itself for chaining.
    fn trees_block(&mut self, trees: &TreeList) -> io::Result<&mut Self> {
        // "BEGIN TREES;"
        self.write_all(BLOCK_BEGIN)?.space()?.write_all(TREES)?.semicolon_ln()?;

        if self.translate {
            self.translate_cmd(trees.taxon_set())?;
        }
        self.trees_cmd_list(trees)?;

        // "END;"
        self.write_all(BLOCK_END)?.newline()?;

        Ok(self)
    }

    /// Writes the TRANSLATE command mapping 1-based indices to labels, returning itself for chaining.
    fn translate_cmd(&mut self, taxon_set: &SharedTaxonSet) -> io::Result<&mut Self> {
        let taxa = taxon_set.borrow();
        if taxa.is_empty() {
            return Ok(self);
        }

        // "\tTRANSLATE\n\t\t<key> <label>,\n...;"
        self.tab()?.write_all(TRANSLATE)?.newline()?;

        let num_labels = taxa.len();
        for (i, taxon) in taxa.iter().enumerate() {
            let escaped_label = escape_label(taxon.label());

            self.tab()?
                .tab()?
                .write_all((i + 1).to_string().as_bytes())?
                .space()?
                .write_all(escaped_label.as_bytes())?;

            // No comma after last pair
            if i + 1 < num_labels {
                self.comma()?;
            }
            self.newline()?;
        }
        self.tab()?.semicolon_ln()?;

        Ok(self)
    }

    /// Writes the list of TREE commands in Newick format, returning itself for chaining.
    fn trees_cmd_list(&mut self, trees: &TreeList) -> io::Result<&mut Self> {
        let Some(some_tree) = trees.get(0) else {
            return Ok(self);
        };

        // Estimate Newick string length
        let estimated_length = estimate_newick_len(&self.style, some_tree);

        // "\tTREE <name> = <Newick;>"
        for (i, tree) in trees.iter().enumerate() {
            let name = tree
                .label()
                .map(escape_label)
                .unwrap_or_else(|| format!("tree_{}", i + 1));
            let newick = to_newick_with_capacity(&self.style, tree, estimated_length);

            self.tab()?
                .write_all(TREE)?
                .space()?
                .write_all(name.as_bytes())?
                .space()?
                .equals()?
                .space()?
                .write_all(newick.as_bytes())?
                .newline()?;
        }

        Ok(self)
    }
}

// ============================================================================
// Little Helpers (private)
// ============================================================================
impl<W: Write> NexusWriter<W> {
    /// Appends a byte slice to the [BufWriter], returning itself for chaining.
    fn write_all(&mut self, buf: &[u8]) -> io::Result<&mut Self> {
        self.bw.write_all(buf)?;
        Ok(self)
    }

    /// Appends a space character (' ') to the [BufWriter], returning itself for chaining.
    fn space(&mut self) -> io::Result<&mut Self> {
        self.write_all(b" ")
    }

    /// Appends a tab character ('\t') to the [BufWriter], returning itself for chaining.
    fn tab(&mut self) -> io::Result<&mut Self> {
        self.write_all(b"\t")
    }

    /// Appends a newline character ('\n') to the [BufWriter], returning itself for chaining.
    fn newline(&mut self) -> io::Result<&mut Self> {
        self.write_all(b"\n")
    }

    /// Appends a semicolon followed by a newline (';\n') to the [BufWriter], returning itself for chaining.
    fn semicolon_ln(&mut self) -> io::Result<&mut Self> {
        self.write_all(b";\n")
    }

    /// Appends a comma (',') to the [BufWriter], returning itself for chaining.
    fn comma(&mut self) -> io::Result<&mut Self> {
        self.write_all(b",")
    }

    /// Appends an equals sign ('=') to the [BufWriter], returning itself for chaining.
    fn equals(&mut self) -> io::Result<&mut Self> {
        self.write_all(b"=")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DataType, TaxonSet, Tree};

    fn data_set() -> DataSet {
        let taxa = TaxonSet::from_labels(["Wilson's Storm-petrel", "Grey-backed Storm-petrel"]).into_shared();
        let mut trees = TreeList::new(taxa.clone());
        trees.push(Tree::star(taxa.clone()).with_label("star")).unwrap();
        let mut data = DataSet::from_tree_list(trees);

        let mut matrix = CharacterMatrix::new(taxa.clone(), DataType::Dna);
        matrix.extend_row(taxa.borrow()[0].clone(), "ACGT");
        matrix.extend_row(taxa.borrow()[1].clone(), "AC-T");
        data.char_matrices.push(matrix);
        data
    }

    fn write(options: &FormatOptions) -> String {
        let mut out = Vec::new();
        NexusWriter::new(&mut out, options).write_data_set(&data_set()).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_full_data_set() {
        let text = write(&FormatOptions::default());
        assert!(text.contains("DIMENSIONS NTAX=2;"));
        assert!(text.contains("\t\t'Wilson''s Storm-petrel'\n"));
        assert!(text.contains("FORMAT DATATYPE=DNA MISSING=? GAP=-;"));
        assert!(text.contains("\t\t1 'Wilson''s Storm-petrel',\n\t\t2 Grey-backed_Storm-petrel\n\t;"));
        assert!(text.contains("\tTREE star = (1,2);\n"));
    }

    #[test]
    fn test_without_translate_and_exclusions() {
        let options = FormatOptions::new()
            .with_extra(TRANSLATE_OPTION, false)
            .with_exclude_chars(true);
        let text = write(&options);
        assert!(!text.contains("TRANSLATE"));
        assert!(!text.contains("CHARACTERS"));
        assert!(text.contains("TREE star = ('Wilson''s Storm-petrel',Grey-backed_Storm-petrel);"));

        let text = write(&FormatOptions::new().with_exclude_trees(true));
        assert!(!text.contains("BEGIN TREES"));
        assert!(text.contains("BEGIN CHARACTERS"));
    }
}
