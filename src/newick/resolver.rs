//! Resolution of leaf labels to taxa during Newick parsing.

use crate::model::{SharedTaxonSet, Taxon};
use std::collections::HashMap;
use std::rc::Rc;

// =#========================================================================#=
// TAXON RESOLVER
// =#========================================================================#=
/// Resolves labels in Newick strings to [Taxon]s of a taxon set.
///
/// Different variants handle different scenarios:
/// - [`Labels`](Self::Labels) — raw Newick; unknown labels create new taxa
/// - [`KnownTaxa`](Self::KnownTaxa) — NEXUS with a TAXA block but no TRANSLATE
/// - [`Translate`](Self::Translate) — NEXUS with a TRANSLATE command
#[derive(Debug, Clone, Default)]
pub enum TaxonResolver {
    /// Labels are taxon labels; a label not yet in the taxon set is accessioned.
    #[default]
    Labels,

    /// Resolves, in order:
    /// 1. Verbatim label match in the taxon set
    /// 2. Integer as 1-based index into the taxon set
    KnownTaxa,

    /// Resolves, in order:
    /// 1. Key of the TRANSLATE map (e.g. "terny" -> "White-fronted tern")
    /// 2. Integer as 1-based index into the taxon set
    /// 3. Verbatim label match in the taxon set
    Translate(HashMap<String, Rc<Taxon>>),
}

impl TaxonResolver {
    /// Resolves a parsed leaf label.
    ///
    /// # Arguments
    /// * `raw` - Label exactly as written (used for TRANSLATE keys)
    /// * `label` - Label after unescaping (used for taxon lookup)
    ///
    /// # Errors
    /// A message describing why the label could not be resolved.
    pub(crate) fn resolve(
        &self,
        taxon_set: &SharedTaxonSet,
        raw: &str,
        label: &str,
    ) -> Result<Rc<Taxon>, String> {
        match self {
            TaxonResolver::Labels => Ok(taxon_set.borrow_mut().require_taxon(label)),
            TaxonResolver::KnownTaxa => {
                let taxa = taxon_set.borrow();
                taxa.get_taxon(label)
                    .or_else(|| by_number(&taxa, raw))
                    .ok_or_else(|| format!("No taxon with label or number '{label}'"))
            }
            TaxonResolver::Translate(map) => {
                if let Some(taxon) = map.get(raw) {
                    return Ok(Rc::clone(taxon));
                }
                let taxa = taxon_set.borrow();
                by_number(&taxa, raw)
                    .or_else(|| taxa.get_taxon(label))
                    .ok_or_else(|| format!("'{raw}' is neither a TRANSLATE key nor a taxon"))
            }
        }
    }
}

/// Taxon at 1-based position `raw`, if `raw` is such a number.
fn by_number(taxa: &crate::model::TaxonSet, raw: &str) -> Option<Rc<Taxon>> {
    let number = raw.parse::<usize>().ok()?;
    taxa.get(number.checked_sub(1)?).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TaxonSet;

    #[test]
    fn test_translate_precedence() {
        let taxa = TaxonSet::from_labels(["Kea", "Kaka", "Kakapo"]).into_shared();
        let kakapo = taxa.borrow()[2].clone();
        let map = HashMap::from([("1".to_string(), kakapo.clone())]);
        let resolver = TaxonResolver::Translate(map);

        // Key wins over index
        assert!(Rc::ptr_eq(&resolver.resolve(&taxa, "1", "1").unwrap(), &kakapo));
        assert_eq!(resolver.resolve(&taxa, "2", "2").unwrap().label(), "Kaka");
        assert_eq!(resolver.resolve(&taxa, "Kea", "Kea").unwrap().label(), "Kea");
        assert!(resolver.resolve(&taxa, "Weka", "Weka").is_err());
        assert!(resolver.resolve(&taxa, "0", "0").is_err());
    }

    #[test]
    fn test_labels_accession() {
        let taxa = TaxonSet::new_shared();
        let taxon = TaxonResolver::Labels.resolve(&taxa, "Tui", "Tui").unwrap();
        assert_eq!(taxon.index(), 0);
        assert_eq!(taxa.borrow().len(), 1);
    }
}
