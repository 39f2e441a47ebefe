//! Utility functions for label escaping in phylogenetic tree formats.
//!
//! Labels are written so that reading them back yields the same string:
//! unquoted underscores are read as spaces, hence labels containing
//! underscores or special characters are single-quoted, while labels whose
//! only special characters are spaces get their spaces replaced by
//! underscores.

/// Characters that force a label to be quoted.
const SPECIAL_CHARACTERS: &[char] = &[
    ',', ';', '\t', '\n', '\r', '(', ')', ':', '[', ']', '\'', '_', '=',
];

/// Checks if a label is enclosed in single quotes.
///
/// # Examples
/// ```
/// # use phylio::parser::utils::is_single_quoted;
/// assert_eq!(is_single_quoted("Pukeko"), false);
/// assert_eq!(is_single_quoted("'Swamp hen'"), true);
/// assert_eq!(is_single_quoted("'"), false);
/// ```
pub fn is_single_quoted(label: &str) -> bool {
    label.len() >= 2 && label.starts_with('\'') && label.ends_with('\'')
}

/// Escapes a label for safe use in NEXUS and Newick formats.
///
/// # Returns
/// The label as it should appear in a file
///
/// # Examples
/// ```
/// # use phylio::parser::utils::escape_label;
/// assert_eq!(escape_label("Pukeko"), "Pukeko");
/// assert_eq!(escape_label("Pu[ke]ko"), "'Pu[ke]ko'");
/// assert_eq!(escape_label("Australasian Swamphen"), "Australasian_Swamphen");
/// assert_eq!(escape_label("Australasian_Swamphen"), "'Australasian_Swamphen'");
/// assert_eq!(escape_label("Baillon's Crake"), "'Baillon''s Crake'");
/// assert_eq!(escape_label(""), "''");
/// ```
pub fn escape_label(label: &str) -> String {
    if label.is_empty() {
        return "''".to_string();
    }

    if label.contains(SPECIAL_CHARACTERS) {
        format!("'{}'", label.replace('\'', "''"))
    } else {
        label.replace(' ', "_")
    }
}

/// Reverts the underscore convention for a label that was read unquoted.
///
/// # Arguments
/// * `label` - The raw label
/// * `quoted` - Whether the label was enclosed in quotes (then it is kept verbatim)
/// * `preserve_underscores` - Keep underscores of unquoted labels as they are
///
/// # Examples
/// ```
/// # use phylio::parser::utils::unescape_label;
/// assert_eq!(unescape_label("Australasian_Swamphen", false, false), "Australasian Swamphen");
/// assert_eq!(unescape_label("Australasian_Swamphen", true, false), "Australasian_Swamphen");
/// assert_eq!(unescape_label("Australasian_Swamphen", false, true), "Australasian_Swamphen");
/// ```
pub fn unescape_label(label: &str, quoted: bool, preserve_underscores: bool) -> String {
    if quoted || preserve_underscores {
        label.to_string()
    } else {
        label.replace('_', " ")
    }
}
