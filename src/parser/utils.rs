//! Label escaping and unescaping for the Newick/Nexus token syntax.
//!
//! Writers must protect labels containing structural characters by wrapping
//! them in single quotes (doubling internal quotes), and may replace spaces
//! with underscores in unquoted labels. Readers apply the inverse.

/// Characters that force a label into quoted form. A literal underscore is
/// included: unquoted underscores read back as spaces, so leaving one
/// unquoted would change the label.
fn needs_quoting(c: char) -> bool {
    matches!(
        c,
        ',' | ';' | '\t' | '\n' | '\r' | '(' | ')' | ':' | '[' | ']' | '\'' | '=' | '{' | '}' | '_'
    )
}

/// Escapes a label for safe use in Newick and Nexus output.
///
/// Labels containing structural characters or literal underscores are
/// wrapped in single quotes with internal quotes doubled; labels containing
/// only spaces beyond ordinary characters have the spaces replaced by
/// underscores. Distinct labels always escape to distinct output, and
/// [unescape_label] inverts the mapping exactly.
///
/// # Examples
/// ```
/// # use phylostream::parser::utils::escape_label;
/// assert_eq!(escape_label("Pukeko"), "Pukeko");
/// assert_eq!(escape_label("Australasian Swamphen"), "Australasian_Swamphen");
/// assert_eq!(escape_label("Pu[ke]ko"), "'Pu[ke]ko'");
/// assert_eq!(escape_label("Baillon's Crake"), "'Baillon''s Crake'");
/// assert_eq!(escape_label("snake_case"), "'snake_case'");
/// ```
pub fn escape_label(label: &str) -> String {
    if label.chars().any(needs_quoting) {
        format!("'{}'", label.replace('\'', "''"))
    } else if label.contains(' ') {
        label.replace(' ', "_")
    } else {
        label.to_string()
    }
}

/// Unescapes a label read from Newick or Nexus input.
///
/// Removes surrounding single quotes if present and collapses doubled
/// quotes; unquoted labels have underscores translated back to spaces.
///
/// # Examples
/// ```
/// # use phylostream::parser::utils::unescape_label;
/// assert_eq!(unescape_label("Australasian_Swamphen"), "Australasian Swamphen");
/// assert_eq!(unescape_label("'Baillon''s Crake'"), "Baillon's Crake");
/// ```
pub fn unescape_label(label: &str) -> String {
    if label.len() >= 2 && label.starts_with('\'') && label.ends_with('\'') {
        label[1..label.len() - 1].replace("''", "'")
    } else {
        label.replace('_', " ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_unescape_round_trip() {
        for label in [
            "Kea",
            "Great Spotted Kiwi",
            "Wilson's Storm-petrel",
            "Pu[ke]ko",
            "snake_case",
        ] {
            assert_eq!(unescape_label(&escape_label(label)), label);
        }
    }

    #[test]
    fn distinct_labels_escape_distinctly() {
        assert_ne!(escape_label("a b"), escape_label("a_b"));
        assert_eq!(escape_label("a b"), "a_b");
        assert_eq!(escape_label("a_b"), "'a_b'");
    }
}
