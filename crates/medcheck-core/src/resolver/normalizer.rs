//! Name and identifier normalization.
//!
//! Handles:
//! - Pair keys (case and whitespace folding of identifiers)
//! - Memoization keys for drug names
//! - Grounding extracted names against the patient's own text

use strsim::jaro_winkler;

/// Similarity at or above which a text token counts as a match for a name.
const GROUNDING_THRESHOLD: f64 = 0.88;

/// Fold case and collapse internal whitespace. Used for identifiers and names alike.
pub fn normalize_key(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Check whether `name` appears (exactly or nearly) in `text`.
///
/// Multi-word names match on a substring of the folded text; single words also
/// match a close spelling (e.g. "asprin" for "aspirin").
pub fn is_grounded(name: &str, text: &str) -> bool {
    let name = normalize_key(name);
    if name.is_empty() {
        return false;
    }
    let text = normalize_key(text);
    if text.contains(&name) {
        return true;
    }
    if name.contains(' ') {
        return false;
    }

    text.split(|c: char| !c.is_alphanumeric() && c != '-')
        .filter(|token| !token.is_empty())
        .any(|token| jaro_winkler(token, &name) >= GROUNDING_THRESHOLD)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("Aspirin"), "aspirin");
        assert_eq!(normalize_key("  aspirin \t"), "aspirin");
        assert_eq!(normalize_key("Acetylsalicylic   Acid"), "acetylsalicylic acid");
        assert_eq!(normalize_key(""), "");
    }

    #[test]
    fn test_grounded_exact_and_misspelled() {
        let text = "Current meds: Asprin 81mg daily, Atorvastatin.";
        assert!(is_grounded("aspirin", text));
        assert!(is_grounded("Atorvastatin", text));
        assert!(!is_grounded("warfarin", text));
    }

    #[test]
    fn test_grounded_multi_word() {
        let text = "Started on Potassium  Chloride last week";
        assert!(is_grounded("potassium chloride", text));
        assert!(!is_grounded("sodium chloride", text));
    }

    #[test]
    fn test_empty_name_not_grounded() {
        assert!(!is_grounded("  ", "anything"));
    }
}
