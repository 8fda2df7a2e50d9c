//! Title normalization for issue identity.
//!
//! Two issues are the same iff their normalized titles are byte-equal. There is
//! deliberately no fuzzy matching here: aggregate counts must be reproducible.

use regex::Regex;
use std::sync::LazyLock;

static PUNCTUATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}\s]").unwrap());
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Lowercase, strip everything but letters, digits and whitespace, collapse
/// whitespace runs and trim. Symbol-only input normalizes to `""`.
pub fn normalize_title(title: &str) -> String {
    let lowered = title.to_lowercase();
    let stripped = PUNCTUATION_RE.replace_all(&lowered, "");
    WHITESPACE_RE.replace_all(stripped.trim(), " ").into_owned()
}

/// True when both titles name the same issue.
pub fn same_issue(a: &str, b: &str) -> bool {
    normalize_title(a) == normalize_title(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_title_trims_whitespace() {
        assert_eq!(normalize_title("  NHS Funding  "), "nhs funding");
    }

    #[test]
    fn normalize_title_lowercases() {
        assert_eq!(normalize_title("COST OF LIVING"), "cost of living");
    }

    #[test]
    fn normalize_title_strips_punctuation() {
        assert_eq!(normalize_title("Brexit, Again!!"), "brexit again");
        assert_eq!(normalize_title("brexit again"), "brexit again");
    }

    #[test]
    fn normalize_title_collapses_inner_whitespace() {
        assert_eq!(normalize_title("Housing \t  Crisis\n"), "housing crisis");
    }

    #[test]
    fn punctuation_between_words_does_not_leave_double_spaces() {
        assert_eq!(normalize_title("Tax - and - Spend"), "tax and spend");
    }

    #[test]
    fn normalize_title_keeps_digits_and_accents() {
        assert_eq!(normalize_title("Net-Zero 2050"), "netzero 2050");
        assert_eq!(normalize_title("Café Culture"), "café culture");
    }

    #[test]
    fn normalize_title_symbol_only_is_empty() {
        assert_eq!(normalize_title("?!..."), "");
        assert_eq!(normalize_title(""), "");
    }

    #[test]
    fn synonyms_are_not_merged() {
        assert!(!same_issue("NHS Funding", "Health Service Funding"));
        assert!(same_issue("NHS funding.", "nhs   FUNDING"));
    }
}
