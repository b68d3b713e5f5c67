/// Case-insensitive substring match. An empty needle matches everything.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Returns `None` for missing or whitespace-only values, the trimmed value
/// otherwise.
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_ignores_case_and_accents_stay_intact() {
        assert!(contains_ignore_case("Pharmacie de l'Étoile", "étoile"));
        assert!(contains_ignore_case("Cotonou", ""));
        assert!(!contains_ignore_case("Cotonou", "parakou"));
    }

    #[test]
    fn non_blank_trims() {
        assert_eq!(non_blank(Some("  Akpakpa ")), Some("Akpakpa".to_owned()));
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(None), None);
    }
}
