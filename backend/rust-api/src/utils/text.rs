/// Canonical form used for answer comparison: surrounding whitespace is
/// stripped and the text is case-folded. Submitting `" Paris "` matches a
/// stored correct answer of `"Paris"`.
pub fn normalize_answer(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// True when the submission carries no usable text at all.
pub fn is_blank(raw: &str) -> bool {
    raw.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_ignores_whitespace_and_case() {
        assert_eq!(normalize_answer(" Paris "), normalize_answer("paris"));
        assert_eq!(normalize_answer("PARIS"), "paris");
        assert_eq!(normalize_answer("\tThe Mitochondria\n"), "the mitochondria");
    }

    #[test]
    fn normalization_preserves_inner_spacing() {
        assert_ne!(normalize_answer("New York"), normalize_answer("NewYork"));
    }

    #[test]
    fn blank_detection() {
        assert!(is_blank(""));
        assert!(is_blank("   \t "));
        assert!(!is_blank(" x "));
    }
}
