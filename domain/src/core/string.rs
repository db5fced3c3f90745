//! String utilities for the domain layer.

/// Truncate a string to at most `max_len` bytes, appending an ellipsis.
///
/// Truncation always lands on a UTF-8 character boundary, so the result
/// is valid for display in reports and trace notes.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let target = max_len.saturating_sub(3);
    let mut end = target.min(s.len());
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_input_unchanged() {
        assert_eq!(truncate("diff --git", 32), "diff --git");
        assert_eq!(truncate("", 8), "");
    }

    #[test]
    fn test_truncate_long_input() {
        assert_eq!(truncate("missing error handling in parser", 13), "missing er...");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        // Multibyte content must not be split mid-character
        let s = "sécurité du module";
        let t = truncate(s, 9);
        assert!(t.ends_with("..."));
        assert!(t.len() <= 9);
    }
}
