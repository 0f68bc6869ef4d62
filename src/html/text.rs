//! Text normalization
//!
//! Stored annotation text is never normalized; these helpers only shape
//! search needles and the rendered text of a document.

use once_cell::sync::Lazy;
use regex::Regex;

static LINE_BREAKS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\r\n\t]+").expect("line break pattern is valid"));
static WHITESPACE_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s\s+").expect("whitespace pattern is valid"));

/// Collapse line breaks and whitespace runs into single spaces, then trim
pub fn normalize(text: &str) -> String {
    let single_line = LINE_BREAKS.replace_all(text, " ");
    let collapsed = WHITESPACE_RUNS.replace_all(&single_line, " ");
    collapsed.trim().to_string()
}

/// Whitespace that HTML rendering collapses.
///
/// Non-breaking spaces are deliberately excluded; they render as-is.
pub fn is_html_space(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n' | '\r' | '\u{000C}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_line_breaks() {
        assert_eq!(normalize("a\n\nb"), "a b");
        assert_eq!(normalize("a\r\n\tb"), "a b");
    }

    #[test]
    fn test_normalize_collapses_space_runs_and_trims() {
        assert_eq!(normalize("  hello    world  "), "hello world");
        assert_eq!(normalize("line one \n  line two"), "line one line two");
    }

    #[test]
    fn test_html_space_excludes_non_breaking_space() {
        assert!(is_html_space('\n'));
        assert!(!is_html_space('\u{a0}'));
    }

    #[test]
    fn test_normalize_is_identity_on_clean_text() {
        let text = "The quick brown fox";
        assert_eq!(normalize(text), text);
    }
}
