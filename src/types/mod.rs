pub mod element;
pub mod error;
pub mod issue;

pub use element::{
    CallSite, CodeElement, ElementKind, FileExtraction, Parameter, SourceFile, Visibility,
};
pub use error::{DocGateError, ErrorCategory, ErrorClassifier, LlmError, Result};
pub use issue::{IssueCounts, IssueSeverity, ValidationIssue};

use regex::Regex;
use tracing::warn;

// =============================================================================
// Shared Helpers
// =============================================================================

/// Lowercase and collapse runs of whitespace into single spaces
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Truncate to at most `max_chars` characters on a char boundary
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Compile a built-in pattern; an invalid one is logged and disables its check
pub fn compile_regex(pattern: &str) -> Option<Regex> {
    Regex::new(pattern)
        .map_err(|e| warn!(pattern, error = %e, "Invalid built-in pattern"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_regex() {
        assert!(compile_regex(r"\bfoo\(").is_some());
        assert!(compile_regex(r"(unclosed").is_none());
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  Hello\n\tWORLD  "), "hello world");
        assert_eq!(normalize_text(""), "");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
