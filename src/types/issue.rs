use serde::{Deserialize, Serialize};

/// Finding produced when documentation disagrees with extracted facts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub severity: IssueSeverity,
    /// Element (or pattern) the issue is about
    pub subject: String,
    pub description: String,
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    pub fn new(
        severity: IssueSeverity,
        subject: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            subject: subject.into(),
            description: description.into(),
            suggestion: None,
        }
    }

    pub fn error(subject: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(IssueSeverity::Error, subject, description)
    }

    pub fn warning(subject: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(IssueSeverity::Warning, subject, description)
    }

    pub fn missing(subject: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(IssueSeverity::Missing, subject, description)
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.subject, self.description)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueSeverity {
    Error,
    Warning,
    Missing,
}

impl std::fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueSeverity::Error => write!(f, "ERROR"),
            IssueSeverity::Warning => write!(f, "WARNING"),
            IssueSeverity::Missing => write!(f, "MISSING"),
        }
    }
}

/// Per-severity tally of an issue list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueCounts {
    pub errors: usize,
    pub warnings: usize,
    pub missing: usize,
}

impl IssueCounts {
    pub fn from_issues(issues: &[ValidationIssue]) -> Self {
        issues.iter().fold(Self::default(), |mut acc, issue| {
            match issue.severity {
                IssueSeverity::Error => acc.errors += 1,
                IssueSeverity::Warning => acc.warnings += 1,
                IssueSeverity::Missing => acc.missing += 1,
            }
            acc
        })
    }

    pub fn total(&self) -> usize {
        self.errors + self.warnings + self.missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_counts() {
        let issues = vec![
            ValidationIssue::error("foo", "element does not exist in source"),
            ValidationIssue::warning("Bar", "naming inconsistency"),
            ValidationIssue::missing("baz", "undocumented public element"),
            ValidationIssue::missing("qux", "undocumented public element"),
        ];

        let counts = IssueCounts::from_issues(&issues);
        assert_eq!(counts.errors, 1);
        assert_eq!(counts.warnings, 1);
        assert_eq!(counts.missing, 2);
        assert_eq!(counts.total(), 4);
    }

    #[test]
    fn test_severity_serialization() {
        let json = serde_json::to_string(&IssueSeverity::Missing).unwrap();
        assert_eq!(json, "\"MISSING\"");
        assert_eq!(IssueSeverity::Error.to_string(), "ERROR");
    }
}
