use console::style;

use crate::types::{IssueCounts, IssueSeverity, ValidationIssue};

/// Console rendering shared by the command handlers
pub struct Output {
    quiet: bool,
}

impl Output {
    pub fn new() -> Self {
        Self { quiet: false }
    }

    /// Suppress everything except errors
    pub fn quiet(quiet: bool) -> Self {
        Self { quiet }
    }

    pub fn success(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("✓").green(), message);
        }
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn warning(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("⚠").yellow(), message);
        }
    }

    pub fn info(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("ℹ").blue(), message);
        }
    }

    pub fn header(&self, message: &str) {
        if !self.quiet {
            println!("\n{}", style(message).bold().underlined());
        }
    }

    pub fn section(&self, message: &str) {
        if !self.quiet {
            println!("\n{}", style(message).bold());
            println!("{}", "─".repeat(40));
        }
    }

    pub fn field(&self, label: &str, value: impl std::fmt::Display) {
        if !self.quiet {
            println!("  {:<18} {}", style(label).dim(), value);
        }
    }

    pub fn issue(&self, issue: &ValidationIssue) {
        if self.quiet {
            return;
        }
        let tag = match issue.severity {
            IssueSeverity::Error => style("ERROR  ").red().bold(),
            IssueSeverity::Warning => style("WARNING").yellow(),
            IssueSeverity::Missing => style("MISSING").cyan(),
        };
        println!("  {} {}: {}", tag, style(&issue.subject).bold(), issue.description);
        if let Some(suggestion) = &issue.suggestion {
            println!("          {} {}", style("→").dim(), suggestion);
        }
    }

    pub fn issue_summary(&self, counts: &IssueCounts) {
        if self.quiet {
            return;
        }
        println!(
            "  {} errors, {} warnings, {} missing",
            style(counts.errors).red(),
            style(counts.warnings).yellow(),
            style(counts.missing).cyan()
        );
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}
