//! Validate Command
//!
//! Checks an existing document against the facts extracted from a project.

use std::fs;
use std::path::{Path, PathBuf};

use crate::analyzer::ProjectAnalysis;
use crate::cli::ui::output::Output;
use crate::cli::{load_config, read_project};
use crate::types::{IssueCounts, IssueSeverity, Result, ValidationIssue};
use crate::verifier::{DocumentationValidator, ValidationOptions};

#[derive(Debug, Clone)]
pub struct ValidateOptions {
    pub document: PathBuf,
    pub path: Option<PathBuf>,
    pub config: Option<PathBuf>,
    /// Lowest severity printed: error, warning or missing
    pub severity: IssueSeverity,
    pub json: bool,
}

/// Returns the issue tally; the caller decides the exit status
pub fn run(options: ValidateOptions) -> Result<IssueCounts> {
    let root = options.path.clone().unwrap_or_else(|| PathBuf::from("."));
    let config = load_config(&root, options.config.as_ref())?;
    let documentation = fs::read_to_string(&options.document)?;
    let (_, files) = read_project(&root, &config)?;

    let analysis = ProjectAnalysis::run(&files);
    let issues = validate_document(&documentation, &analysis, ValidationOptions::from(&config.analysis));
    let counts = IssueCounts::from_issues(&issues);

    if options.json {
        println!("{}", serde_json::to_string_pretty(&issues)?);
    } else {
        print_issues(&options.document, &issues, options.severity, &counts);
    }

    Ok(counts)
}

pub fn validate_document(
    documentation: &str,
    analysis: &ProjectAnalysis,
    options: ValidationOptions,
) -> Vec<ValidationIssue> {
    DocumentationValidator::for_project(analysis)
        .with_options(options)
        .validate(documentation)
}

fn print_issues(
    document: &Path,
    issues: &[ValidationIssue],
    min_severity: IssueSeverity,
    counts: &IssueCounts,
) {
    let out = Output::new();
    out.header(&format!("Validation of {}", document.display()));

    if issues.is_empty() {
        out.success("No issues found");
        return;
    }

    // Severity orders Error < Warning < Missing
    for issue in issues.iter().filter(|i| i.severity <= min_severity) {
        out.issue(issue);
    }
    println!();
    out.issue_summary(counts);
}
