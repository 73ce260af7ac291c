//! Output stage
//!
//! Writes the final document of an ACCEPT-terminated run, plus a sibling
//! `<name>.meta.json` describing how it was produced. Failed or cancelled runs
//! never reach this module.

pub mod html;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::OutputFormat;
use crate::refinement::{RefinementOutcome, TerminationReason};
use crate::types::{Result, ValidationIssue};

pub use html::{markdown_to_html, render_page};

const DEFAULT_FILE_STEM: &str = "DOCUMENTATION";
const DEFAULT_DIR: &str = "docs";

/// Metadata record written next to the document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub iterations_used: u32,
    pub final_score: f64,
    pub termination_reason: TerminationReason,
    pub validation_issues: Vec<ValidationIssue>,
    pub model: String,
    pub generated_at: DateTime<Utc>,
}

impl RunMetadata {
    pub fn from_outcome(outcome: &RefinementOutcome, model: &str) -> Self {
        Self {
            iterations_used: outcome.iterations_used,
            final_score: outcome.final_score,
            termination_reason: outcome.termination,
            validation_issues: outcome.issues.clone(),
            model: model.to_string(),
            generated_at: Utc::now(),
        }
    }
}

/// Paths produced by one write
#[derive(Debug, Clone)]
pub struct WrittenOutput {
    pub document: PathBuf,
    pub metadata: PathBuf,
}

pub struct OutputWriter {
    format: OutputFormat,
    path: PathBuf,
}

impl OutputWriter {
    pub fn new(format: OutputFormat, path: impl Into<PathBuf>) -> Self {
        Self {
            format,
            path: path.into(),
        }
    }

    /// `<project>/docs/DOCUMENTATION.<ext>` unless an explicit path is given
    pub fn for_project(project_root: &Path, format: OutputFormat, explicit: Option<&Path>) -> Self {
        let path = explicit.map(Path::to_path_buf).unwrap_or_else(|| {
            project_root
                .join(DEFAULT_DIR)
                .join(format!("{}.{}", DEFAULT_FILE_STEM, format.extension()))
        });
        Self::new(format, path)
    }

    pub fn document_path(&self) -> &Path {
        &self.path
    }

    /// `DOCUMENTATION.md` → `DOCUMENTATION.meta.json`
    pub fn metadata_path(&self) -> PathBuf {
        let stem = self
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(DEFAULT_FILE_STEM);
        self.path.with_file_name(format!("{}.meta.json", stem))
    }

    pub fn render(&self, documentation: &str) -> String {
        match self.format {
            OutputFormat::Markdown => {
                let mut text = documentation.to_string();
                if !text.ends_with('\n') {
                    text.push('\n');
                }
                text
            }
            OutputFormat::Html => render_page(&document_title(documentation), documentation),
        }
    }

    pub fn write(&self, outcome: &RefinementOutcome, model: &str) -> Result<WrittenOutput> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        fs::write(&self.path, self.render(&outcome.documentation))?;

        let metadata_path = self.metadata_path();
        let metadata = RunMetadata::from_outcome(outcome, model);
        fs::write(&metadata_path, serde_json::to_string_pretty(&metadata)?)?;

        info!(
            path = %self.path.display(),
            format = %self.format,
            termination = %outcome.termination,
            "Documentation written"
        );

        Ok(WrittenOutput {
            document: self.path.clone(),
            metadata: metadata_path,
        })
    }
}

/// First heading of the document, or a generic title
fn document_title(markdown: &str) -> String {
    markdown
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("# "))
        .map(|title| title.trim().to_string())
        .unwrap_or_else(|| "Project Documentation".to_string())
}
