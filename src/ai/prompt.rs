//! Prompt Builder
//!
//! Section-based prompt construction for the three calls of the refinement
//! loop: generation, critique and refinement. Every prompt carries the same
//! analysis context (central files, coupling, patterns, cycles), which is
//! rendered once per run into a [`PromptContext`].
//!
//! Output is fully deterministic for identical inputs so that prompts can be
//! used as cache keys.

use std::fmt::Write as _;

use crate::analyzer::ProjectAnalysis;
use crate::config::{OutputFormat, ProjectType};
use crate::constants::analysis::{CENTRAL_ELEMENTS_IN_PROMPT, MAX_CONTENT_PREVIEW};
use crate::types::{SourceFile, ValidationIssue, truncate_chars};

/// Sentence an approving critique opens with
pub const APPROVAL_OPENING: &str = "The documentation is excellent and requires no changes.";

/// Full approving critique the critique prompt shows as the expected shape: the
/// opening plus one sentence per focus area
pub const APPROVAL_EXAMPLE: &str = "The documentation is excellent and requires no changes. \
Technical accuracy: every signature is technically accurate and the overview reflects a proper separation of concerns. \
Completeness: it is comprehensive and covers all public functions and classes. \
Clarity: the prose is clear and concise. \
Structure: it is well-organized with clear sections. \
Usefulness: it is practical and provides helpful guidance for developers.";

/// Prompt section types
#[derive(Debug, Clone)]
pub enum PromptSection {
    /// Role definition with expertise area
    Role { expertise: String, task: String },
    /// Numbered objectives
    Objectives(Vec<String>),
    /// Raw text section with optional header
    Text {
        header: Option<String>,
        content: String,
    },
    /// Bulleted list under a header
    List { header: String, items: Vec<String> },
    /// Delimited block the model must treat as input, not instructions
    Quoted { header: String, content: String },
}

#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    sections: Vec<PromptSection>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn role(mut self, expertise: &str, task: &str) -> Self {
        self.sections.push(PromptSection::Role {
            expertise: expertise.to_string(),
            task: task.to_string(),
        });
        self
    }

    pub fn objectives(mut self, objectives: &[&str]) -> Self {
        self.sections.push(PromptSection::Objectives(
            objectives.iter().map(|o| o.to_string()).collect(),
        ));
        self
    }

    pub fn text(mut self, content: &str) -> Self {
        self.sections.push(PromptSection::Text {
            header: None,
            content: content.to_string(),
        });
        self
    }

    pub fn section(mut self, header: &str, content: &str) -> Self {
        self.sections.push(PromptSection::Text {
            header: Some(header.to_string()),
            content: content.to_string(),
        });
        self
    }

    pub fn list(mut self, header: &str, items: &[&str]) -> Self {
        self.sections.push(PromptSection::List {
            header: header.to_string(),
            items: items.iter().map(|i| i.to_string()).collect(),
        });
        self
    }

    pub fn quoted(mut self, header: &str, content: &str) -> Self {
        self.sections.push(PromptSection::Quoted {
            header: header.to_string(),
            content: content.to_string(),
        });
        self
    }

    /// Build the final prompt string
    pub fn build(self) -> String {
        let mut prompt = String::new();

        for section in self.sections {
            match section {
                PromptSection::Role { expertise, task } => {
                    let _ = writeln!(prompt, "You are a {} {}.\n", expertise, task);
                }
                PromptSection::Objectives(objectives) => {
                    for (i, obj) in objectives.iter().enumerate() {
                        let _ = writeln!(prompt, "{}. {}", i + 1, obj);
                    }
                    prompt.push('\n');
                }
                PromptSection::Text { header, content } => {
                    if let Some(h) = header {
                        let _ = writeln!(prompt, "{}:\n", h);
                    }
                    prompt.push_str(content.trim_end());
                    prompt.push_str("\n\n");
                }
                PromptSection::List { header, items } => {
                    let _ = writeln!(prompt, "{}:", header);
                    for item in items {
                        let _ = writeln!(prompt, "- {}", item);
                    }
                    prompt.push('\n');
                }
                PromptSection::Quoted { header, content } => {
                    let _ = writeln!(prompt, "{}:\n---\n{}\n---\n", header, content.trim());
                }
            }
        }

        prompt.trim_end().to_string()
    }
}

// =============================================================================
// Run Context
// =============================================================================

/// Prompt inputs that stay fixed for a whole run
#[derive(Debug, Clone)]
pub struct PromptContext {
    pub project_type: ProjectType,
    pub format: OutputFormat,
    pub file_summaries: String,
    pub doc_comments: String,
    pub analysis: String,
}

impl PromptContext {
    pub fn new(
        project_type: ProjectType,
        format: OutputFormat,
        files: &[SourceFile],
        analysis: &ProjectAnalysis,
    ) -> Self {
        Self {
            project_type,
            format,
            file_summaries: file_summaries(files),
            doc_comments: doc_comments(analysis),
            analysis: analysis_context(analysis),
        }
    }
}

/// One block per file: path, language and a preview capped at `MAX_CONTENT_PREVIEW` chars
pub fn file_summaries(files: &[SourceFile]) -> String {
    let mut out = String::new();
    for file in files {
        let preview = truncate_chars(&file.content, MAX_CONTENT_PREVIEW);
        let _ = writeln!(out, "File: {} ({})", file.path, file.language.as_str());
        out.push_str(preview.trim_end());
        if preview.len() < file.content.len() {
            out.push_str("\n[... truncated]");
        }
        out.push_str("\n\n");
    }
    out.trim_end().to_string()
}

/// Extracted doc comments as `path: Owner.name(params): first line`
pub fn doc_comments(analysis: &ProjectAnalysis) -> String {
    let lines: Vec<String> = analysis
        .extractions
        .iter()
        .flat_map(|extraction| extraction.definitions())
        .filter_map(|element| {
            let doc = element.doc.as_deref()?.lines().next()?.trim();
            (!doc.is_empty()).then(|| {
                let params = element.parameter_names().join(", ");
                format!(
                    "- {}: {}({}): {}",
                    element.file, element.qualified_name, params, doc
                )
            })
        })
        .collect();

    if lines.is_empty() {
        "No documentation comments found.".to_string()
    } else {
        lines.join("\n")
    }
}

/// Central files, coupling, detected patterns and dependency cycles
pub fn analysis_context(analysis: &ProjectAnalysis) -> String {
    if analysis.graph.edge_count() == 0 && analysis.patterns.is_empty() {
        return "No cross-file dependencies were detected.".to_string();
    }

    let mut out = String::new();

    let central = analysis
        .metrics
        .get_central_elements(CENTRAL_ELEMENTS_IN_PROMPT);
    if !central.is_empty() {
        out.push_str("Most referenced files:\n");
        for node in central {
            let _ = writeln!(
                out,
                "- {} (referenced by {} files, depends on {}, coupling {:.2})",
                node.path, node.in_degree, node.out_degree, node.coupling
            );
        }
        let _ = writeln!(
            out,
            "Average coupling: {:.2}\n",
            analysis.metrics.average_coupling()
        );
    }

    if !analysis.patterns.is_empty() {
        out.push_str("Detected architecture patterns:\n");
        for pattern in &analysis.patterns {
            let _ = writeln!(
                out,
                "- {} (confidence {:.2}): {}",
                pattern.kind.display_name(),
                pattern.confidence,
                pattern.description
            );
        }
        out.push('\n');
    }

    if !analysis.cycles.is_empty() {
        out.push_str("Dependency cycles:\n");
        for cycle in &analysis.cycles {
            let _ = writeln!(out, "- {}", cycle.join(" -> "));
        }
    }

    out.trim_end().to_string()
}

// =============================================================================
// Templates
// =============================================================================

const SECTION_OUTLINE: &str = "# Project Documentation

## 1. Project Overview
- Purpose and functionality of the project
- Primary technologies and frameworks used

## 2. Architecture and Design
- Overall architecture and component structure
- Key design patterns and how dependencies flow between modules

## 3. Key Components and Modules
For each major component: purpose, dependencies and relationships

## 4. Development Setup
- Prerequisites, installation and configuration

## 5. Deployment
- Build process and deployment options

## 6. File Documentation
For each significant file: path and purpose, then each key function or class
as a `### name(params)` heading followed by its behavior and return value

## 7. Best Practices and Guidelines
- Coding standards, performance and security considerations";

fn project_intro(project_type: ProjectType) -> &'static str {
    match project_type {
        ProjectType::Frontend => {
            "This is a frontend application. Cover frameworks, UI components, state \
             management, routing and styling, with a focus on component architecture."
        }
        ProjectType::Backend => {
            "This is a backend application. Cover API endpoints, data models, database \
             access, authentication, middleware and services, with a focus on data flow."
        }
        ProjectType::Mixed | ProjectType::Auto => {
            "This codebase has both client-side and server-side parts. Cover both sides \
             and how they communicate."
        }
    }
}

fn format_instruction(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Markdown => "Write the documentation in well-structured Markdown.",
        OutputFormat::Html => {
            "Write the documentation in well-structured Markdown; it will be rendered to HTML."
        }
    }
}

pub struct PromptTemplates;

impl PromptTemplates {
    /// First draft
    pub fn generation(ctx: &PromptContext) -> String {
        PromptBuilder::new()
            .role(
                "senior technical documentation writer",
                "documenting an existing codebase",
            )
            .text(project_intro(ctx.project_type))
            .text(format_instruction(ctx.format))
            .section("Structure the documentation with exactly these sections", SECTION_OUTLINE)
            .section("Code structure analysis", &ctx.analysis)
            .quoted("Code files", &ctx.file_summaries)
            .quoted("Extracted documentation comments", &ctx.doc_comments)
            .list(
                "Rules",
                &[
                    "Only document functions and classes that appear in the code files",
                    "Quote function signatures with their exact parameter names",
                    "Name the detected architecture patterns where they apply",
                    "Do not wrap the whole answer in a code block",
                    "Do not write placeholder or sample text",
                ],
            )
            .build()
    }

    /// Critique of the current draft
    pub fn critique(documentation: &str, ctx: &PromptContext) -> String {
        PromptBuilder::new()
            .role(
                "senior quality assurance engineer and technical documentation expert",
                "reviewing generated documentation",
            )
            .text("Critique the documentation below with a focus on:")
            .objectives(&[
                "Technical accuracy: is it correct given the code structure?",
                "Completeness: are sections, details or features missing?",
                "Clarity: is it clear, concise and easy to understand?",
                "Structure: is the organization logical and well formatted?",
                "Usefulness: will it help developers understand and use the codebase?",
            ])
            .section("Code structure analysis", &ctx.analysis)
            .quoted("Documentation to critique", documentation)
            .text("Provide a numbered list of specific, actionable feedback items.")
            .text(&format!(
                "If the documentation requires no changes, open with \"{}\" and then give one \
                 sentence per focus area saying why it already meets it, for example:\n{}",
                APPROVAL_OPENING, APPROVAL_EXAMPLE
            ))
            .build()
    }

    /// Revised draft addressing critique and validation findings
    pub fn refinement(
        documentation: &str,
        critique: &str,
        issues: &[ValidationIssue],
        ctx: &PromptContext,
    ) -> String {
        let issue_lines: Vec<String> = issues.iter().map(issue_line).collect();
        let issue_refs: Vec<&str> = issue_lines.iter().map(String::as_str).collect();

        let mut builder = PromptBuilder::new()
            .role(
                "senior technical writer",
                "refining documentation based on review feedback",
            )
            .quoted("Original documentation", documentation)
            .quoted("Critique to address", critique);

        if !issue_refs.is_empty() {
            builder = builder.list(
                "Validation issues found by comparing the documentation with the source",
                &issue_refs,
            );
        }

        builder
            .section("Code structure analysis", &ctx.analysis)
            .quoted("Code files (for reference)", &ctx.file_summaries)
            .list(
                "Instructions",
                &[
                    "Address every point in the critique",
                    "Fix every validation issue",
                    "Keep the overall structure and formatting",
                    "Return the COMPLETE refined documentation, not a diff",
                ],
            )
            .build()
    }
}

fn issue_line(issue: &ValidationIssue) -> String {
    match &issue.suggestion {
        Some(suggestion) => format!("{} (fix: {})", issue, suggestion),
        None => issue.to_string(),
    }
}

/// Strip a code fence wrapping the whole response
pub fn clean_response(content: &str) -> String {
    let mut result = content.trim();

    if result.starts_with("```")
        && let Some(first_newline) = result.find('\n')
    {
        let body = &result[first_newline + 1..];
        if let Some(inner) = body.trim_end().strip_suffix("```") {
            result = inner;
        }
    }

    result.trim().to_string()
}
