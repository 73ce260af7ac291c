//! Analyze Command
//!
//! Runs extraction, the dependency graph and the structural analyses without
//! calling the generator. Useful for checking what the prompts will carry.

use std::path::PathBuf;

use serde::Serialize;

use crate::analyzer::{ArchitecturePattern, NodeMetrics, ProjectAnalysis};
use crate::cli::ui::output::Output;
use crate::cli::{load_config, read_project};
use crate::config::ProjectType;
use crate::types::Result;

#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions {
    pub path: Option<PathBuf>,
    pub config: Option<PathBuf>,
    /// Central files to list
    pub top: usize,
    pub json: bool,
    pub project_type: Option<ProjectType>,
}

/// Machine-readable form of the analysis
#[derive(Debug, Serialize)]
pub struct AnalysisReport<'a> {
    pub project_type: ProjectType,
    pub files: usize,
    pub elements: usize,
    pub edges: usize,
    pub average_coupling: f64,
    pub central: &'a [NodeMetrics],
    pub patterns: &'a [ArchitecturePattern],
    pub cycles: &'a [Vec<String>],
}

impl<'a> AnalysisReport<'a> {
    pub fn new(
        project_type: ProjectType,
        files: usize,
        analysis: &'a ProjectAnalysis,
        top: usize,
    ) -> Self {
        Self {
            project_type,
            files,
            elements: analysis.element_count(),
            edges: analysis.graph.edge_count(),
            average_coupling: analysis.metrics.average_coupling(),
            central: analysis.metrics.get_central_elements(top),
            patterns: &analysis.patterns,
            cycles: &analysis.cycles,
        }
    }
}

pub fn run(options: AnalyzeOptions) -> Result<()> {
    let root = options.path.clone().unwrap_or_else(|| PathBuf::from("."));
    let mut config = load_config(&root, options.config.as_ref())?;
    if let Some(project_type) = options.project_type {
        config.analysis.project_type = project_type;
    }
    let (project_type, files) = read_project(&root, &config)?;

    let analysis = ProjectAnalysis::run(&files);
    let report = AnalysisReport::new(project_type, files.len(), &analysis, options.top);

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_report(&report);
    Ok(())
}

fn print_report(report: &AnalysisReport<'_>) {
    let out = Output::new();

    out.header("Project analysis");
    out.field("Project type", report.project_type);
    out.field("Files", report.files);
    out.field("Elements", report.elements);
    out.field("Dependency edges", report.edges);
    out.field("Avg coupling", format!("{:.3}", report.average_coupling));

    out.section("Most central files");
    if report.central.is_empty() {
        out.info("No cross-file dependencies were detected.");
    }
    for (rank, node) in report.central.iter().enumerate() {
        println!(
            "  {:>2}. {:<48} in {:>2}  out {:>2}  coupling {:.2}  centrality {:.2}",
            rank + 1,
            node.path,
            node.in_degree,
            node.out_degree,
            node.coupling,
            node.centrality
        );
    }

    out.section("Architecture patterns");
    if report.patterns.is_empty() {
        out.info("No known patterns matched.");
    }
    for pattern in report.patterns {
        println!(
            "  {:<24} confidence {:.2}  {}",
            pattern.kind.display_name(),
            pattern.confidence,
            pattern.description
        );
    }

    if !report.cycles.is_empty() {
        out.section("Dependency cycles");
        for cycle in report.cycles {
            out.warning(&cycle.join(" → "));
        }
    }
}
