//! Code Analyzer Module
//!
//! Everything derived from source before any text is generated:
//! - File discovery and project-type detection
//! - Per-file element extraction (tree-sitter with a regex fallback)
//! - File dependency graph, coupling and centrality
//! - Architecture pattern detection

pub mod extractor;
pub mod graph;
pub mod language;
pub mod metrics;
pub mod patterns;
pub mod scanner;

pub use extractor::{extract, extract_all};
pub use graph::{DependencyEdge, DependencyGraph, EdgeKind, GraphBuilder};
pub use language::{Language, detect_language};
pub use metrics::{GraphMetrics, NodeMetrics};
pub use patterns::{ArchitecturePattern, PatternDetector, PatternKind};
pub use scanner::{FileScanner, ScannedFile, detect_project_type, resolve_project_type};

use crate::types::{FileExtraction, SourceFile};

/// Output of the one-off analysis phases of a run
#[derive(Debug, Clone, Default)]
pub struct ProjectAnalysis {
    pub extractions: Vec<FileExtraction>,
    pub graph: DependencyGraph,
    pub metrics: GraphMetrics,
    pub patterns: Vec<ArchitecturePattern>,
    pub cycles: Vec<Vec<String>>,
}

impl ProjectAnalysis {
    /// Extract, build the graph, then run the structural analyses
    pub fn run(files: &[SourceFile]) -> Self {
        let extractions = extract_all(files);
        let graph = GraphBuilder::build(&extractions);
        Self::from_parts(extractions, graph)
    }

    pub fn from_parts(extractions: Vec<FileExtraction>, graph: DependencyGraph) -> Self {
        let metrics = GraphMetrics::analyze(&graph);
        let patterns = PatternDetector::new(&graph, &extractions).detect();
        let cycles = graph.cycles();
        Self {
            extractions,
            graph,
            metrics,
            patterns,
            cycles,
        }
    }

    pub fn element_count(&self) -> usize {
        self.extractions.iter().map(|e| e.elements.len()).sum()
    }
}
