//! docgate - Quality-Gated Documentation Generator
//!
//! Generates documentation for a codebase by repeatedly drafting, critiquing
//! and refining it through a text-generation service until a quality gate is
//! met. The gate combines a semantic score of the critique with issues found
//! by cross-checking the draft against facts extracted from source.
//!
//! ## Pipeline
//!
//! 1. [`analyzer`]: file discovery, element extraction (tree-sitter with a
//!    regex fallback), file dependency graph, coupling/centrality and
//!    architecture pattern detection
//! 2. [`ai`]: provider abstraction, retry policy, response cache, prompts
//! 3. [`refinement`]: critique scorer, explicit state machine and controller
//! 4. [`verifier`]: documentation claims checked against extracted elements
//! 5. [`output`]: markdown/HTML writer with a metadata sidecar
//!
//! ## Quick Start
//!
//! ```ignore
//! use docgate::{Config, PipelineContext, RefinementController, RunInput};
//! use docgate::ai::create_provider;
//!
//! let config = Config::default();
//! let provider = create_provider(&config.llm)?;
//! let controller = RefinementController::new(PipelineContext::new(provider, &config));
//! let outcome = controller.run(RunInput { files: &files, project_type, format }).await?;
//! ```

pub mod ai;
pub mod analyzer;
pub mod cli;
pub mod config;
pub mod constants;
pub mod output;
pub mod refinement;
pub mod types;
pub mod verifier;

// =============================================================================
// Core Re-exports
// =============================================================================

pub use config::{Config, ConfigLoader, OutputFormat, ProjectType};
pub use types::{DocGateError, Result};

pub use analyzer::{FileScanner, ProjectAnalysis};
pub use output::{OutputWriter, RunMetadata};
pub use refinement::{
    CancelFlag, PipelineContext, RefinementController, RefinementOutcome, RunInput,
    SemanticScore, TerminationReason,
};
pub use verifier::{DocumentationValidator, validate};
