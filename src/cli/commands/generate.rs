//! Generate Command
//!
//! Scans a project, runs the quality-gated refinement loop and writes the
//! accepted document.
//!
//! Usage:
//!   docgate generate [DIR] [--output PATH] [--format markdown|html]
//!                    [--model NAME] [--threshold F] [--max-iterations N]

use std::path::PathBuf;

use tokio::runtime::Runtime;
use tracing::{info, warn};

use crate::ai::create_provider;
use crate::cli::ui::output::Output;
use crate::cli::{load_config, read_project};
use crate::config::{Config, OutputFormat};
use crate::output::OutputWriter;
use crate::refinement::{CancelFlag, PipelineContext, RefinementController, RunInput};
use crate::types::{IssueCounts, Result};

#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub path: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub format: Option<OutputFormat>,
    pub model: Option<String>,
    pub threshold: Option<f64>,
    pub max_iterations: Option<u32>,
    pub quiet: bool,
}

impl GenerateOptions {
    /// Flags override every other configuration source
    fn apply(&self, config: &mut Config) -> Result<()> {
        if let Some(format) = self.format {
            config.output.format = format;
        }
        if let Some(output) = &self.output {
            config.output.path = Some(output.clone());
        }
        if let Some(model) = &self.model {
            config.llm.model = model.clone();
        }
        if let Some(threshold) = self.threshold {
            config.refinement.critique_threshold = threshold;
        }
        if let Some(max_iterations) = self.max_iterations {
            config.refinement.max_iterations = max_iterations;
        }
        config.validate()
    }
}

pub fn run(options: GenerateOptions) -> Result<()> {
    let root = options.path.clone().unwrap_or_else(|| PathBuf::from("."));
    let mut config = load_config(&root, options.config.as_ref())?;
    options.apply(&mut config)?;

    let out = Output::quiet(options.quiet);
    let (project_type, files) = read_project(&root, &config)?;

    out.header("docgate generate");
    out.field("Project", root.display());
    out.field("Project type", project_type);
    out.field("Files", files.len());
    out.field("Model", &config.llm.model);
    out.field("Threshold", config.refinement.critique_threshold);
    out.field("Max iterations", config.refinement.max_iterations);

    let provider = create_provider(&config.llm)?;
    let cancel = CancelFlag::new();
    let ctx = PipelineContext::new(provider.clone(), &config).with_cancel(cancel.clone());
    let controller = RefinementController::new(ctx);

    let rt = Runtime::new()?;
    let outcome = rt.block_on(async {
        let interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, stopping after the current iteration");
                interrupt.cancel();
            }
        });

        match provider.health_check().await {
            Ok(true) => info!(model = provider.model(), "Provider ready"),
            Ok(false) => warn!(
                model = provider.model(),
                "Model not listed by the provider; generation may fail"
            ),
            Err(e) => warn!(error = %e, "Provider health check failed"),
        }

        controller
            .run(RunInput {
                files: &files,
                project_type,
                format: config.output.format,
            })
            .await
    })?;

    let writer = OutputWriter::for_project(
        &root,
        config.output.format,
        config.output.path.as_deref(),
    );
    let written = writer.write(&outcome, &config.llm.model)?;

    out.section("Result");
    out.field("Termination", outcome.termination);
    out.field("Iterations", outcome.iterations_used);
    out.field("Final score", format!("{:.3}", outcome.final_score));
    for record in &outcome.history {
        out.field(
            &format!("  iteration {}", record.iteration),
            format!(
                "score {:.3} × confidence {:.2} → {:.3}",
                record.overall, record.confidence, record.combined
            ),
        );
    }

    if !outcome.issues.is_empty() {
        out.section("Validation issues");
        for issue in &outcome.issues {
            out.issue(issue);
        }
        out.issue_summary(&IssueCounts::from_issues(&outcome.issues));
    }

    out.success(&format!("Documentation written to {}", written.document.display()));
    out.info(&format!("Metadata: {}", written.metadata.display()));
    Ok(())
}
