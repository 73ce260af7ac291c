//! Refinement Controller
//!
//! Drives the generate → critique → decide loop over the state machine in
//! [`super::state`]. Every generator call goes through the response cache,
//! and every cache miss goes through the retry policy.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use crate::ai::{
    CacheKey, CallError, PromptContext, PromptTemplates, RequestKind, ResponseCache,
    RetryExhausted, RetryPolicy, SharedProvider, clean_response,
};
use crate::analyzer::{DependencyGraph, GraphBuilder, ProjectAnalysis, extract_all};
use crate::config::{Config, OutputFormat, ProjectType};
use crate::types::{DocGateError, FileExtraction, Result, SourceFile, ValidationIssue};
use crate::verifier::{DocumentationValidator, ValidationOptions};

use super::critique::{CritiqueScorer, SemanticScore};
use super::state::{
    AgentState, Evaluation, Event, IterationRecord, Phase, QualityGate, TerminationReason,
    transition,
};

// =============================================================================
// Cancellation
// =============================================================================

/// Shared interrupt flag, checked before each draft is requested
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// =============================================================================
// Evaluation Seam
// =============================================================================

/// Scores a draft from its critique and the project facts
pub trait DraftEvaluator: Send + Sync {
    fn evaluate(&self, draft: &str, critique: &str, analysis: &ProjectAnalysis) -> Evaluation;
}

/// Critique scorer plus documentation validator
#[derive(Debug, Clone, Copy, Default)]
pub struct SemanticEvaluator {
    scorer: CritiqueScorer,
    options: ValidationOptions,
}

impl SemanticEvaluator {
    pub fn new(options: ValidationOptions) -> Self {
        Self {
            scorer: CritiqueScorer::new(),
            options,
        }
    }
}

impl DraftEvaluator for SemanticEvaluator {
    fn evaluate(&self, draft: &str, critique: &str, analysis: &ProjectAnalysis) -> Evaluation {
        let score = self.scorer.analyze(critique);
        let issues = DocumentationValidator::for_project(analysis)
            .with_options(self.options)
            .validate(draft);
        Evaluation { score, issues }
    }
}

// =============================================================================
// Context
// =============================================================================

/// Handles threaded through every component call of a run
#[derive(Clone)]
pub struct PipelineContext {
    pub provider: SharedProvider,
    pub cache: Arc<ResponseCache>,
    pub retry: RetryPolicy,
    pub gate: QualityGate,
    pub options: ValidationOptions,
    pub cancel: CancelFlag,
}

impl PipelineContext {
    pub fn new(provider: SharedProvider, config: &Config) -> Self {
        Self {
            provider,
            cache: Arc::new(ResponseCache::from_config(&config.cache)),
            retry: RetryPolicy::from_config(&config.refinement),
            gate: QualityGate::from_config(&config.refinement),
            options: ValidationOptions::from(&config.analysis),
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_gate(mut self, gate: QualityGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_cache(mut self, cache: Arc<ResponseCache>) -> Self {
        self.cache = cache;
        self
    }
}

// =============================================================================
// Outcome
// =============================================================================

/// Terminal snapshot handed to the output stage
#[derive(Debug, Clone)]
pub struct RefinementOutcome {
    pub documentation: String,
    pub iterations_used: u32,
    /// Combined score of the final draft
    pub final_score: f64,
    pub semantic_score: SemanticScore,
    pub termination: TerminationReason,
    pub issues: Vec<ValidationIssue>,
    pub history: Vec<IterationRecord>,
}

/// Inputs fixed for one run
#[derive(Debug, Clone, Copy)]
pub struct RunInput<'a> {
    pub files: &'a [SourceFile],
    pub project_type: ProjectType,
    pub format: OutputFormat,
}

// =============================================================================
// Controller
// =============================================================================

pub struct RefinementController {
    ctx: PipelineContext,
    evaluator: Box<dyn DraftEvaluator>,
}

impl RefinementController {
    pub fn new(ctx: PipelineContext) -> Self {
        let evaluator = Box::new(SemanticEvaluator::new(ctx.options));
        Self { ctx, evaluator }
    }

    pub fn with_evaluator(mut self, evaluator: impl DraftEvaluator + 'static) -> Self {
        self.evaluator = Box::new(evaluator);
        self
    }

    pub fn context(&self) -> &PipelineContext {
        &self.ctx
    }

    /// Run the loop to ACCEPT, or fail with `Generation` / `Cancelled`
    pub async fn run(&self, input: RunInput<'_>) -> Result<RefinementOutcome> {
        let gate = self.ctx.gate;
        let mut phase = Phase::Analyze;
        let mut state = AgentState::new();

        let mut parts: Option<(Vec<FileExtraction>, DependencyGraph)> = None;
        let mut analysis = ProjectAnalysis::default();
        let mut prompts: Option<PromptContext> = None;

        info!(
            files = input.files.len(),
            threshold = gate.threshold,
            max_iterations = gate.max_iterations,
            model = self.ctx.provider.model(),
            "Starting refinement run"
        );

        while !phase.is_terminal() {
            let event = match phase {
                Phase::Analyze => {
                    let extractions = extract_all(input.files);
                    let graph = GraphBuilder::build(&extractions);
                    debug!(
                        nodes = graph.node_count(),
                        edges = graph.edge_count(),
                        "Dependency graph built"
                    );
                    parts = Some((extractions, graph));
                    Event::Analyzed
                }
                Phase::SemanticAnalyze => {
                    let (extractions, graph) = parts.take().unwrap_or_default();
                    analysis = ProjectAnalysis::from_parts(extractions, graph);
                    debug!(
                        elements = analysis.element_count(),
                        patterns = analysis.patterns.len(),
                        cycles = analysis.cycles.len(),
                        "Structural analysis complete"
                    );
                    prompts = Some(PromptContext::new(
                        input.project_type,
                        input.format,
                        input.files,
                        &analysis,
                    ));
                    Event::SemanticAnalyzed
                }
                Phase::Generate => {
                    if self.ctx.cancel.is_cancelled() {
                        warn!(
                            completed = state.completed_iterations(),
                            "Cancelled before next draft"
                        );
                        return Err(DocGateError::Cancelled {
                            iterations_completed: state.completed_iterations(),
                        });
                    }
                    match &prompts {
                        Some(ctx) => self.draft(&state, ctx).await,
                        None => Event::Failed("prompt context missing".to_string()),
                    }
                }
                Phase::Critique => match (&prompts, &state.draft) {
                    (Some(ctx), Some(draft)) => {
                        let prompt = PromptTemplates::critique(draft, ctx);
                        match self.call(RequestKind::Critique, &prompt).await {
                            Ok(critique) => {
                                let evaluation = self.evaluator.evaluate(draft, &critique, &analysis);
                                Event::Critiqued {
                                    critique,
                                    evaluation,
                                }
                            }
                            Err(e) => Event::Failed(describe(&e)),
                        }
                    }
                    _ => Event::Failed("no draft to critique".to_string()),
                },
                Phase::Decide | Phase::Refine => Event::Proceed,
                Phase::Accept | Phase::Abort => break,
            };

            let scored = matches!(event, Event::Critiqued { .. });
            let (next_phase, next_state) = transition(phase, state, event, &gate);
            if scored && let Some(record) = next_state.history.last() {
                info!(
                    iteration = record.iteration,
                    score = record.overall,
                    confidence = record.confidence,
                    combined = record.combined,
                    errors = record.counts.errors,
                    warnings = record.counts.warnings,
                    missing = record.counts.missing,
                    "Iteration scored"
                );
            }
            debug!(from = %phase, to = %next_phase, "Phase transition");
            phase = next_phase;
            state = next_state;
        }

        let stats = self.ctx.cache.stats();
        debug!(
            hits = stats.hits,
            misses = stats.misses,
            evictions = stats.evictions,
            expirations = stats.expirations,
            hit_rate = stats.hit_rate(),
            "Response cache statistics"
        );

        self.finish(state)
    }

    async fn draft(&self, state: &AgentState, ctx: &PromptContext) -> Event {
        let (kind, prompt) = match (&state.draft, &state.critique) {
            (Some(draft), Some(critique)) => (
                RequestKind::Refine,
                PromptTemplates::refinement(draft, critique, &state.issues, ctx),
            ),
            _ => (RequestKind::Generate, PromptTemplates::generation(ctx)),
        };

        debug!(iteration = state.iteration, kind = kind.as_str(), "Requesting draft");
        match self.call(kind, &prompt).await {
            Ok(draft) => Event::Drafted(draft),
            Err(e) => Event::Failed(describe(&e)),
        }
    }

    /// Cached, retried generator call; the cleaned response text
    async fn call(
        &self,
        kind: RequestKind,
        prompt: &str,
    ) -> std::result::Result<String, RetryExhausted> {
        let key = CacheKey::new(
            kind,
            self.ctx.provider.model(),
            self.ctx.provider.temperature(),
            prompt,
        );
        let provider = &self.ctx.provider;
        let retry = &self.ctx.retry;

        let raw = self
            .ctx
            .cache
            .get_or_compute(&key, move || async move {
                retry
                    .run(kind.as_str(), move || async move {
                        provider
                            .generate(prompt)
                            .await
                            .map(|response| {
                                debug!(
                                    request = kind.as_str(),
                                    tokens = response.usage.total(),
                                    elapsed_ms = response.elapsed.as_millis() as u64,
                                    "Generator call completed"
                                );
                                response.content
                            })
                            .map_err(CallError::from)
                    })
                    .await
            })
            .await?;

        Ok(clean_response(&raw))
    }

    fn finish(&self, state: AgentState) -> Result<RefinementOutcome> {
        let completed = state.completed_iterations();
        match state.termination {
            Some(termination @ (TerminationReason::Accepted | TerminationReason::MaxIterations)) => {
                info!(
                    termination = %termination,
                    iterations = state.iteration,
                    final_score = state.combined_score,
                    "Refinement finished"
                );
                Ok(RefinementOutcome {
                    documentation: state.draft.unwrap_or_default(),
                    iterations_used: state.iteration,
                    final_score: state.combined_score,
                    semantic_score: state.score.unwrap_or_default(),
                    termination,
                    issues: state.issues,
                    history: state.history,
                })
            }
            _ => {
                let message = state
                    .failure
                    .unwrap_or_else(|| "refinement stopped without a result".to_string());
                warn!(completed, error = %message, "Refinement aborted");
                Err(DocGateError::Generation {
                    message,
                    iterations_completed: completed,
                })
            }
        }
    }
}

fn describe(exhausted: &RetryExhausted) -> String {
    format!(
        "gave up after {} attempt(s): {}",
        exhausted.attempts, exhausted.last_error
    )
}
