//! Refinement state machine
//!
//! The workflow is an explicit [`Phase`] plus an [`AgentState`] record, advanced
//! by the pure [`transition`] function. The controller performs the side
//! effects (generator calls, scoring) and reports their results as [`Event`]s.

use serde::{Deserialize, Serialize};

use crate::config::RefinementConfig;
use crate::constants::gate::{ERROR_PENALTY, WARNING_PENALTY};
use crate::types::{IssueCounts, ValidationIssue};

use super::critique::SemanticScore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Analyze,
    SemanticAnalyze,
    Generate,
    Critique,
    Decide,
    Refine,
    Accept,
    Abort,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Analyze => "ANALYZE",
            Self::SemanticAnalyze => "SEMANTIC_ANALYZE",
            Self::Generate => "GENERATE",
            Self::Critique => "CRITIQUE",
            Self::Decide => "DECIDE",
            Self::Refine => "REFINE",
            Self::Accept => "ACCEPT",
            Self::Abort => "ABORT",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Accept | Self::Abort)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TerminationReason {
    Accepted,
    MaxIterations,
    FatalError,
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Accepted => write!(f, "ACCEPTED"),
            Self::MaxIterations => write!(f, "MAX_ITERATIONS"),
            Self::FatalError => write!(f, "FATAL_ERROR"),
        }
    }
}

/// Result of scoring one draft: critique score plus validator findings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluation {
    pub score: SemanticScore,
    pub issues: Vec<ValidationIssue>,
}

/// Per-iteration summary kept for reporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    pub iteration: u32,
    pub overall: f64,
    pub confidence: f64,
    pub combined: f64,
    pub counts: IssueCounts,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentState {
    /// 1-based; never exceeds the gate's `max_iterations`
    pub iteration: u32,
    pub draft: Option<String>,
    pub critique: Option<String>,
    pub score: Option<SemanticScore>,
    pub combined_score: f64,
    pub issues: Vec<ValidationIssue>,
    pub termination: Option<TerminationReason>,
    pub failure: Option<String>,
    pub history: Vec<IterationRecord>,
}

impl AgentState {
    pub fn new() -> Self {
        Self {
            iteration: 1,
            ..Default::default()
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.termination.is_some()
    }

    /// Iterations whose draft reached DECIDE
    pub fn completed_iterations(&self) -> u32 {
        self.history.len() as u32
    }

    pub fn issue_counts(&self) -> IssueCounts {
        IssueCounts::from_issues(&self.issues)
    }

    fn terminate(&mut self, reason: TerminationReason) {
        self.termination = Some(reason);
    }
}

/// Outcome of the side effect performed in the current phase
#[derive(Debug, Clone)]
pub enum Event {
    Analyzed,
    SemanticAnalyzed,
    Drafted(String),
    Critiqued {
        critique: String,
        evaluation: Evaluation,
    },
    /// Phases without side effects (DECIDE, REFINE)
    Proceed,
    Failed(String),
}

impl Event {
    fn name(&self) -> &'static str {
        match self {
            Self::Analyzed => "analyzed",
            Self::SemanticAnalyzed => "semantic_analyzed",
            Self::Drafted(_) => "drafted",
            Self::Critiqued { .. } => "critiqued",
            Self::Proceed => "proceed",
            Self::Failed(_) => "failed",
        }
    }
}

// =============================================================================
// Quality Gate
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityGate {
    pub threshold: f64,
    pub max_iterations: u32,
}

impl QualityGate {
    pub fn new(threshold: f64, max_iterations: u32) -> Self {
        Self {
            threshold,
            max_iterations: max_iterations.max(1),
        }
    }

    pub fn from_config(config: &RefinementConfig) -> Self {
        Self::new(config.critique_threshold, config.max_iterations)
    }

    /// `clamp(overall - 0.2 * errors - 0.1 * warnings, 0, 1) * confidence`
    pub fn combined_score(&self, score: &SemanticScore, counts: &IssueCounts) -> f64 {
        let penalized = score.overall
            - ERROR_PENALTY * counts.errors as f64
            - WARNING_PENALTY * counts.warnings as f64;
        penalized.clamp(0.0, 1.0) * score.confidence
    }

    pub fn passes(&self, combined: f64) -> bool {
        combined >= self.threshold
    }
}

impl Default for QualityGate {
    fn default() -> Self {
        Self::from_config(&RefinementConfig::default())
    }
}

// =============================================================================
// Transition
// =============================================================================

/// Advance the workflow by one step.
///
/// Terminal phases absorb every event without touching the state. Any event
/// that does not belong to the current phase aborts the run.
pub fn transition(
    phase: Phase,
    mut state: AgentState,
    event: Event,
    gate: &QualityGate,
) -> (Phase, AgentState) {
    if phase.is_terminal() || state.is_terminated() {
        return (phase, state);
    }

    match (phase, event) {
        (_, Event::Failed(message)) => {
            state.failure = Some(message);
            state.terminate(TerminationReason::FatalError);
            (Phase::Abort, state)
        }
        (Phase::Analyze, Event::Analyzed) => (Phase::SemanticAnalyze, state),
        (Phase::SemanticAnalyze, Event::SemanticAnalyzed) => (Phase::Generate, state),
        (Phase::Generate, Event::Drafted(draft)) => {
            state.draft = Some(draft);
            (Phase::Critique, state)
        }
        (
            Phase::Critique,
            Event::Critiqued {
                critique,
                evaluation,
            },
        ) => {
            let counts = IssueCounts::from_issues(&evaluation.issues);
            let combined = gate.combined_score(&evaluation.score, &counts);
            state.history.push(IterationRecord {
                iteration: state.iteration,
                overall: evaluation.score.overall,
                confidence: evaluation.score.confidence,
                combined,
                counts,
            });
            state.critique = Some(critique);
            state.score = Some(evaluation.score);
            state.issues = evaluation.issues;
            state.combined_score = combined;
            (Phase::Decide, state)
        }
        (Phase::Decide, Event::Proceed) => {
            if gate.passes(state.combined_score) {
                state.terminate(TerminationReason::Accepted);
                (Phase::Accept, state)
            } else if state.iteration < gate.max_iterations {
                state.iteration += 1;
                (Phase::Refine, state)
            } else {
                state.terminate(TerminationReason::MaxIterations);
                (Phase::Accept, state)
            }
        }
        (Phase::Refine, Event::Proceed) => (Phase::Generate, state),
        (phase, event) => {
            state.failure = Some(format!(
                "unexpected event '{}' in phase {}",
                event.name(),
                phase
            ));
            state.terminate(TerminationReason::FatalError);
            (Phase::Abort, state)
        }
    }
}
