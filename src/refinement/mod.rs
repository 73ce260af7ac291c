//! Quality-gated refinement
//!
//! - [`critique`]: free-text critique → multi-dimensional score
//! - [`state`]: explicit phases, agent state and the pure transition function
//! - [`controller`]: the loop that performs each phase's side effects

pub mod controller;
pub mod critique;
pub mod state;

pub use controller::{
    CancelFlag, DraftEvaluator, PipelineContext, RefinementController, RefinementOutcome,
    RunInput, SemanticEvaluator,
};
pub use critique::{CritiqueScorer, Dimension, SemanticScore, analyze};
pub use state::{
    AgentState, Evaluation, Event, IterationRecord, Phase, QualityGate, TerminationReason,
    transition,
};
