//! AI Integration Layer
//!
//! Everything between the refinement loop and the text-generation service:
//! the provider abstraction, retry policy, response cache and prompt
//! templates.

pub mod cache;
pub mod prompt;
pub mod provider;
pub mod retry;

pub use cache::{CacheKey, CacheStats, RequestKind, ResponseCache};
pub use prompt::{PromptBuilder, PromptContext, PromptSection, PromptTemplates, clean_response};
pub use provider::{
    ErrorCategory, ErrorClassifier, LlmError, LlmProvider, LlmResponse, OllamaProvider,
    SharedProvider, TokenUsage, create_provider,
};
pub use retry::{CallError, RetryExhausted, RetryPolicy};
