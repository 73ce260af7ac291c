//! Text Generation Provider Abstraction
//!
//! Defines the `LlmProvider` trait the refinement loop talks to. Providers
//! return plain text plus usage and timing metadata; retries and caching are
//! layered on top by the caller, never inside a provider.

mod ollama;

pub use ollama::OllamaProvider;

// Re-export error types from centralized location
pub use crate::types::{ErrorCategory, ErrorClassifier, LlmError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::LlmConfig;
use crate::types::{DocGateError, Result};

// =============================================================================
// Response
// =============================================================================

/// Generated text plus what the service reported about producing it
#[derive(Debug, Clone, Default)]
pub struct LlmResponse {
    /// Trimmed
    pub content: String,
    pub usage: TokenUsage,
    /// Wall-clock time of the call
    pub elapsed: Duration,
    pub model: String,
}

impl LlmResponse {
    pub fn content_only(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }
}

/// Prompt and completion token counts; zero when the service does not report them
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.prompt_tokens.saturating_add(self.completion_tokens)
    }
}

/// Shared provider handle threaded through the pipeline context
pub type SharedProvider = Arc<dyn LlmProvider>;

// =============================================================================
// Provider Trait
// =============================================================================

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Single generation call; no retries
    async fn generate(&self, prompt: &str) -> Result<LlmResponse>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Model name currently in use
    fn model(&self) -> &str;

    /// Sampling temperature sent with every request
    fn temperature(&self) -> f32;

    /// Check whether the provider is reachable and the model is present
    async fn health_check(&self) -> Result<bool>;
}

/// Create a shared provider from configuration
pub fn create_provider(config: &LlmConfig) -> Result<SharedProvider> {
    match config.provider.as_str() {
        "ollama" => Ok(Arc::new(OllamaProvider::new(config)?)),
        other => Err(DocGateError::config(format!(
            "Unknown provider: {}. Supported: ollama",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_usage_total_saturates() {
        let usage = TokenUsage {
            prompt_tokens: u32::MAX,
            completion_tokens: 5,
        };
        assert_eq!(usage.total(), u32::MAX);
        assert_eq!(LlmResponse::content_only("x").usage.total(), 0);
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let config = LlmConfig {
            provider: "openai".to_string(),
            ..Default::default()
        };
        let result = create_provider(&config);
        assert!(matches!(result, Err(DocGateError::Configuration(_))));
    }

    #[test]
    fn test_create_ollama_provider() {
        let provider = create_provider(&LlmConfig::default()).unwrap();
        assert_eq!(provider.name(), "ollama");
        assert_eq!(provider.model(), LlmConfig::default().model);
    }
}
