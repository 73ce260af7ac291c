//! Unified Error Type System
//!
//! Centralized error types for the whole pipeline, plus the classification
//! used by the retry policy to separate transient from fatal call failures.
//!
//! ## Error Categories
//!
//! - **Transient**: Temporary server issues (retry)
//! - **RateLimit**: API rate limiting (wait and retry)
//! - **Network**: Connectivity issues (retry with backoff)
//! - **Auth**: Authentication failures (fail fast)
//! - **Unavailable**: Endpoint or model missing (fail fast)
//!
//! ## Propagation
//!
//! - `Analysis` is absorbed by the extractor and only logged
//! - `Configuration` and `Generation` escape the core
//! - Validation disagreements are data (`ValidationIssue`), never errors

use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// Why a single generator call failed; decides whether the retry policy tries again
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    RateLimit,
    Auth,
    Network,
    /// Endpoint or model missing
    Unavailable,
    BadRequest,
    /// Response body could not be decoded
    ParseError,
    Transient,
    Unknown,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RateLimit => "RATE_LIMIT",
            Self::Auth => "AUTH",
            Self::Network => "NETWORK",
            Self::Unavailable => "UNAVAILABLE",
            Self::BadRequest => "BAD_REQUEST",
            Self::ParseError => "PARSE_ERROR",
            Self::Transient => "TRANSIENT",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Auth, missing models and malformed requests fail the same way every time
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Auth | Self::Unavailable | Self::BadRequest)
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// LLM Error
// =============================================================================

/// One failed generator call
#[derive(Debug, Clone)]
pub struct LlmError {
    pub category: ErrorCategory,
    pub message: String,
    pub provider: Option<String>,
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.provider {
            Some(provider) => write!(f, "[{}:{}] {}", provider, self.category, self.message),
            None => write!(f, "[{}] {}", self.category, self.message),
        }
    }
}

impl std::error::Error for LlmError {}

impl LlmError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            provider: None,
        }
    }

    pub fn from_provider(provider: &str, category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            provider: Some(provider.to_string()),
            ..Self::new(category, message)
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.category.is_retryable()
    }
}

// =============================================================================
// Error Classifier
// =============================================================================

/// Message fragments per category, checked in order; the first hit wins
const MESSAGE_RULES: &[(ErrorCategory, &[&str])] = &[
    (ErrorCategory::RateLimit, &["rate limit", "429", "too many requests"]),
    (
        ErrorCategory::Auth,
        &["401", "403", "unauthorized", "forbidden", "api key"],
    ),
    (
        ErrorCategory::Network,
        &["connection", "connect", "dns", "timed out", "timeout", "unreachable"],
    ),
    (ErrorCategory::Unavailable, &["404", "not found", "no such model"]),
    (
        ErrorCategory::Transient,
        &["500", "502", "503", "504", "overloaded", "temporar"],
    ),
    (ErrorCategory::BadRequest, &["400", "bad request", "malformed"]),
    (ErrorCategory::ParseError, &["parse", "json", "decode"]),
];

/// Maps raw provider failures onto an [`ErrorCategory`]
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify from the failure text alone
    pub fn classify(message: &str, provider: &str) -> LlmError {
        let lower = message.to_lowercase();
        let category = MESSAGE_RULES
            .iter()
            .find(|(_, needles)| needles.iter().any(|n| lower.contains(n)))
            .map(|(category, _)| *category)
            .unwrap_or(ErrorCategory::Unknown);
        LlmError::from_provider(provider, category, message)
    }

    /// Classify from an HTTP status; preferred whenever a status is available
    pub fn classify_http_status(status: u16, message: &str, provider: &str) -> LlmError {
        let category = match status {
            429 => ErrorCategory::RateLimit,
            401 | 403 => ErrorCategory::Auth,
            404 => ErrorCategory::Unavailable,
            408 => ErrorCategory::Network,
            400 | 422 => ErrorCategory::BadRequest,
            500..=599 => ErrorCategory::Transient,
            _ => ErrorCategory::Unknown,
        };
        LlmError::from_provider(provider, category, message)
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum DocGateError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // -------------------------------------------------------------------------
    // Generation Service Errors
    // -------------------------------------------------------------------------
    /// Single failed call to the generation service
    #[error("LLM error: {0}")]
    Llm(LlmError),

    /// Call failed after exhausting retries; fatal for the run
    #[error("Generation failed after {iterations_completed} completed iteration(s): {message}")]
    Generation {
        message: String,
        iterations_completed: u32,
    },

    #[error("Timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    // -------------------------------------------------------------------------
    // Pipeline Errors
    // -------------------------------------------------------------------------
    /// Extraction or graph-building failure on a single file (never fatal)
    #[error("Analysis error in {path}: {message}")]
    Analysis { path: String, message: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Run cancelled after {iterations_completed} completed iteration(s)")]
    Cancelled { iterations_completed: u32 },
}

impl From<LlmError> for DocGateError {
    fn from(err: LlmError) -> Self {
        DocGateError::Llm(err)
    }
}

pub type Result<T> = std::result::Result<T, DocGateError>;

// =============================================================================
// Helper Functions
// =============================================================================

impl DocGateError {
    pub fn analysis(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Analysis {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Check if a failed call may succeed when attempted again
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Llm(e) => e.is_retryable(),
            Self::Timeout { .. } => true,
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::ConnectionReset
            ),
            _ => false,
        }
    }

    /// Completed iteration count for errors that abort a refinement run
    pub fn iterations_completed(&self) -> Option<u32> {
        match self {
            Self::Generation {
                iterations_completed,
                ..
            }
            | Self::Cancelled {
                iterations_completed,
            } => Some(*iterations_completed),
            _ => None,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::RateLimit.to_string(), "RATE_LIMIT");
        assert_eq!(ErrorCategory::Auth.to_string(), "AUTH");
        assert_eq!(ErrorCategory::Transient.to_string(), "TRANSIENT");
    }

    #[test]
    fn test_error_category_retryable() {
        assert!(ErrorCategory::RateLimit.is_retryable());
        assert!(ErrorCategory::Network.is_retryable());
        assert!(ErrorCategory::Transient.is_retryable());
        assert!(!ErrorCategory::Auth.is_retryable());
        assert!(!ErrorCategory::BadRequest.is_retryable());
        assert!(!ErrorCategory::Unavailable.is_retryable());
    }

    #[test]
    fn test_classify_network() {
        let err = ErrorClassifier::classify("Connection timed out after 30s", "ollama");
        assert_eq!(err.category, ErrorCategory::Network);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_classify_auth() {
        let err = ErrorClassifier::classify("401 Unauthorized", "ollama");
        assert_eq!(err.category, ErrorCategory::Auth);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_classify_missing_model() {
        let err = ErrorClassifier::classify("model 'llama9' not found", "ollama");
        assert_eq!(err.category, ErrorCategory::Unavailable);
    }

    #[test]
    fn test_classify_http_status() {
        let rate_limit = ErrorClassifier::classify_http_status(429, "Rate limited", "test");
        assert_eq!(rate_limit.category, ErrorCategory::RateLimit);

        let server_error = ErrorClassifier::classify_http_status(503, "busy", "test");
        assert_eq!(server_error.category, ErrorCategory::Transient);

        let bad = ErrorClassifier::classify_http_status(400, "bad", "test");
        assert!(!bad.is_retryable());
    }

    #[test]
    fn test_classify_falls_back_to_unknown() {
        let err = ErrorClassifier::classify("something odd happened", "ollama");
        assert_eq!(err.category, ErrorCategory::Unknown);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_llm_error_display() {
        let err = LlmError::from_provider("ollama", ErrorCategory::RateLimit, "Too many requests");
        assert_eq!(err.to_string(), "[ollama:RATE_LIMIT] Too many requests");
    }

    #[test]
    fn test_recoverable() {
        let transient: DocGateError = LlmError::new(ErrorCategory::Transient, "busy").into();
        assert!(transient.is_recoverable());

        let auth: DocGateError = LlmError::new(ErrorCategory::Auth, "denied").into();
        assert!(!auth.is_recoverable());

        assert!(!DocGateError::config("bad threshold").is_recoverable());
    }

    #[test]
    fn test_generation_error_reports_iterations() {
        let err = DocGateError::Generation {
            message: "[ollama:NETWORK] refused".to_string(),
            iterations_completed: 2,
        };
        assert_eq!(err.iterations_completed(), Some(2));
        assert!(err.to_string().contains("2 completed iteration"));
        assert!(err.to_string().contains("refused"));
    }
}
