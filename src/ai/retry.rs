//! Retry Policy
//!
//! Wraps one external call in bounded retries with exponential backoff.
//! Each attempt's failure is sorted into [`CallError::Retryable`] or
//! [`CallError::Fatal`]; the policy only sleeps and retries on the former.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::RefinementConfig;
use crate::constants::retry::{BACKOFF_FACTOR, MAX_DELAY_SECS};
use crate::types::DocGateError;

/// Outcome tag for a failed attempt
#[derive(Debug)]
pub enum CallError {
    Retryable(DocGateError),
    Fatal(DocGateError),
}

impl CallError {
    pub fn into_inner(self) -> DocGateError {
        match self {
            CallError::Retryable(e) | CallError::Fatal(e) => e,
        }
    }
}

impl From<DocGateError> for CallError {
    fn from(err: DocGateError) -> Self {
        if err.is_recoverable() {
            CallError::Retryable(err)
        } else {
            CallError::Fatal(err)
        }
    }
}

/// Final failure of a retried call
#[derive(Debug)]
pub struct RetryExhausted {
    pub attempts: u32,
    pub last_error: DocGateError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(MAX_DELAY_SECS),
        }
    }

    pub fn from_config(config: &RefinementConfig) -> Self {
        Self::new(
            config.max_retries,
            Duration::from_secs(config.retry_base_delay_seconds),
        )
    }

    /// Policy that never waits, for tests and dry runs
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before retry `retry` (0-based): `base * 2^retry`, capped, without jitter
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = BACKOFF_FACTOR.saturating_pow(retry);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Run `operation` until it succeeds, fails fatally, or retries run out
    pub async fn run<T, F, Fut>(
        &self,
        operation: &str,
        mut call: F,
    ) -> std::result::Result<T, RetryExhausted>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, CallError>>,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match call().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation, attempt, "Call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(CallError::Fatal(e)) => {
                    warn!(operation, attempt, error = %e, "Call failed fatally");
                    return Err(RetryExhausted {
                        attempts: attempt,
                        last_error: e,
                    });
                }
                Err(CallError::Retryable(e)) => {
                    let retry = attempt - 1;
                    if retry >= self.max_retries {
                        warn!(operation, attempts = attempt, error = %e, "Retries exhausted");
                        return Err(RetryExhausted {
                            attempts: attempt,
                            last_error: e,
                        });
                    }

                    let delay = self.backoff(retry);
                    let delay = delay + random_jitter(delay);
                    warn!(
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient failure, retrying"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RefinementConfig::default())
    }
}

/// Up to 25% of the base delay
fn random_jitter(base_delay: Duration) -> Duration {
    let max_jitter_ms = (base_delay.as_millis() as u64) / 4;
    if max_jitter_ms == 0 {
        return Duration::ZERO;
    }
    let jitter_ms = rand::rng().random_range(0..max_jitter_ms);
    Duration::from_millis(jitter_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ErrorCategory, LlmError};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transient() -> DocGateError {
        LlmError::new(ErrorCategory::Transient, "503 busy").into()
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::new(5, Duration::from_secs(2));
        assert_eq!(policy.backoff(0), Duration::from_secs(2));
        assert_eq!(policy.backoff(1), Duration::from_secs(4));
        assert_eq!(policy.backoff(2), Duration::from_secs(8));
        assert_eq!(policy.backoff(10), Duration::from_secs(60));
        assert_eq!(policy.backoff(40), Duration::from_secs(60));
    }

    #[test]
    fn test_random_jitter() {
        let base = Duration::from_millis(1000);
        assert!(random_jitter(base) <= Duration::from_millis(250));
        assert_eq!(random_jitter(Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn test_classification() {
        assert!(matches!(CallError::from(transient()), CallError::Retryable(_)));
        assert!(matches!(
            CallError::from(DocGateError::config("bad")),
            CallError::Fatal(_)
        ));
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = RetryPolicy::immediate(3)
            .run("generate", move || async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(CallError::from(transient()))
                } else {
                    Ok("draft")
                }
            })
            .await;

        assert_eq!(result.unwrap(), "draft");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_reports_last_error() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: std::result::Result<(), _> = RetryPolicy::immediate(2)
            .run("critique", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(CallError::from(transient()))
            })
            .await;

        let exhausted = result.unwrap_err();
        assert_eq!(exhausted.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(exhausted.last_error.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_fatal_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: std::result::Result<(), _> = RetryPolicy::immediate(5)
            .run("generate", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(CallError::Fatal(DocGateError::config("401")))
            })
            .await;

        assert_eq!(result.unwrap_err().attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_retries_means_single_attempt() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: std::result::Result<(), _> = RetryPolicy::immediate(0)
            .run("generate", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(CallError::from(transient()))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
