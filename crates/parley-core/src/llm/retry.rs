//! Bounded retry around provider calls.
//!
//! Failed attempts are retried after a fixed delay, up to a total attempt
//! count. Errors that cannot succeed on a repeat (bad credentials, malformed
//! request, context overflow) are returned at once.

use std::future::Future;
use std::time::Duration;

use parley_types::config::RetryConfig;
use parley_types::llm::LlmError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }

    /// A single attempt, no waiting.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(5))
    }
}

impl From<RetryConfig> for RetryPolicy {
    fn from(config: RetryConfig) -> Self {
        Self::new(config.attempts, Duration::from_secs(config.delay_secs))
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or runs out
/// of attempts. The last error is returned.
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T, LlmError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_retryable() || attempt >= attempts => return Err(err),
            Err(err) => {
                tracing::warn!(
                    attempt,
                    attempts,
                    delay_ms = policy.delay.as_millis() as u64,
                    error = %err,
                    "completion failed, retrying"
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
        }
    }
}
