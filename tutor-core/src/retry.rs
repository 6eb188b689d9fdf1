//! Bounded-retry helper with exponential backoff.
//!
//! Retry behavior is configuration, not code: the answerer receives a
//! [`RetryPolicy`] so production runs 1s/2s/4s while tests run zero-delay.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TutorError};

/// A bounded exponential-backoff retry policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryPolicy {
    /// Number of retries after the initial attempt.
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds.
    pub base_delay_ms: u64,
    /// Multiplier applied to the delay after each retry.
    pub multiplier: f64,
    /// Upper bound on any single delay, in milliseconds.
    pub max_delay_ms: u64,
    /// Add up to 25% random jitter to each delay.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 3, base_delay_ms: 1000, multiplier: 2.0, max_delay_ms: 8000, jitter: false }
    }
}

impl RetryPolicy {
    /// A policy with no delays, for tests.
    pub fn immediate(max_retries: u32) -> Self {
        Self { max_retries, base_delay_ms: 0, multiplier: 1.0, max_delay_ms: 0, jitter: false }
    }

    /// Compute the backoff delay for the given zero-based attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.base_delay_ms as f64 * self.multiplier.powi(attempt as i32);
        let capped = base.min(self.max_delay_ms as f64) as u64;
        let with_jitter = if self.jitter {
            capped + (capped as f64 * 0.25 * pseudo_random()) as u64
        } else {
            capped
        };
        Duration::from_millis(with_jitter)
    }
}

/// Cheap sub-second entropy for jitter; avoids pulling in the rand crate.
fn pseudo_random() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    (nanos % 1000) as f64 / 1000.0
}

/// Execute an async operation, retrying transient errors per the policy.
///
/// Retries only errors for which [`TutorError::is_retryable`] holds;
/// permanent errors (validation, parse, config) return immediately.
/// The final transient error is returned once the policy is exhausted —
/// callers decide how to surface it (the answerer maps it to
/// [`TutorError::GenerationUnavailable`]).
pub async fn with_retry<F, Fut, T>(policy: &RetryPolicy, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if !e.is_retryable() || attempt >= policy.max_retries {
                    return Err(e);
                }
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    attempt = attempt + 1,
                    max = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "retrying after transient error"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
