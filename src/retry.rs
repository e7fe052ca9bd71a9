//! Bounded exponential backoff for transient request failures.
//!
//! Only [`SearchError::Transient`] is retried; auth and provider-shape
//! errors surface immediately. Both the attempt count and the total
//! elapsed wait are capped, so no query can stall a pipeline
//! indefinitely.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::error::{Result, SearchError};

/// Retry schedule for one provider client.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum attempts per request, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles each attempt.
    pub base_delay: Duration,
    /// Ceiling on any single backoff delay.
    pub max_delay: Duration,
    /// Hard ceiling on total time spent waiting between attempts.
    pub max_elapsed: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            max_elapsed: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Backoff delay before retry number `attempt` (1-based), with up to
    /// 20% random jitter so simultaneous pipelines do not synchronize.
    fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
            .min(self.max_delay);
        let jitter_budget = exp.as_millis() as u64 / 5;
        let jitter = if jitter_budget == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_budget)
        };
        exp + Duration::from_millis(jitter)
    }
}

/// Run `op`, retrying transient failures per `policy`.
///
/// `what` labels the operation in logs and in the final error message.
/// Returns the first non-transient error unchanged; transient exhaustion
/// returns a [`SearchError::Transient`] describing the spent budget.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let started = tokio::time::Instant::now();
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let reason = match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() => err.to_string(),
            Err(err) => return Err(err),
        };

        if attempt >= policy.max_attempts {
            return Err(SearchError::Transient(format!(
                "{what}: gave up after {attempt} attempts: {reason}"
            )));
        }

        let delay = policy.delay_for(attempt);
        if started.elapsed() + delay > policy.max_elapsed {
            return Err(SearchError::Transient(format!(
                "{what}: retry wait budget exhausted after {attempt} attempts: {reason}"
            )));
        }

        tracing::debug!(what, attempt, delay_ms = delay.as_millis() as u64, %reason, "retrying after transient failure");
        tokio::time::sleep(delay).await;
    }
}
