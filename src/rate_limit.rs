//! Per-provider request pacing.
//!
//! Each provider gets one [`RateLimiter`] per run; every network call for
//! that provider acquires a permit first. Grants are serialized on a
//! single clock behind a mutex, so concurrent acquirers cannot compress
//! the interval between consecutive requests.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Enforces a minimum interval between consecutive grants.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_grant: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Create a limiter with the given minimum inter-request interval.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_grant: Mutex::new(None),
        }
    }

    /// Wait until the pacing interval has elapsed since the previous
    /// grant, then take the next slot.
    ///
    /// The internal lock is held across the wait, which is what
    /// serializes concurrent acquirers: each one observes the grant time
    /// written by its predecessor. Requests are never dropped or
    /// reordered relative to lock acquisition order.
    pub async fn acquire(&self) {
        let mut last = self.last_grant.lock().await;
        if let Some(prev) = *last {
            let ready_at = prev + self.min_interval;
            if Instant::now() < ready_at {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// The configured minimum interval.
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}
