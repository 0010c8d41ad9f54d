//! Exponential backoff retry logic for rewriter requests.

use std::future::Future;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use tracing::debug;

/// Configuration: 3 total attempts, base 1s, max 30s.
pub const MAX_ATTEMPTS: u32 = 3;
const INITIAL_INTERVAL_SECS: u64 = 1;
const MAX_INTERVAL_SECS: u64 = 30;

/// How many times to attempt a request and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_interval: Duration,
    pub max_interval: Duration,
}

impl RetryPolicy {
    /// A single attempt, no waiting.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Upper bound on the time spent across all attempts when each attempt
    /// is capped at `per_attempt`.
    pub fn worst_case(&self, per_attempt: Duration) -> Duration {
        let attempts = self.max_attempts.max(1);
        per_attempt * attempts + self.max_interval * (attempts - 1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            initial_interval: Duration::from_secs(INITIAL_INTERVAL_SECS),
            max_interval: Duration::from_secs(MAX_INTERVAL_SECS),
        }
    }
}

/// Retry an async operation with exponential backoff.
///
/// `attempt` is called up to `policy.max_attempts` times. Errors for which
/// `should_retry` returns false are returned immediately. On each retryable
/// failure the task sleeps for an exponentially increasing duration.
///
/// `wrap_exhausted` converts the last error into the appropriate
/// `RetriesExhausted` variant for the caller's error type. It is only applied
/// when more than one attempt was made.
pub async fn retry_with_backoff<T, E, Fut, F, P, W>(
    policy: RetryPolicy,
    mut attempt: F,
    should_retry: P,
    wrap_exhausted: W,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    W: FnOnce(E) -> E,
    E: std::fmt::Display,
{
    let mut backoff = ExponentialBackoff {
        initial_interval: policy.initial_interval,
        max_interval: policy.max_interval,
        max_elapsed_time: None,
        ..Default::default()
    };

    let max_attempts = policy.max_attempts.max(1);
    let mut attempts = 0;

    loop {
        attempts += 1;

        match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) if !should_retry(&e) => return Err(e),
            Err(e) if attempts >= max_attempts => {
                return Err(if attempts > 1 { wrap_exhausted(e) } else { e });
            }
            Err(e) => {
                debug!("Attempt {}/{} failed: {}", attempts, max_attempts, e);
                if let Some(wait_duration) = backoff.next_backoff() {
                    tokio::time::sleep(wait_duration).await;
                }
            }
        }
    }
}
