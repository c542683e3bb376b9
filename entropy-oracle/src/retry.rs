//! Bounded retry with a fixed backoff.

use std::fmt::Display;
use std::future::Future;
use tracing::{debug, warn};

use crate::types::RetryPolicy;

/// Every attempt failed.
#[derive(Debug)]
pub struct RetryExhausted<E> {
    /// Attempts made
    pub attempts: u32,
    /// Error from the final attempt
    pub last_error: E,
}

/// Run `operation` until it succeeds or `policy.max_attempts` is reached,
/// sleeping `policy.backoff_ms` between attempts.
///
/// The delay is constant, not exponential. Dropping the returned future
/// during a backoff cancels the remaining attempts.
pub async fn with_fixed_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, RetryExhausted<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(attempt, "Operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if attempt >= max_attempts => {
                warn!(attempts = attempt, error = %e, "Retry policy exhausted");
                return Err(RetryExhausted {
                    attempts: attempt,
                    last_error: e,
                });
            }
            Err(e) => {
                debug!(
                    attempt,
                    max_attempts,
                    backoff_ms = policy.backoff_ms,
                    error = %e,
                    "Attempt failed, backing off"
                );
                tokio::time::sleep(policy.backoff()).await;
            }
        }
    }
}
