//! Bounded retry for identity service calls.
//!
//! Transient failures (transport errors, timeouts) are retried with exponential
//! backoff: `initial_backoff * 2^attempt`, capped at `max_backoff`. Everything else is
//! returned on the first attempt, so "not logged in" is never retried.

use std::future::Future;
use std::time::Duration;

use crate::{config::GuardPolicy, error::IdentityError};

/// Runs `operation` until it succeeds, fails permanently, or `policy.max_retries`
/// retries have been spent on transient errors.
pub async fn with_retry<F, Fut, T>(
    policy: &GuardPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<T, IdentityError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, IdentityError>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::debug!(
                        operation = operation_name,
                        attempt = attempt + 1,
                        "identity call succeeded after retry",
                    );
                }
                return Ok(value);
            }
            Err(err) if err.is_transient() && attempt < policy.max_retries => {
                let delay = compute_backoff(policy, attempt);
                tracing::debug!(
                    operation = operation_name,
                    attempt = attempt + 1,
                    max_attempts = policy.max_retries + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient identity error, retrying after backoff",
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                if err.is_transient() {
                    tracing::warn!(
                        operation = operation_name,
                        attempts = attempt + 1,
                        error = %err,
                        "identity call retries exhausted",
                    );
                }
                return Err(err);
            }
        }
    }
}

/// Delay before retry number `attempt + 1`.
pub fn compute_backoff(policy: &GuardPolicy, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt);
    policy
        .initial_backoff
        .saturating_mul(factor)
        .min(policy.max_backoff)
}
