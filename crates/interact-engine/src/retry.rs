//! Generic retry-with-backoff wrapper
//!
//! The single composition point for partial-failure recovery: every
//! primitive handler is wrapped exactly once, and no primitive retries
//! itself independently. Intermediate attempt failures never surface to the
//! caller; exhaustion yields one retries-exhausted error wrapping the last
//! cause.

use std::future::Future;

use tracing::{debug, warn};

use crate::errors::InteractionError;
use crate::tempo::DelayGenerator;
use crate::types::RetryPolicy;

/// Backoff for attempt index `i`: a base freshly sampled from the policy
/// window on that attempt, scaled by `multiplier^i`.
///
/// The fresh draw per attempt is deliberate; fixing the base once and
/// scaling it deterministically would change observable timing.
pub fn scaled_backoff(sampled_base_ms: u64, multiplier: f64, attempt_index: u32) -> u64 {
    let scaled = sampled_base_ms as f64 * multiplier.powi(attempt_index as i32);
    scaled.round() as u64
}

/// Run `op` up to `policy.max_attempts` times, sleeping a randomized,
/// exponentially scaled backoff between attempts.
///
/// Returns on the first success with no further delay. Non-retryable
/// failures propagate immediately, bypassing the remaining budget.
pub async fn run<T, F, Fut>(
    tempo: &DelayGenerator,
    policy: &RetryPolicy,
    operation: &str,
    target: Option<&str>,
    op: F,
) -> Result<T, InteractionError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, InteractionError>>,
{
    run_counted(tempo, policy, operation, target, op)
        .await
        .map(|(value, _)| value)
}

/// Like [`run`], additionally reporting how many attempts were spent.
pub async fn run_counted<T, F, Fut>(
    tempo: &DelayGenerator,
    policy: &RetryPolicy,
    operation: &str,
    target: Option<&str>,
    mut op: F,
) -> Result<(T, u32), InteractionError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, InteractionError>>,
{
    let mut last_failure = None;

    for attempt_index in 0..policy.max_attempts {
        match op().await {
            Ok(value) => {
                if attempt_index > 0 {
                    debug!(
                        operation,
                        attempt = attempt_index + 1,
                        "operation recovered after retry"
                    );
                }
                return Ok((value, attempt_index + 1));
            }
            Err(err) => {
                if !err.is_retryable() {
                    return Err(err);
                }
                warn!(
                    operation,
                    attempt = attempt_index + 1,
                    max_attempts = policy.max_attempts,
                    error = %err,
                    "attempt failed"
                );
                if attempt_index + 1 < policy.max_attempts {
                    let base = tempo.sample(policy.base_delay)?;
                    let backoff =
                        scaled_backoff(base, policy.backoff_multiplier, attempt_index);
                    debug!(operation, backoff_ms = backoff, "backing off before retry");
                    tempo.sleep(backoff).await;
                }
                last_failure = Some(err);
            }
        }
    }

    Err(InteractionError::retries_exhausted(
        operation,
        target,
        policy.max_attempts,
        last_failure.as_ref(),
    ))
}
