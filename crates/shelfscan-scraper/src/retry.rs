//! Retry with exponential backoff.
//!
//! [`retry_with_backoff`] wraps a fallible async operation and retries
//! transient failures. Cancellation is honored before every attempt, so a
//! stop signal raised mid-backoff ends the run instead of burning the
//! remaining attempts.

use std::future::Future;

use shelfscan_core::settings::duration_from_secs;
use shelfscan_core::RetryPolicy;

use crate::error::ScrapeError;
use crate::stop::StopFlag;

/// Runs `operation` up to `policy.max_attempts` times in total.
///
/// The sleep before attempt `n + 1` is `backoff_factor.powi(n - 1)`
/// seconds, so with the default factor of 2 a three-attempt run sleeps
/// 1 s and then 2 s. There is no jitter here; request spacing is the
/// pacer's job. The last error is returned once attempts are exhausted,
/// and non-retryable errors are returned immediately.
///
/// A `max_attempts` of zero still makes one attempt.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    policy: RetryPolicy,
    stop: &StopFlag,
    label: &str,
    mut operation: F,
) -> Result<T, ScrapeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScrapeError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt: u32 = 0;
    loop {
        if stop.is_triggered() {
            return Err(ScrapeError::Cancelled);
        }
        attempt += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_retryable() || attempt >= max_attempts {
                    return Err(err);
                }
                let delay = duration_from_secs(
                    policy
                        .backoff_factor
                        .powi(i32::try_from(attempt - 1).unwrap_or(i32::MAX)),
                );
                tracing::warn!(
                    attempt,
                    max_attempts,
                    delay_secs = delay.as_secs_f64(),
                    error = %err,
                    "{label} failed, retrying after backoff"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
