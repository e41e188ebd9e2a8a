//! Bounded retry with exponential backoff for transient fetch errors.
//!
//! Retry policy is an explicit parameter of every adapter rather than ambient
//! behavior, so tests can assert exact attempt counts.

use std::future::Future;
use std::time::Duration;

use crate::error::IngestError;

/// Executes `operation`, retrying transient errors with exponential backoff.
///
/// On a transient error ([`IngestError::is_transient`]) the function sleeps
/// for `backoff_base_secs * 2^attempt` seconds and tries again, up to
/// `max_retries` additional attempts after the first. Rate-limited responses
/// sleep for the server-supplied `Retry-After` duration instead of the
/// computed backoff. Non-transient errors return immediately. With
/// `max_retries = 3` the operation runs at most four times.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, IngestError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, IngestError>>,
{
    let mut attempt = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_transient() || attempt >= max_retries {
                    return Err(err);
                }
                err
            }
        };

        let delay_secs = match &err {
            IngestError::RateLimited {
                retry_after_secs, ..
            } => *retry_after_secs,
            // Cap the shift so extreme configs cannot overflow the multiplier.
            _ => backoff_base_secs.saturating_mul(1u64 << attempt.min(62)),
        };
        tracing::warn!(
            attempt,
            max_retries,
            delay_secs,
            error = %err,
            "transient fetch error, retrying after backoff"
        );
        tokio::time::sleep(Duration::from_secs(delay_secs)).await;
        attempt += 1;
    }
}
