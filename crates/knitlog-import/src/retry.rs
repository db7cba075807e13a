//! Retry with exponential backoff for page fetches.
//!
//! Only transient failures are retried; anything that would fail the same
//! way again is returned immediately.

use std::future::Future;
use std::time::Duration;

use crate::error::ImportError;

/// Returns `true` if `err` is a transient condition worth another attempt.
///
/// Retriable:
/// - [`ImportError::RateLimited`] (HTTP 429)
/// - [`ImportError::Http`] (connection reset, DNS hiccup, ...)
/// - [`ImportError::UnexpectedStatus`] with a 5xx status
///
/// Timeouts are not retried: the caller's timeout budget is already spent.
fn is_retriable(err: &ImportError) -> bool {
    match err {
        ImportError::RateLimited { .. } | ImportError::Http { .. } => true,
        ImportError::UnexpectedStatus { status, .. } => *status >= 500,
        ImportError::Timeout { .. }
        | ImportError::InvalidUrl { .. }
        | ImportError::ClientBuild(_) => false,
    }
}

/// Executes `operation`, retrying retriable errors up to `max_retries`
/// additional times. The wait before retry `n` (1-based) is
/// `backoff_base_secs * 2^(n-1)` seconds.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, ImportError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ImportError>>,
{
    let mut attempt = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if !is_retriable(&err) || attempt >= max_retries {
            return Err(err);
        }

        let delay_secs = backoff_base_secs.saturating_mul(1u64 << attempt.min(62));
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
