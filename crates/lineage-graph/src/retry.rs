//! Bounded retry for transient graph failures.

use std::future::Future;
use std::time::Duration;

use crate::client::GraphError;

/// Run `op` up to `max_attempts` times (at least once).
///
/// Only transient errors are retried; the wait before attempt `n + 1` is
/// `backoff * n`.
pub async fn with_retry<T, F, Fut>(
    operation: &'static str,
    max_attempts: u32,
    backoff: Duration,
    mut op: F,
) -> Result<T, GraphError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GraphError>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < max_attempts => {
                tracing::warn!(
                    operation,
                    attempt,
                    max_attempts,
                    error = %e,
                    "Transient graph failure, retrying"
                );
                tokio::time::sleep(backoff * attempt).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
