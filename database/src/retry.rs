use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::sleep;
use tracing;

/// Runs `operation` until it succeeds or `max_retries` extra attempts have
/// failed, doubling the pause between attempts.
pub async fn retry_with_backoff<F, T, E>(
    what: &str,
    mut operation: F,
    max_retries: usize,
    initial_delay: Duration,
) -> Result<T, E>
where
    F: FnMut() -> Pin<Box<dyn Future<Output = Result<T, E>> + Send>>,
    E: std::fmt::Display,
{
    let mut delay = initial_delay;
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if attempt < max_retries => {
                attempt += 1;
                tracing::warn!(
                    "{} failed on attempt {}: {}. Retrying in {:?}...",
                    what,
                    attempt,
                    e,
                    delay
                );
                sleep(delay).await;
                delay *= 2;
            }
            Err(e) => return Err(e),
        }
    }
}
