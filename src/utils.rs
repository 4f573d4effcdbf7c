use std::future::Future;
use tokio::time::{sleep, Duration};
use tracing::debug;

/// Sleeps `interval`, then runs `check`, until `check` yields a value or
/// `max_attempts` checks have been made.
///
/// `check` receives the 1-based attempt number. Returns `Ok(Some(value))` on
/// the first ready check, `Ok(None)` once the attempts are exhausted, and the
/// first error `check` returns without trying again.
pub async fn poll_until<T, E, Fut, F>(
    mut check: F,
    interval: Duration,
    max_attempts: u32,
) -> Result<Option<T>, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    for attempt in 1..=max_attempts {
        sleep(interval).await;
        if let Some(value) = check(attempt).await? {
            return Ok(Some(value));
        }
        debug!("Not ready yet (attempt {}/{})", attempt, max_attempts);
    }
    Ok(None)
}
