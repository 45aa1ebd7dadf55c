use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// How often a failing task is re-run before the run is given up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one.
    pub retries: usize,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            retries: 1,
            delay: Duration::from_secs(1),
        }
    }
}

/// Retries an async operation with configurable attempts and delays
///
/// # Parameters
/// - `operation`: Closure returning a future
/// - `policy`: Number of retry attempts (total runs = 1 initial + retries) and delay between them
///
/// # Returns
/// The successful result or the last error, together with the number of attempts made
pub async fn with_retry<F, Fut, T, E>(mut operation: F, policy: RetryPolicy) -> (Result<T, E>, usize)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(val) => return (Ok(val), attempt),
            Err(err) => {
                if attempt > policy.retries {
                    return (Err(err), attempt);
                }
                warn!(
                    "Attempt {}/{} failed: {}. Retrying...",
                    attempt,
                    policy.retries + 1,
                    err
                );
                attempt += 1;
                tokio::time::sleep(policy.delay).await;
            }
        }
    }
}
