use std::fmt::Display;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Delays between attempts of a retried request.
///
/// Each entry of `base_delays` is waited once, then `final_delay` is waited
/// `final_retries` more times. The total number of attempts is therefore
/// `base_delays.len() + final_retries + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base_delays: Vec<Duration>,
    pub final_retries: usize,
    pub final_delay: Duration,
}

impl Default for RetryPolicy {
    /// 1s, 2s, 4s, then 8s twice.
    fn default() -> Self {
        Self {
            base_delays: [1, 2, 4].map(Duration::from_secs).to_vec(),
            final_retries: 2,
            final_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.base_delays.len() + self.final_retries + 1
    }

    fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        self.base_delays
            .iter()
            .copied()
            .chain(std::iter::repeat_n(self.final_delay, self.final_retries))
    }
}

/// Retry an async operation following `policy`.
///
/// Returns the first success, or the error of the last attempt.
pub async fn retry_with_backoff<F, Fut, T, E>(mut operation: F, policy: &RetryPolicy) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: Display,
{
    let attempts = policy.attempts();

    for (i, delay) in policy.delays().enumerate() {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                warn!(
                    "Request failed (attempt {}/{attempts}): {e}. Retrying after {delay:?}...",
                    i + 1
                );
                sleep(delay).await;
            }
        }
    }

    operation().await
}
