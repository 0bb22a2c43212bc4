//! Retry policy for relay collaborators

use crate::core::RetryConfig;
use crate::relay::RelayError;
use backoff::{backoff::Backoff, ExponentialBackoff, ExponentialBackoffBuilder};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Longest single delay between two attempts
pub const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Retrying stops once this much time has passed since the first attempt
pub const MAX_ELAPSED: Duration = Duration::from_secs(300);

/// How often a transient lookup or delivery failure is retried in-process.
///
/// The default is a single attempt: failures go straight back to the invoking
/// event infrastructure, which applies its own retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryConfig::default().into()
    }
}

impl From<RetryConfig> for RetryPolicy {
    fn from(config: RetryConfig) -> Self {
        Self::new(config.max_attempts, config.backoff_ms)
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_ms: u64) -> Self {
        Self {
            max_attempts,
            backoff_ms,
        }
    }

    /// Doubling delays from `backoff_ms`, capped at [`MAX_BACKOFF`] and
    /// exhausted after [`MAX_ELAPSED`]
    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(self.backoff_ms))
            .with_randomization_factor(0.0)
            .with_multiplier(2.0)
            .with_max_interval(MAX_BACKOFF)
            .with_max_elapsed_time(Some(MAX_ELAPSED))
            .build()
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, RelayError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RelayError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut backoff = self.backoff();
        let mut attempt = 1;

        loop {
            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("{} succeeded after {} attempts", what, attempt);
                    }
                    return Ok(value);
                }
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let Some(delay) = backoff.next_backoff() else {
                        warn!("{} gave up after {:?}: {}", what, MAX_ELAPSED, e);
                        return Err(e);
                    };
                    warn!(
                        "{} failed (attempt {}/{}), retrying in {}ms: {}",
                        what,
                        attempt,
                        max_attempts,
                        delay.as_millis(),
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
