//! Retry with exponential backoff and random jitter
//!
//! One policy object parameterizes both page renders and file downloads.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use rand::Rng;
use tokio::time::sleep;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay after the first failure; doubles after each further failure
    pub base_delay: Duration,
    /// Upper bound of the random extra delay added to every backoff
    pub max_jitter: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_jitter: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_jitter,
        }
    }

    /// A single attempt, no waiting
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    /// Backoff before the next attempt after `failed_attempts` failures (1-based)
    pub fn backoff(&self, failed_attempts: u32) -> Duration {
        let exponent = failed_attempts.saturating_sub(1).min(16);
        let base = self.base_delay.saturating_mul(1u32 << exponent);
        let jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
        };
        base + jitter
    }

    /// Run `operation` until it succeeds or the attempts are exhausted.
    ///
    /// The error of the last attempt is returned.
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= self.max_attempts => {
                    return Err(e.context(format!(
                        "{} failed after {} attempt(s)",
                        label, self.max_attempts
                    )));
                }
                Err(e) => {
                    let wait = self.backoff(attempt);
                    warn!(
                        "⚠️ {} failed (attempt {}/{}): {:#}, retrying in {:?}",
                        label, attempt, self.max_attempts, e, wait
                    );
                    sleep(wait).await;
                    attempt += 1;
                }
            }
        }
    }
}
