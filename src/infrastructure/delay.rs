//! Randomized politeness pauses between page visits and downloads

use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomDelay {
    pub min: Duration,
    pub max: Duration,
}

impl RandomDelay {
    pub fn from_millis(min_ms: u64, max_ms: u64) -> Self {
        Self {
            min: Duration::from_millis(min_ms.min(max_ms)),
            max: Duration::from_millis(max_ms),
        }
    }

    pub fn none() -> Self {
        Self::from_millis(0, 0)
    }

    pub fn sample(&self) -> Duration {
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        if max <= min {
            return self.min;
        }
        Duration::from_millis(rand::rng().random_range(min..=max))
    }

    pub async fn pause(&self) {
        let wait = self.sample();
        if !wait.is_zero() {
            sleep(wait).await;
        }
    }
}
