//! Minimum spacing between calls to a globally scarce collaborator
//!
//! One gate is owned by the orchestrator and shared by every company task.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::debug;

pub struct MinIntervalGate {
    interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl MinIntervalGate {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_call: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until at least `interval` has passed since the previous caller was let through.
    ///
    /// Callers queue on the lock, so they are released one at a time.
    pub async fn wait(&self) {
        let mut last_call = self.last_call.lock().await;
        if let Some(previous) = *last_call {
            let elapsed = previous.elapsed();
            if elapsed < self.interval {
                let remaining = self.interval - elapsed;
                debug!("rate gate: waiting {:?}", remaining);
                sleep(remaining).await;
            }
        }
        *last_call = Some(Instant::now());
    }
}
