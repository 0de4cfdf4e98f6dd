//! Per-host request spacing shared by every connector in a run.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

/// Spaces requests to the same upstream host by a fixed delay.
///
/// A caller reserves the next free slot for its host under the lock and then
/// sleeps outside it, so waits on one host never hold up another.
#[derive(Debug)]
pub struct RequestPacer {
    delay: Duration,
    jitter: bool,
    next_slot: Mutex<HashMap<String, Instant>>,
}

impl RequestPacer {
    #[must_use]
    pub fn new(delay: Duration, jitter: bool) -> Self {
        Self {
            delay,
            jitter,
            next_slot: Mutex::new(HashMap::new()),
        }
    }

    /// A pacer that never waits.
    #[must_use]
    pub fn unpaced() -> Self {
        Self::new(Duration::ZERO, false)
    }

    /// Wait until `host` may receive another request.
    pub async fn wait(&self, host: &str) {
        if self.delay.is_zero() {
            return;
        }

        let slot = {
            let mut slots = self
                .next_slot
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let now = Instant::now();
            let slot = slots
                .get(host)
                .copied()
                .filter(|next| *next > now)
                .unwrap_or(now);
            slots.insert(host.to_string(), slot + self.spacing());
            slot
        };

        tokio::time::sleep_until(slot).await;
    }

    fn spacing(&self) -> Duration {
        if self.jitter {
            // +/-25% around the configured delay.
            self.delay.mul_f64(rand::random::<f64>() * 0.5 + 0.75)
        } else {
            self.delay
        }
    }
}
