//! Inter-request throttling.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Enforces a minimum spacing between consecutive calls.
///
/// Decoupled from the fetch logic so the probe's quota policy can be tuned or
/// mocked without touching network code. The first call passes immediately;
/// each subsequent call suspends for whatever remains of the interval.
pub struct IntervalGate {
    min_interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl IntervalGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: Mutex::new(None),
        }
    }

    /// Suspend until at least `min_interval` has passed since the previous
    /// `wait` returned.
    pub async fn wait(&self) {
        let mut last = self.last.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_call_passes_immediately() {
        let gate = IntervalGate::new(Duration::from_secs(1));
        let before = Instant::now();
        gate.wait().await;
        assert!(before.elapsed() < Duration::from_millis(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_spaces_consecutive_calls() {
        let gate = IntervalGate::new(Duration::from_secs(1));
        let start = Instant::now();
        gate.wait().await;
        gate.wait().await;
        gate.wait().await;
        // Two enforced gaps under paused time
        assert!(start.elapsed() >= Duration::from_secs(2));
    }
}
