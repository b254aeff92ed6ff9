use tokio::time::Instant;

use common::{Clock, SystemClock};

/// Wall clock anchored once at creation and advanced by the runtime's
/// monotonic `Instant`, so stamps never step backwards when the system clock
/// is adjusted. Follows tokio's paused clock in tests.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeClock {
    anchor_ms: u64,
    anchor: Instant,
}

impl RuntimeClock {
    pub fn new() -> Self {
        Self::anchored_at(SystemClock.now_ms())
    }

    pub fn anchored_at(anchor_ms: u64) -> Self {
        Self {
            anchor_ms,
            anchor: Instant::now(),
        }
    }
}

impl Default for RuntimeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for RuntimeClock {
    fn now_ms(&self) -> u64 {
        self.anchor_ms + self.anchor.elapsed().as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn advances_with_runtime_time() {
        let clock = RuntimeClock::anchored_at(1_000);
        assert_eq!(clock.now_ms(), 1_000);
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(clock.now_ms(), 1_250);
    }
}
