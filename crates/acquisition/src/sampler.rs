use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tracing::debug;

use common::{AcquisitionError, Clock, LatestValueCache, RecordingBuffer, SharedDiagnostics};

/// Snapshots the latest-value cache into the recording buffer once per
/// period, independent of how often the source itself fires.
pub struct FixedRateSampler {
    period: Duration,
    cache: LatestValueCache,
    buffer: RecordingBuffer,
    clock: Arc<dyn Clock>,
    diagnostics: Arc<SharedDiagnostics>,
    handle: Option<JoinHandle<()>>,
}

impl FixedRateSampler {
    pub fn new(
        period: Duration,
        cache: LatestValueCache,
        buffer: RecordingBuffer,
        clock: Arc<dyn Clock>,
        diagnostics: Arc<SharedDiagnostics>,
    ) -> Self {
        Self {
            period,
            cache,
            buffer,
            clock,
            diagnostics,
            handle: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Opens the buffer and spawns the timer task on the current runtime.
    /// Does nothing if already running.
    pub fn start(&mut self) -> Result<(), AcquisitionError> {
        if self.handle.is_some() {
            return Ok(());
        }
        if self.period.is_zero() {
            return Err(AcquisitionError::InvalidPeriod(0.0));
        }
        let runtime = Handle::try_current().map_err(|_| AcquisitionError::TimerUnavailable)?;

        let generation = self.buffer.open();
        debug!(generation, period_ms = self.period.as_secs_f64() * 1000.0, "sampler started");
        self.handle = Some(runtime.spawn(sampling_loop(
            generation,
            self.period,
            self.cache.clone(),
            self.buffer.clone(),
            self.clock.clone(),
            self.diagnostics.clone(),
        )));
        Ok(())
    }

    /// Closes the buffer, then cancels the timer task. The buffer gate is
    /// checked under the same lock as every append, so nothing is recorded
    /// after this returns even if a firing is already running. The task's
    /// generation is retired with it, so a later `start` cannot hand the gate
    /// back to a task that has not yet observed its abort.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.buffer.close();
            handle.abort();
        }
    }
}

impl Drop for FixedRateSampler {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn sampling_loop(
    generation: u64,
    period: Duration,
    cache: LatestValueCache,
    buffer: RecordingBuffer,
    clock: Arc<dyn Clock>,
    diagnostics: Arc<SharedDiagnostics>,
) {
    // First firing one full period after start.
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);
    let mut fired: u64 = 0;

    loop {
        ticker.tick().await;

        let stale = !cache.has_reading();
        let sample = cache.read().restamped(clock.now_ms());
        if !buffer.push(generation, sample) {
            break;
        }
        if stale {
            diagnostics.record_stale();
        }
        fired += 1;
    }

    debug!(generation, fired, "sampling loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{Acceleration, ManualClock};
    use std::sync::atomic::{AtomicBool, Ordering};

    fn sampler_with(clock: Arc<dyn Clock>) -> (FixedRateSampler, LatestValueCache, RecordingBuffer) {
        let cache = LatestValueCache::new(clock.clone());
        let buffer = RecordingBuffer::new();
        let sampler = FixedRateSampler::new(
            Duration::from_millis(10),
            cache.clone(),
            buffer.clone(),
            clock,
            Arc::new(SharedDiagnostics::default()),
        );
        (sampler, cache, buffer)
    }

    #[test]
    fn start_outside_runtime_fails() {
        let (mut sampler, _, buffer) = sampler_with(Arc::new(ManualClock::new(0)));
        assert_eq!(sampler.start(), Err(AcquisitionError::TimerUnavailable));
        assert!(!sampler.is_running());
        assert!(!buffer.is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_period_is_rejected() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(0));
        let cache = LatestValueCache::new(clock.clone());
        let mut sampler = FixedRateSampler::new(
            Duration::ZERO,
            cache,
            RecordingBuffer::new(),
            clock,
            Arc::new(SharedDiagnostics::default()),
        );
        assert!(matches!(sampler.start(), Err(AcquisitionError::InvalidPeriod(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn appends_one_sample_per_period() {
        let (mut sampler, cache, buffer) = sampler_with(Arc::new(crate::RuntimeClock::anchored_at(0)));
        cache.update(Acceleration::new(0.5, 0.5, 0.5));

        sampler.start().unwrap();
        tokio::time::sleep(Duration::from_millis(95)).await;
        sampler.stop();

        let samples = buffer.snapshot();
        assert_eq!(samples.len(), 9);
        let stamps: Vec<u64> = samples.iter().map(|s| s.timestamp).collect();
        assert_eq!(stamps, (1..=9).map(|i| i * 10).collect::<Vec<_>>());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_immediate_and_idempotent() {
        let (mut sampler, _, buffer) = sampler_with(Arc::new(crate::RuntimeClock::anchored_at(0)));
        sampler.start().unwrap();
        tokio::time::sleep(Duration::from_millis(55)).await;
        sampler.stop();
        sampler.stop();
        let count = buffer.len();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(count, 5);
        assert_eq!(buffer.len(), count);
        assert!(!sampler.is_running());
    }

    /// Blocks the first stamp request for 150 ms and answers it with 42.
    struct StallingClock {
        start: std::time::Instant,
        stalled: AtomicBool,
        entered: AtomicBool,
    }

    impl Clock for StallingClock {
        fn now_ms(&self) -> u64 {
            if !self.stalled.swap(true, Ordering::SeqCst) {
                self.entered.store(true, Ordering::SeqCst);
                std::thread::sleep(std::time::Duration::from_millis(150));
                return 42;
            }
            1_000 + self.start.elapsed().as_millis() as u64
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn restart_ignores_firing_stalled_across_stop() {
        let clock = Arc::new(StallingClock {
            start: std::time::Instant::now(),
            stalled: AtomicBool::new(false),
            entered: AtomicBool::new(false),
        });
        let (mut sampler, cache, buffer) = sampler_with(clock.clone());
        cache.update(Acceleration::new(0.5, 0.5, 0.5));

        sampler.start().unwrap();
        while !clock.entered.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        sampler.stop();
        assert_eq!(buffer.len(), 0);

        buffer.clear();
        sampler.start().unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        sampler.stop();

        let samples = buffer.snapshot();
        assert!(samples.iter().all(|s| s.timestamp != 42));
        // About 20 firings; the stalled task's catch-up burst would add ~15.
        assert!(samples.len() <= 23, "recorded {} samples", samples.len());
    }
}
