use std::f64::consts::TAU;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration, Instant};
use tracing::debug;

use common::{Acceleration, MotionEvent};

/// Gait-like waist acceleration delivered at an irregular cadence, standing
/// in for a device motion sensor.
#[derive(Debug, Clone)]
pub struct SimulatedSource {
    /// Average gap between events. 16 ms is roughly a 60 Hz sensor.
    pub mean_interval_ms: f64,
    /// Uniform jitter applied to each gap, +/- this many ms.
    pub jitter_ms: f64,
    /// Steps per second.
    pub step_hz: f64,
    /// Vertical peak acceleration in m/s².
    pub amplitude: f64,
    /// Every n-th event arrives without an acceleration payload.
    pub dropout_every: Option<u64>,
    pub seed: Option<u64>,
}

impl Default for SimulatedSource {
    fn default() -> Self {
        Self {
            mean_interval_ms: 16.0,
            jitter_ms: 6.0,
            step_hz: 1.8,
            amplitude: 2.5,
            dropout_every: None,
            seed: None,
        }
    }
}

impl SimulatedSource {
    /// Reading `t_secs` into the walk. The vertical axis swings twice per
    /// stride, the lateral axis once.
    pub fn reading_at(&self, t_secs: f64) -> Acceleration {
        let phase = TAU * self.step_hz * t_secs;
        Acceleration::new(
            0.3 * self.amplitude * (phase / 2.0).sin(),
            self.amplitude * phase.sin(),
            0.5 * self.amplitude * phase.cos(),
        )
    }

    /// Spawns the generator on the current runtime. It stops on its own once
    /// the returned receiver is dropped.
    pub fn spawn(self, capacity: usize) -> (mpsc::Receiver<MotionEvent>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(self.run(tx));
        (rx, handle)
    }

    async fn run(self, tx: mpsc::Sender<MotionEvent>) {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let start = Instant::now();
        let mut emitted: u64 = 0;

        loop {
            let jitter = if self.jitter_ms > 0.0 {
                rng.gen_range(-self.jitter_ms..=self.jitter_ms)
            } else {
                0.0
            };
            let gap_ms = (self.mean_interval_ms + jitter).max(1.0);
            sleep(Duration::from_secs_f64(gap_ms / 1000.0)).await;

            emitted += 1;
            let event = match self.dropout_every {
                Some(n) if n > 0 && emitted % n == 0 => MotionEvent::empty(),
                _ => MotionEvent {
                    acceleration: Some(self.reading_at(start.elapsed().as_secs_f64())),
                },
            };

            // Full queue: the reading is superseded by the next one anyway.
            match tx.try_send(event) {
                Ok(()) | Err(mpsc::error::TrySendError::Full(_)) => {}
                Err(mpsc::error::TrySendError::Closed(_)) => break,
            }
        }

        debug!(emitted, "simulated motion source stopped");
    }
}
