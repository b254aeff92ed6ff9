use serde::{Deserialize, Serialize};

use crate::{elapsed_secs, AcquisitionState, MotionSample};

/// Default display refresh interval, roughly 30 Hz.
pub const DEFAULT_DISPLAY_INTERVAL_MS: u64 = 33;

/// Value surfaced to presentation components.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayFrame {
    pub sample: MotionSample,
    pub state: AcquisitionState,
    pub sample_count: usize,
    pub elapsed_secs: f64,
}

impl DisplayFrame {
    pub fn set_count(&mut self, sample_count: usize, nominal_rate_hz: f64) {
        self.sample_count = sample_count;
        self.elapsed_secs = elapsed_secs(sample_count, nominal_rate_hz);
    }
}

/// Rate limiter for the display feed. Carries no samples itself; callers
/// publish whatever is latest when it says yes, and anything in between is
/// simply superseded.
#[derive(Debug, Clone)]
pub struct DisplayThrottle {
    interval_ms: u64,
    last_emit_ms: Option<u64>,
}

impl DisplayThrottle {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_emit_ms: None,
        }
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    /// True on the first call and whenever more than `interval_ms` has passed
    /// since the last emission. Records the emission when it returns true.
    pub fn should_emit(&mut self, now_ms: u64) -> bool {
        let due = match self.last_emit_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) > self.interval_ms,
        };
        if due {
            self.last_emit_ms = Some(now_ms);
        }
        due
    }

    pub fn reset(&mut self) {
        self.last_emit_ms = None;
    }
}

impl Default for DisplayThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_DISPLAY_INTERVAL_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_offer_always_emits() {
        let mut throttle = DisplayThrottle::default();
        assert_eq!(throttle.interval_ms(), DEFAULT_DISPLAY_INTERVAL_MS);
        assert!(throttle.should_emit(0));
    }

    #[test]
    fn limits_to_one_emission_per_interval() {
        let mut throttle = DisplayThrottle::new(33);
        // Source firing every 5 ms for one second.
        let emitted = (0..200u64)
            .map(|i| 10_000 + i * 5)
            .filter(|&now| throttle.should_emit(now))
            .count();
        // 35 ms apart (first multiple of 5 above 33) over 1000 ms.
        assert_eq!(emitted, 29);
    }

    #[test]
    fn reset_allows_immediate_emit() {
        let mut throttle = DisplayThrottle::new(1_000);
        assert!(throttle.should_emit(100));
        assert!(!throttle.should_emit(200));
        throttle.reset();
        assert!(throttle.should_emit(201));
    }

    #[test]
    fn clock_going_backwards_does_not_emit() {
        let mut throttle = DisplayThrottle::new(33);
        assert!(throttle.should_emit(500));
        assert!(!throttle.should_emit(400));
    }

    #[test]
    fn frame_count_tracks_elapsed_time() {
        let mut frame = DisplayFrame::default();
        frame.set_count(250, 100.0);
        assert_eq!(frame.sample_count, 250);
        assert!((frame.elapsed_secs - 2.5).abs() < 1e-12);
    }
}
