use tokio::sync::watch;

use common::{AcquisitionState, DisplayFrame, MotionSample};

/// Outbound display and readout feed.
///
/// Backed by a `watch` channel: subscribers only ever see the newest frame,
/// so a slow renderer never makes the feed queue up.
pub struct DisplayFeed {
    tx: watch::Sender<DisplayFrame>,
    nominal_rate_hz: f64,
}

impl DisplayFeed {
    pub fn new(nominal_rate_hz: f64) -> Self {
        let (tx, _rx) = watch::channel(DisplayFrame::default());
        Self { tx, nominal_rate_hz }
    }

    pub fn subscribe(&self) -> watch::Receiver<DisplayFrame> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> DisplayFrame {
        *self.tx.borrow()
    }

    /// Publishes a fresh reading. `recording_count` is `Some` only while a
    /// recording runs; otherwise the last readout is left in place.
    pub fn publish_sample(&self, sample: MotionSample, recording_count: Option<usize>) {
        let rate = self.nominal_rate_hz;
        self.tx.send_modify(|frame| {
            frame.sample = sample;
            if let Some(count) = recording_count {
                frame.set_count(count, rate);
            }
        });
    }

    /// Publishes a lifecycle change (start, stop, clear) without throttling.
    pub fn publish_lifecycle(&self, state: AcquisitionState, sample_count: usize) {
        let rate = self.nominal_rate_hz;
        self.tx.send_modify(|frame| {
            frame.state = state;
            frame.set_count(sample_count, rate);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_samples_keep_last_readout() {
        let feed = DisplayFeed::new(100.0);
        feed.publish_lifecycle(AcquisitionState::Idle, 300);
        feed.publish_sample(MotionSample::new(1, 1.0, 1.0, 1.0), None);

        let frame = feed.current();
        assert_eq!(frame.sample.x, 1.0);
        assert_eq!(frame.sample_count, 300);
        assert!((frame.elapsed_secs - 3.0).abs() < 1e-12);
    }

    #[test]
    fn subscribers_see_latest_frame_only() {
        let feed = DisplayFeed::new(100.0);
        let mut rx = feed.subscribe();
        for i in 0..5 {
            feed.publish_sample(MotionSample::new(i, i as f64, 0.0, 0.0), Some(i as usize));
        }
        assert!(rx.has_changed().unwrap());
        let frame = *rx.borrow_and_update();
        assert_eq!(frame.sample.timestamp, 4);
        assert_eq!(frame.sample_count, 4);
    }
}
