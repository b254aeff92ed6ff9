use std::sync::{Arc, PoisonError, RwLock};

use crate::{Acceleration, Clock, MotionSample};

#[derive(Debug, Default)]
struct Slot {
    sample: MotionSample,
    updates: u64,
}

/// Holds the most recent reading from the motion source.
///
/// One writer (the source pump) and any number of readers (sampler, display).
/// Clones share the same slot.
#[derive(Clone)]
pub struct LatestValueCache {
    slot: Arc<RwLock<Slot>>,
    clock: Arc<dyn Clock>,
}

impl LatestValueCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            slot: Arc::new(RwLock::new(Slot::default())),
            clock,
        }
    }

    /// Overwrites the held value with `reading`, stamped with the clock at
    /// update time. Missing axes read as zero.
    pub fn update(&self, reading: Acceleration) -> MotionSample {
        let sample = MotionSample::new(
            self.clock.now_ms(),
            reading.x.unwrap_or(0.0),
            reading.y.unwrap_or(0.0),
            reading.z.unwrap_or(0.0),
        );
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        slot.sample = sample;
        slot.updates += 1;
        sample
    }

    /// Current value, or the zero sentinel before the first update.
    pub fn read(&self) -> MotionSample {
        self.slot
            .read()
            .map(|slot| slot.sample)
            .unwrap_or_else(|poisoned| poisoned.into_inner().sample)
    }

    pub fn has_reading(&self) -> bool {
        self.update_count() > 0
    }

    pub fn update_count(&self) -> u64 {
        self.slot
            .read()
            .map(|slot| slot.updates)
            .unwrap_or_else(|poisoned| poisoned.into_inner().updates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ManualClock;

    #[test]
    fn reads_sentinel_before_first_update() {
        let cache = LatestValueCache::new(Arc::new(ManualClock::new(42)));
        assert_eq!(cache.read(), MotionSample::sentinel());
        assert!(!cache.has_reading());
    }

    #[test]
    fn update_stamps_with_clock_and_overwrites() {
        let clock = Arc::new(ManualClock::new(1_000));
        let cache = LatestValueCache::new(clock.clone());

        cache.update(Acceleration::new(1.0, 2.0, 3.0));
        clock.advance(7);
        let latest = cache.update(Acceleration::new(-1.0, 0.5, 9.0));

        assert_eq!(latest, MotionSample::new(1_007, -1.0, 0.5, 9.0));
        assert_eq!(cache.read(), latest);
        assert_eq!(cache.update_count(), 2);
    }

    #[test]
    fn missing_axes_read_as_zero() {
        let cache = LatestValueCache::new(Arc::new(ManualClock::new(5)));
        let sample = cache.update(Acceleration {
            x: Some(0.25),
            y: None,
            z: None,
        });
        assert_eq!(sample, MotionSample::new(5, 0.25, 0.0, 0.0));
    }

    #[test]
    fn clones_share_the_slot() {
        let cache = LatestValueCache::new(Arc::new(ManualClock::new(0)));
        let reader = cache.clone();
        cache.update(Acceleration::new(3.0, 3.0, 3.0));
        assert_eq!(reader.read().x, 3.0);
    }
}
