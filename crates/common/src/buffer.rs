use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::MotionSample;

#[derive(Debug, Default)]
struct BufferState {
    samples: Vec<MotionSample>,
    open: bool,
    generation: u64,
}

/// Append-only sample store for the active session.
///
/// Appends are only accepted while the gate is open, and only from the writer
/// holding the generation handed out by the latest `open`. Closing the gate
/// and appending happen under the same lock, so once `close` returns no
/// further sample from that writer can land in the buffer, even after the
/// gate is reopened for a new one. Cheap to clone (clones the `Arc`).
#[derive(Clone, Default)]
pub struct RecordingBuffer {
    state: Arc<Mutex<BufferState>>,
}

impl RecordingBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(BufferState {
                samples: Vec::with_capacity(capacity),
                open: false,
                generation: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BufferState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens the gate for a new writer and returns its generation.
    pub fn open(&self) -> u64 {
        let mut state = self.lock();
        state.generation += 1;
        state.open = true;
        state.generation
    }

    /// Closes the gate and retires the current generation.
    pub fn close(&self) {
        let mut state = self.lock();
        state.open = false;
        state.generation += 1;
    }

    pub fn is_open(&self) -> bool {
        self.lock().open
    }

    /// Appends `sample` if the gate is open for `generation`. Returns whether
    /// it was stored.
    pub fn push(&self, generation: u64, sample: MotionSample) -> bool {
        let mut state = self.lock();
        if !state.open || state.generation != generation {
            return false;
        }
        state.samples.push(sample);
        true
    }

    /// Drops all samples. The gate is left as it was.
    pub fn clear(&self) {
        self.lock().samples.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the current contents; the live buffer never leaves this type.
    pub fn snapshot(&self) -> Vec<MotionSample> {
        self.lock().samples.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_appends_while_closed() {
        let buffer = RecordingBuffer::new();
        assert!(!buffer.push(0, MotionSample::sentinel()));
        assert!(buffer.is_empty());

        let generation = buffer.open();
        assert!(buffer.push(generation, MotionSample::new(1, 1.0, 1.0, 1.0)));
        buffer.close();
        assert!(!buffer.push(generation, MotionSample::new(2, 1.0, 1.0, 1.0)));
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn reopening_rejects_the_retired_writer() {
        let buffer = RecordingBuffer::new();
        let first = buffer.open();
        buffer.close();
        buffer.clear();
        let second = buffer.open();
        assert_ne!(first, second);

        assert!(!buffer.push(first, MotionSample::new(42, 9.0, 9.0, 9.0)));
        assert!(buffer.push(second, MotionSample::new(50, 1.0, 1.0, 1.0)));
        assert_eq!(buffer.snapshot(), vec![MotionSample::new(50, 1.0, 1.0, 1.0)]);
    }

    #[test]
    fn clear_keeps_gate_state() {
        let buffer = RecordingBuffer::with_capacity(4);
        let generation = buffer.open();
        buffer.push(generation, MotionSample::sentinel());
        buffer.clear();
        assert!(buffer.is_empty());
        assert!(buffer.is_open());
    }

    #[test]
    fn snapshot_is_detached_from_live_buffer() {
        let buffer = RecordingBuffer::new();
        let generation = buffer.open();
        buffer.push(generation, MotionSample::new(10, 0.1, 0.2, 0.3));
        let snapshot = buffer.snapshot();
        buffer.push(generation, MotionSample::new(20, 0.1, 0.2, 0.3));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(buffer.len(), 2);
    }
}
