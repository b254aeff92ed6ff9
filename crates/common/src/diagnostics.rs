use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Default)]
pub struct SharedDiagnostics {
    pub source_events: AtomicU64,
    pub empty_events: AtomicU64,
    pub stale_samples: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiagnosticsSnapshot {
    pub source_events: u64,
    pub empty_events: u64,
    pub stale_samples: u64,
}

impl SharedDiagnostics {
    pub fn record_event(&self) {
        self.source_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_empty_event(&self) {
        self.empty_events.fetch_add(1, Ordering::Relaxed);
    }

    /// A sampler firing that found no reading from the source yet.
    pub fn record_stale(&self) {
        self.stale_samples.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            source_events: self.source_events.load(Ordering::Relaxed),
            empty_events: self.empty_events.load(Ordering::Relaxed),
            stale_samples: self.stale_samples.load(Ordering::Relaxed),
        }
    }
}
