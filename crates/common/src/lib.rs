use serde::{Deserialize, Serialize};

pub mod audit;
pub mod buffer;
pub mod cache;
pub mod clock;
pub mod config;
pub mod diagnostics;
pub mod display;
pub mod error;
pub mod export;

pub use audit::TimingAudit;
pub use buffer::RecordingBuffer;
pub use cache::LatestValueCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::LoggerConfig;
pub use diagnostics::SharedDiagnostics;
pub use display::{DisplayFrame, DisplayThrottle};
pub use error::{AcquisitionError, ConfigError, ExportError};
pub use export::{ExportRecord, SessionMetadata};

/// One acquired acceleration reading in m/s², gravity already removed.
///
/// The all-zero value is the sentinel held by the cache before the source
/// has delivered anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MotionSample {
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl MotionSample {
    pub fn new(timestamp: u64, x: f64, y: f64, z: f64) -> Self {
        Self { timestamp, x, y, z }
    }

    pub fn sentinel() -> Self {
        Self::default()
    }

    /// Same reading, stamped with a different acquisition time.
    pub fn restamped(self, timestamp: u64) -> Self {
        Self { timestamp, ..self }
    }
}

/// Raw acceleration as delivered by the hardware layer. Axes may be missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Acceleration {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
}

impl Acceleration {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            z: Some(z),
        }
    }
}

/// A single hardware motion event. Events without an acceleration payload
/// carry no usable reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MotionEvent {
    pub acceleration: Option<Acceleration>,
}

impl MotionEvent {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            acceleration: Some(Acceleration::new(x, y, z)),
        }
    }

    pub fn empty() -> Self {
        Self { acceleration: None }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AcquisitionState {
    #[default]
    Idle,
    Recording,
}

/// Capability state of the motion source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PermissionStatus {
    #[default]
    Prompt,
    Granted,
    Denied,
    NotSupported,
}

/// Elapsed recording time implied by a sample count at the nominal rate.
pub fn elapsed_secs(sample_count: usize, nominal_rate_hz: f64) -> f64 {
    sample_count as f64 / nominal_rate_hz
}
