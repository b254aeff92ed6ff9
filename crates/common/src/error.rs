//! Error types for configuration, acquisition and export.
//!
//! Only capability and export-precondition failures ever reach a caller.
//! Trouble inside the acquisition loop (no source, stale cache) is absorbed
//! by recording the sentinel, so it has no variant here.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AcquisitionError {
    #[error("no async runtime available to schedule the sampling timer")]
    TimerUnavailable,

    #[error("no async runtime available to run the motion source pump")]
    SourceUnavailable,

    #[error("sampling period must be non-zero (nominal rate {0} Hz)")]
    InvalidPeriod(f64),
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("session has no samples to export")]
    EmptySession,

    #[error("cannot export while a recording is in progress")]
    RecordingActive,

    #[error("nominal rate must be positive and finite, got {0} Hz")]
    InvalidRate(f64),

    #[error("invalid session metadata: {0}")]
    InvalidMetadata(String),

    #[error("timestamp {0} ms cannot be represented as a calendar time")]
    TimestampOutOfRange(u64),

    #[error("I/O error during export: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error during export: {0}")]
    Csv(#[from] csv::Error),
}
