use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use common::diagnostics::DiagnosticsSnapshot;
use common::{
    elapsed_secs, AcquisitionError, AcquisitionState, Clock, ConfigError, DisplayFrame,
    DisplayThrottle, ExportError, ExportRecord, LatestValueCache, LoggerConfig, MotionEvent,
    MotionSample, PermissionStatus, RecordingBuffer, SessionMetadata, SharedDiagnostics,
    TimingAudit,
};

use crate::clock::RuntimeClock;
use crate::display::DisplayFeed;
use crate::sampler::FixedRateSampler;
use crate::source::run_source_pump;

const MAX_PREALLOCATED_SAMPLES: usize = 16_384;

/// Owns one acquisition pipeline: cache, recording buffer, sampler, display
/// feed and the optional source pump.
///
/// Lifecycle changes go through `&mut self`, so there is a single writer of
/// the recording state. Readers get snapshots or the display feed, never the
/// live buffer.
pub struct AcquisitionController {
    config: LoggerConfig,
    state: AcquisitionState,
    permission: PermissionStatus,
    cache: LatestValueCache,
    buffer: RecordingBuffer,
    sampler: FixedRateSampler,
    feed: Arc<DisplayFeed>,
    diagnostics: Arc<SharedDiagnostics>,
    pump: Option<JoinHandle<()>>,
}

impl AcquisitionController {
    pub fn new(config: LoggerConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, Arc::new(RuntimeClock::new()))
    }

    pub fn with_clock(config: LoggerConfig, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        config.validate()?;

        let cache = LatestValueCache::new(clock.clone());
        let buffer = RecordingBuffer::with_capacity(initial_buffer_capacity(config.nominal_rate_hz));
        let diagnostics = Arc::new(SharedDiagnostics::default());
        let sampler = FixedRateSampler::new(
            config.sampling_period(),
            cache.clone(),
            buffer.clone(),
            clock,
            diagnostics.clone(),
        );
        let feed = Arc::new(DisplayFeed::new(config.nominal_rate_hz));

        Ok(Self {
            config,
            state: AcquisitionState::Idle,
            permission: PermissionStatus::Prompt,
            cache,
            buffer,
            sampler,
            feed,
            diagnostics,
            pump: None,
        })
    }

    /// Attaches a motion source. Replaces any previously connected one.
    pub fn connect_source(&mut self, events: mpsc::Receiver<MotionEvent>) -> Result<(), AcquisitionError> {
        let runtime = Handle::try_current().map_err(|_| AcquisitionError::SourceUnavailable)?;
        if let Some(previous) = self.pump.take() {
            previous.abort();
        }

        let throttle = DisplayThrottle::new(self.config.display_interval_ms);
        let display_interval_ms = throttle.interval_ms();
        self.pump = Some(runtime.spawn(run_source_pump(
            events,
            self.cache.clone(),
            self.buffer.clone(),
            throttle,
            self.feed.clone(),
            self.diagnostics.clone(),
        )));
        self.permission = PermissionStatus::Granted;
        info!(display_interval_ms, "motion source connected");
        Ok(())
    }

    /// Records that the source cannot be used. Recording still works and
    /// produces sentinel samples.
    pub fn mark_unavailable(&mut self, status: PermissionStatus) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        self.permission = status;
        warn!(?status, "motion source unavailable");
    }

    pub fn permission(&self) -> PermissionStatus {
        self.permission
    }

    /// Clears the previous session and starts the sampler. No-op while
    /// already recording.
    pub fn begin_session(&mut self) -> Result<(), AcquisitionError> {
        if self.state == AcquisitionState::Recording {
            return Ok(());
        }

        self.buffer.clear();
        self.sampler.start()?;
        self.state = AcquisitionState::Recording;
        self.feed.publish_lifecycle(self.state, 0);
        info!(
            session = %self.config.session_name,
            rate_hz = self.config.nominal_rate_hz,
            "recording started"
        );
        Ok(())
    }

    /// Stops the sampler; the buffer becomes the finalized session. No-op
    /// while idle.
    pub fn end_session(&mut self) {
        if self.state == AcquisitionState::Idle {
            return;
        }

        self.sampler.stop();
        self.state = AcquisitionState::Idle;
        let count = self.buffer.len();
        self.feed.publish_lifecycle(self.state, count);

        if !self.cache.has_reading() {
            warn!(samples = count, "recording finished without any reading from the motion source");
        }
        info!(
            samples = count,
            elapsed_secs = elapsed_secs(count, self.config.nominal_rate_hz),
            "recording stopped"
        );
    }

    /// Drops the buffered samples without touching the acquisition state.
    pub fn discard_session(&mut self) {
        self.buffer.clear();
        self.feed.publish_lifecycle(self.state, 0);
        info!("session discarded");
    }

    pub fn state(&self) -> AcquisitionState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == AcquisitionState::Recording
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }

    /// Period of the fixed-rate sampler, `1 / nominal_rate_hz`.
    pub fn sampling_period(&self) -> Duration {
        self.sampler.period()
    }

    pub fn sample_count(&self) -> usize {
        self.buffer.len()
    }

    pub fn elapsed_secs(&self) -> f64 {
        elapsed_secs(self.sample_count(), self.config.nominal_rate_hz)
    }

    /// Copy of the recorded samples.
    pub fn session(&self) -> Vec<MotionSample> {
        self.buffer.snapshot()
    }

    pub fn latest(&self) -> MotionSample {
        self.cache.read()
    }

    pub fn subscribe(&self) -> watch::Receiver<DisplayFrame> {
        self.feed.subscribe()
    }

    pub fn display_frame(&self) -> DisplayFrame {
        self.feed.current()
    }

    pub fn diagnostics(&self) -> DiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }

    pub fn export_record(&self) -> Result<ExportRecord, ExportError> {
        if self.is_recording() {
            return Err(ExportError::RecordingActive);
        }
        ExportRecord::from_session(&self.session(), self.config.nominal_rate_hz)
    }

    /// Exports into the configured output directory.
    pub fn export_csv(&self, metadata: &SessionMetadata) -> Result<PathBuf, ExportError> {
        self.export_csv_to(&self.config.output_dir, metadata)
    }

    pub fn export_csv_to(&self, dir: &Path, metadata: &SessionMetadata) -> Result<PathBuf, ExportError> {
        metadata.validate()?;
        let record = self.export_record()?;
        let path = record.save_to_csv(dir, metadata, &Local::now())?;
        info!(path = %path.display(), rows = record.len(), "session exported");
        Ok(path)
    }

    pub fn timing_audit(&self) -> Result<TimingAudit, ExportError> {
        TimingAudit::from_session(&self.session(), self.config.nominal_rate_hz)
    }
}

/// One minute at the nominal rate, capped; longer sessions grow the `Vec`.
fn initial_buffer_capacity(nominal_rate_hz: f64) -> usize {
    ((nominal_rate_hz * 60.0) as usize).min(MAX_PREALLOCATED_SAMPLES)
}

impl Drop for AcquisitionController {
    fn drop(&mut self) {
        self.sampler.stop();
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preallocation_is_bounded() {
        assert_eq!(initial_buffer_capacity(100.0), 6_000);
        assert_eq!(initial_buffer_capacity(1_000.0), MAX_PREALLOCATED_SAMPLES);
    }
}
