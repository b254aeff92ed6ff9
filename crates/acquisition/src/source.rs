use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use common::{DisplayThrottle, LatestValueCache, MotionEvent, RecordingBuffer, SharedDiagnostics};

use crate::display::DisplayFeed;

/// Drains hardware motion events into the latest-value cache and forwards
/// the newest reading to the display feed at the throttle's pace.
///
/// Runs until the sending side of `events` is dropped. The sampler does not
/// depend on this task; when it ends, recording carries on with stale values.
pub async fn run_source_pump(
    mut events: mpsc::Receiver<MotionEvent>,
    cache: LatestValueCache,
    buffer: RecordingBuffer,
    mut throttle: DisplayThrottle,
    feed: Arc<DisplayFeed>,
    diagnostics: Arc<SharedDiagnostics>,
) {
    while let Some(event) = events.recv().await {
        let Some(acceleration) = event.acceleration else {
            diagnostics.record_empty_event();
            continue;
        };

        let sample = cache.update(acceleration);
        diagnostics.record_event();

        if throttle.should_emit(sample.timestamp) {
            let recording_count = buffer.is_open().then(|| buffer.len());
            feed.publish_sample(sample, recording_count);
        }
    }

    debug!("motion source closed, pump exiting");
}
