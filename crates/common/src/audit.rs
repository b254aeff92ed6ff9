use serde::Serialize;

use crate::error::ExportError;
use crate::MotionSample;

/// An interval this many nominal periods long counts as a gap.
const GAP_FACTOR: f64 = 1.5;

/// Timing quality of a finalized session.
///
/// Compares the raw acquisition stamps against the nominal timeline the
/// export assumes. Drift accumulated by the timer shows up here and in the
/// raw-elapsed column only; nothing is corrected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimingAudit {
    pub sample_count: usize,
    pub nominal_period_ms: f64,
    pub reconstructed_duration_s: f64,
    pub raw_duration_s: f64,
    /// Raw minus reconstructed duration. Positive when the timer ran slow.
    pub drift_s: f64,
    pub mean_interval_ms: f64,
    pub min_interval_ms: f64,
    pub max_interval_ms: f64,
    pub interval_std_ms: f64,
    pub gap_count: usize,
}

impl TimingAudit {
    pub fn from_session(samples: &[MotionSample], nominal_rate_hz: f64) -> Result<Self, ExportError> {
        let (first, last) = match (samples.first(), samples.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(ExportError::EmptySession),
        };
        if !nominal_rate_hz.is_finite() || nominal_rate_hz <= 0.0 {
            return Err(ExportError::InvalidRate(nominal_rate_hz));
        }

        let nominal_period_ms = 1000.0 / nominal_rate_hz;
        let intervals: Vec<f64> = samples
            .windows(2)
            .map(|pair| (pair[1].timestamp as i64 - pair[0].timestamp as i64) as f64)
            .collect();

        let (mean, min, max, std) = if intervals.is_empty() {
            (0.0, 0.0, 0.0, 0.0)
        } else {
            let n = intervals.len() as f64;
            let mean = intervals.iter().sum::<f64>() / n;
            let min = intervals.iter().fold(f64::INFINITY, |a, &b| a.min(b));
            let max = intervals.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
            let variance = intervals.iter().map(|i| (i - mean).powi(2)).sum::<f64>() / n;
            (mean, min, max, variance.sqrt())
        };

        let reconstructed_duration_s = (samples.len() - 1) as f64 / nominal_rate_hz;
        let raw_duration_s = (last.timestamp as i64 - first.timestamp as i64) as f64 / 1000.0;

        Ok(Self {
            sample_count: samples.len(),
            nominal_period_ms,
            reconstructed_duration_s,
            raw_duration_s,
            drift_s: raw_duration_s - reconstructed_duration_s,
            mean_interval_ms: mean,
            min_interval_ms: min,
            max_interval_ms: max,
            interval_std_ms: std,
            gap_count: intervals
                .iter()
                .filter(|&&i| i > nominal_period_ms * GAP_FACTOR)
                .count(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(stamps: &[u64]) -> Vec<MotionSample> {
        stamps
            .iter()
            .map(|&t| MotionSample::new(1_000_000 + t, 0.0, 0.0, 0.0))
            .collect()
    }

    #[test]
    fn perfect_clock_has_no_drift() {
        let stamps: Vec<u64> = (0..101).map(|i| i * 10).collect();
        let audit = TimingAudit::from_session(&session(&stamps), 100.0).unwrap();

        assert_eq!(audit.sample_count, 101);
        assert!((audit.reconstructed_duration_s - 1.0).abs() < 1e-12);
        assert!((audit.raw_duration_s - 1.0).abs() < 1e-12);
        assert!(audit.drift_s.abs() < 1e-12);
        assert_eq!(audit.min_interval_ms, 10.0);
        assert_eq!(audit.max_interval_ms, 10.0);
        assert_eq!(audit.interval_std_ms, 0.0);
        assert_eq!(audit.gap_count, 0);
    }

    #[test]
    fn slow_timer_shows_positive_drift_and_gaps() {
        // Nine regular periods then one 40 ms stall.
        let mut stamps: Vec<u64> = (0..10).map(|i| i * 10).collect();
        stamps.push(130);
        let audit = TimingAudit::from_session(&session(&stamps), 100.0).unwrap();

        assert!((audit.drift_s - 0.03).abs() < 1e-9);
        assert_eq!(audit.max_interval_ms, 40.0);
        assert_eq!(audit.gap_count, 1);
    }

    #[test]
    fn single_sample_session() {
        let audit = TimingAudit::from_session(&session(&[0]), 100.0).unwrap();
        assert_eq!(audit.sample_count, 1);
        assert_eq!(audit.raw_duration_s, 0.0);
        assert_eq!(audit.mean_interval_ms, 0.0);
    }

    #[test]
    fn empty_session_is_rejected() {
        assert!(matches!(
            TimingAudit::from_session(&[], 100.0),
            Err(ExportError::EmptySession)
        ));
    }
}
