use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::display::DEFAULT_DISPLAY_INTERVAL_MS;
use crate::error::ConfigError;
use crate::export::SessionMetadata;

pub const DEFAULT_NOMINAL_RATE_HZ: f64 = 100.0;
const MAX_NOMINAL_RATE_HZ: f64 = 1_000.0;

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggerConfig {
    pub session_name: String,
    pub nominal_rate_hz: f64,
    pub display_interval_ms: u64,
    pub source_queue_capacity: usize,
    pub output_dir: PathBuf,
    pub subject_id: String,
    pub condition: String,
    pub enable_logging: bool,
    pub log_filter: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            session_name: "motion_logger".to_string(),
            nominal_rate_hz: DEFAULT_NOMINAL_RATE_HZ,
            display_interval_ms: DEFAULT_DISPLAY_INTERVAL_MS,
            source_queue_capacity: 256,
            output_dir: PathBuf::from("."),
            subject_id: "001".to_string(),
            condition: "A".to_string(),
            enable_logging: true,
            log_filter: "info".to_string(),
        }
    }
}

pub fn load_config(path: &str) -> Result<LoggerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    LoggerConfig::from_toml(&content)
}

impl LoggerConfig {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        load_config(path)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: LoggerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let rate = self.nominal_rate_hz;
        if !rate.is_finite() || rate <= 0.0 || rate > MAX_NOMINAL_RATE_HZ {
            return Err(ConfigError::Invalid(format!(
                "nominal_rate_hz must be in (0, {}], got {}",
                MAX_NOMINAL_RATE_HZ, rate
            )));
        }
        if self.source_queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "source_queue_capacity must be at least 1".to_string(),
            ));
        }
        self.metadata()
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Sampler period implied by the nominal rate (10 ms at 100 Hz).
    pub fn sampling_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.nominal_rate_hz)
    }

    pub fn metadata(&self) -> SessionMetadata {
        SessionMetadata::new(&self.subject_id, &self.condition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = LoggerConfig::from_toml("").unwrap();
        assert_eq!(config, LoggerConfig::default());
        assert_eq!(config.sampling_period(), Duration::from_millis(10));
    }

    #[test]
    fn parses_overrides() {
        let config = LoggerConfig::from_toml(
            r#"
            nominal_rate_hz = 50.0
            display_interval_ms = 100
            subject_id = "017"
            condition = "fast"
            output_dir = "out"
            "#,
        )
        .unwrap();
        assert_eq!(config.sampling_period(), Duration::from_millis(20));
        assert_eq!(config.display_interval_ms, 100);
        assert_eq!(config.metadata(), SessionMetadata::new("017", "fast"));
        assert_eq!(config.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn rejects_non_positive_rate() {
        for bad in ["nominal_rate_hz = 0.0", "nominal_rate_hz = -5.0", "nominal_rate_hz = 5000.0"] {
            assert!(matches!(
                LoggerConfig::from_toml(bad),
                Err(ConfigError::Invalid(_))
            ));
        }
    }

    #[test]
    fn rejects_path_separator_in_subject() {
        assert!(matches!(
            LoggerConfig::from_toml(r#"subject_id = "../x""#),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn reports_parse_errors() {
        assert!(matches!(
            LoggerConfig::from_toml("nominal_rate_hz = \"fast\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn loads_bundled_config() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../configs/motion_logger.toml");
        let config = load_config(path).unwrap();
        assert_eq!(config.nominal_rate_hz, 100.0);
        assert_eq!(config.display_interval_ms, 33);
    }
}
