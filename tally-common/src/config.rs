use crate::error::{Result, TallyError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SINK_PATH: &str = "metrics.log";
pub const DEFAULT_FLUSH_PERIOD_MS: u64 = 1000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TallyConfig {
    /// File that flushed records are appended to.
    #[serde(default = "default_sink_path")]
    pub sink_path: PathBuf,
    #[serde(default = "default_flush_period_ms")]
    pub flush_period_ms: u64,
}

fn default_sink_path() -> PathBuf {
    PathBuf::from(DEFAULT_SINK_PATH)
}

fn default_flush_period_ms() -> u64 {
    DEFAULT_FLUSH_PERIOD_MS
}

impl Default for TallyConfig {
    fn default() -> Self {
        Self {
            sink_path: default_sink_path(),
            flush_period_ms: default_flush_period_ms(),
        }
    }
}

impl TallyConfig {
    pub fn flush_period(&self) -> Duration {
        Duration::from_millis(self.flush_period_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.flush_period_ms == 0 {
            return Err(TallyError::Config(
                "flush_period_ms must be greater than zero".into(),
            ));
        }
        if self.sink_path.as_os_str().is_empty() {
            return Err(TallyError::Config("sink_path must not be empty".into()));
        }
        Ok(())
    }
}

/// Loads a registry configuration from a JSON file.
pub fn load_config(path: &str) -> Result<TallyConfig> {
    let data = fs::read_to_string(path)?;
    load_config_str(&data)
}

/// Parses and validates a JSON configuration document.
pub fn load_config_str(data: &str) -> Result<TallyConfig> {
    let config: TallyConfig = serde_json::from_str(data)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = load_config_str("{}").unwrap();
        assert_eq!(config, TallyConfig::default());
        assert_eq!(config.flush_period(), Duration::from_millis(1000));
        assert_eq!(config.sink_path, PathBuf::from("metrics.log"));
    }

    #[test]
    fn test_explicit_values() {
        let config =
            load_config_str(r#"{ "sink_path": "/tmp/m.log", "flush_period_ms": 50 }"#).unwrap();
        assert_eq!(config.sink_path, PathBuf::from("/tmp/m.log"));
        assert_eq!(config.flush_period(), Duration::from_millis(50));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = load_config_str(r#"{ "flush_period": 50 }"#).unwrap_err();
        assert!(matches!(err, TallyError::Serde(_)));
    }

    #[test]
    fn test_zero_period_rejected() {
        let err = load_config_str(r#"{ "flush_period_ms": 0 }"#).unwrap_err();
        assert!(matches!(err, TallyError::Config(_)));
    }

    #[test]
    fn test_load_config_from_file() {
        let path = std::env::temp_dir().join(format!("tally-config-{}.json", uuid::Uuid::new_v4()));
        fs::write(&path, r#"{ "flush_period_ms": 250 }"#).unwrap();

        let config = load_config(path.to_str().unwrap()).unwrap();
        assert_eq!(config.flush_period_ms, 250);

        // cleanup
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_config("/definitely/not/here/tally.json").unwrap_err();
        assert!(matches!(err, TallyError::Io(_)));
    }
}
