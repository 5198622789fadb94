//! Configuration for heartrate-windows.

use crate::core::WindowConfig;
use crate::ingest::{NormalizerConfig, DEFAULT_SERIES_FIELD};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Window span and sample spacing
    pub window: WindowConfig,

    /// IANA zone for timestamps without an offset
    pub timezone: String,

    /// Name of the pair list in structured exports
    pub series_field: String,

    /// Inputs larger than this are refused before parsing
    pub max_upload_bytes: usize,

    /// Uploads the server keeps before evicting the oldest
    pub max_uploads: usize,

    /// Port for `serve`
    pub server_port: u16,

    /// Directory for exported reports
    pub export_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("heartrate-windows");

        Self {
            window: WindowConfig::default(),
            timezone: "UTC".to_string(),
            series_field: DEFAULT_SERIES_FIELD.to_string(),
            max_upload_bytes: 16 * 1024 * 1024,
            max_uploads: 64,
            server_port: 8080,
            export_path: data_dir.join("exports"),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
            Self::from_json(&content)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse and validate configuration JSON.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.parse_timezone()?;
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(&config_path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("heartrate-windows")
            .join("config.json")
    }

    /// Ensure the export directory exists.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.export_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))
    }

    /// Replace the window settings, validating them.
    pub fn set_window(&mut self, duration_secs: u64, step_secs: u64) -> Result<(), ConfigError> {
        self.window = WindowConfig::from_secs(duration_secs, step_secs)
            .map_err(|e| ConfigError::InvalidWindow(e.to_string()))?;
        Ok(())
    }

    fn parse_timezone(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::InvalidTimezone(self.timezone.clone()))
    }

    /// Settings for the sample normalizer.
    pub fn normalizer_config(&self) -> Result<NormalizerConfig, ConfigError> {
        Ok(NormalizerConfig {
            timezone: self.parse_timezone()?,
            series_field: self.series_field.clone(),
        })
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    InvalidTimezone(String),
    InvalidWindow(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
            ConfigError::InvalidTimezone(tz) => write!(f, "Unknown timezone: {tz}"),
            ConfigError::InvalidWindow(e) => write!(f, "Invalid window settings: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.window, WindowConfig::default());
        assert_eq!(config.timezone, "UTC");
        assert_eq!(config.series_field, "heartRateValues");
        assert_eq!(config.max_uploads, 64);
        assert!(config.normalizer_config().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = Config::from_json(r#"{"timezone": "Europe/Oslo"}"#).unwrap();
        assert_eq!(config.timezone, "Europe/Oslo");
        assert_eq!(config.window, WindowConfig::default());
        assert_eq!(config.server_port, 8080);
    }

    #[test]
    fn test_invalid_timezone() {
        let err = Config::from_json(r#"{"timezone": "Mars/Olympus"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTimezone(_)));
    }

    #[test]
    fn test_invalid_window_rejected() {
        let err = Config::from_json(r#"{"window": {"duration_secs": 100, "step_secs": 30}}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));

        let mut config = Config::default();
        assert!(matches!(
            config.set_window(0, 60),
            Err(ConfigError::InvalidWindow(_))
        ));
        config.set_window(3600, 60).unwrap();
        assert_eq!(config.window.samples_per_window(), 61);
    }

    #[test]
    fn test_config_round_trip() {
        let mut config = Config::default();
        config.set_window(1800, 60).unwrap();
        let json = serde_json::to_string(&config).unwrap();
        let parsed = Config::from_json(&json).unwrap();
        assert_eq!(parsed.window, config.window);
    }
}
