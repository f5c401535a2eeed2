//! Configuration management for squash.
//!
//! Configuration is loaded from the platform config directory with defaults
//! for every missing key.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Compression defaults
    pub compression: CompressionConfig,

    /// Processing settings
    pub processing: ProcessingConfig,

    /// Resource limits
    pub limits: LimitsConfig,

    /// Output settings
    pub output: OutputConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// - macOS: ~/Library/Application Support/com.squash.squash/config.toml
    /// - Linux: ~/.config/squash/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\squash\config\config.toml
    ///
    /// Falls back to ~/.squash/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "squash", "squash")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".squash").join("config.toml")
            })
    }

    /// Get the resolved output directory (with ~ expansion).
    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.output.dir).into_owned())
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TargetFormat;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.compression.max_side, 2048);
        assert!((config.compression.quality - 0.86).abs() < f32::EPSILON);
        assert_eq!(config.compression.format, TargetFormat::Webp);
        assert_eq!(config.processing.parallel_workers, 2);
        assert_eq!(config.limits.decode_timeout_ms, None);
        assert_eq!(config.limits.max_image_dimension, None);
    }

    #[test]
    fn test_limits_are_opt_in() {
        let config = Config::from_toml(
            "[limits]\nmax_image_dimension = 8000\ndecode_timeout_ms = 2500\n",
        )
        .unwrap();
        assert_eq!(config.limits.max_image_dimension, Some(8000));
        assert_eq!(config.limits.decode_timeout_ms, Some(2500));

        let parsed = Config::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed.limits.decode_timeout_ms, Some(2500));
        assert!(!Config::default().to_toml().unwrap().contains("decode_timeout_ms"));
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[compression]"));
        assert!(toml.contains("[processing]"));
        assert!(toml.contains("format = \"webp\""));
    }

    #[test]
    fn test_toml_roundtrip_keeps_values() {
        let mut config = Config::default();
        config.compression.max_side = 1024;
        config.compression.format = TargetFormat::Jpeg;
        let parsed = Config::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed.compression.max_side, 1024);
        assert_eq!(parsed.compression.format, TargetFormat::Jpeg);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config = Config::from_toml("[compression]\nquality = 0.5\n").unwrap();
        assert!((config.compression.quality - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.compression.max_side, 2048);
        assert_eq!(config.output.dir, "./compressed");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[processing]\nparallel_workers = 3\n").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.processing.parallel_workers, 3);
    }

    #[test]
    fn test_load_from_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[compression]\nquality = 2.0\n").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_output_dir_expands_tilde() {
        let mut config = Config::default();
        config.output.dir = "~/uploads".to_string();
        let dir = config.output_dir();
        assert!(!dir.to_string_lossy().starts_with('~'));
        assert!(dir.ends_with("uploads"));
    }
}
