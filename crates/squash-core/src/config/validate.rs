//! Configuration validation with range checks.

use crate::error::ConfigError;
use crate::output::ReportFormat;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.compression
            .options()
            .validate()
            .map_err(|e| ConfigError::ValidationError(format!("compression: {e}")))?;
        if self.processing.parallel_workers == 0 {
            return Err(ConfigError::ValidationError(
                "processing.parallel_workers must be > 0".into(),
            ));
        }
        if self.limits.max_image_dimension == Some(0) {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }
        if self.limits.decode_timeout_ms == Some(0) {
            return Err(ConfigError::ValidationError(
                "limits.decode_timeout_ms must be > 0".into(),
            ));
        }
        if ReportFormat::parse(&self.output.report_format).is_none() {
            return Err(ConfigError::ValidationError(format!(
                "output.report_format must be \"json\" or \"jsonl\", got {:?}",
                self.output.report_format
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_passes_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_parallel_workers() {
        let mut config = Config::default();
        config.processing.parallel_workers = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("parallel_workers"));
    }

    #[test]
    fn test_validate_rejects_zero_max_side() {
        let mut config = Config::default();
        config.compression.max_side = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_side"));
    }

    #[test]
    fn test_validate_rejects_out_of_range_quality() {
        let mut config = Config::default();
        config.compression.quality = 0.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("quality"));

        config.compression.quality = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.limits.decode_timeout_ms = Some(0);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("decode_timeout_ms"));
    }

    #[test]
    fn test_validate_rejects_unknown_report_format() {
        let mut config = Config::default();
        config.output.report_format = "xml".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("report_format"));
    }
}
