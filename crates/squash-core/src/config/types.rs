//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};

use crate::types::{CompressionOptions, TargetFormat, DEFAULT_MAX_SIDE, DEFAULT_QUALITY};

/// Compression defaults applied when the caller passes no options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    /// Longest-edge bound in pixels
    pub max_side: u32,

    /// Lossy encode quality in (0, 1]
    pub quality: f32,

    /// Output format
    pub format: TargetFormat,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            max_side: DEFAULT_MAX_SIDE,
            quality: DEFAULT_QUALITY,
            format: TargetFormat::Webp,
        }
    }
}

impl CompressionConfig {
    /// Per-invocation options built from these defaults.
    pub fn options(&self) -> CompressionOptions {
        CompressionOptions {
            max_side: self.max_side,
            quality: self.quality,
            format: self.format,
        }
    }
}

/// Processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Upper bound on files compressed concurrently within a batch
    pub parallel_workers: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            parallel_workers: 2,
        }
    }
}

/// Optional resource limits. Both are off unless set in the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Reject images whose header declares a larger width or height
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_image_dimension: Option<u32>,

    /// Give up on a decode after this many milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decode_timeout_ms: Option<u64>,
}

/// Output settings for the command-line front end.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory compressed files are written to (supports `~`)
    pub dir: String,

    /// Report format ("json" or "jsonl")
    pub report_format: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: "./compressed".to_string(),
            report_format: "json".to_string(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
