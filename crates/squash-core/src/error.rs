//! Error types for the squash compression pipeline.
//!
//! Errors carry the file name they concern so that a caller can surface them
//! as per-file form messages without extra bookkeeping.

use thiserror::Error;

/// Top-level error type for squash operations.
#[derive(Error, Debug)]
pub enum SquashError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Pipeline processing errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The file is not one of the allowed image types
    #[error("Unsupported type for {name}: {media_type:?}")]
    UnsupportedType { name: String, media_type: String },

    /// Every decode strategy failed
    #[error("Decode error for {name}: {message}")]
    Decode { name: String, message: String },

    /// No raster surface could be obtained, or the codec rejected it
    #[error("Encode error for {name}: {message}")]
    Encode { name: String, message: String },

    /// Compression options are out of range
    #[error("Invalid compression options: {0}")]
    InvalidOptions(String),

    /// Operation timed out
    #[error("Timeout in {stage} stage for {name} after {timeout_ms}ms")]
    Timeout {
        name: String,
        stage: String,
        timeout_ms: u64,
    },

    /// Decoded dimensions exceed the configured limit
    #[error("Image too large: {name} ({width}x{height} > {max_dim})")]
    ImageTooLarge {
        name: String,
        width: u32,
        height: u32,
        max_dim: u32,
    },
}

impl PipelineError {
    /// Short machine-readable kind, used in log fields and CLI reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnsupportedType { .. } => "unsupported_type",
            Self::Decode { .. } => "decode",
            Self::Encode { .. } => "encode",
            Self::InvalidOptions(_) => "invalid_options",
            Self::Timeout { .. } => "timeout",
            Self::ImageTooLarge { .. } => "image_too_large",
        }
    }
}

/// Convenience type alias for squash results.
pub type Result<T> = std::result::Result<T, SquashError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
