//! squash-core - upload image normalization and compression.
//!
//! Takes user-supplied image files as in-memory payloads, passes through the
//! ones that cannot be safely transcoded (HEIC/HEIF) and shrinks the rest to
//! a bounded longest edge in a compact lossy format.
//!
//! ```text
//! SourceFile → classify → Bypass ─────────────────────────→ OutputFile
//!                       → Compress → decode → resize+encode → OutputFile
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use squash_core::{CompressionOptions, Compressor, Config, SourceFile};
//!
//! #[tokio::main]
//! async fn main() -> squash_core::Result<()> {
//!     let config = Config::load()?;
//!     let compressor = Compressor::new(&config);
//!
//!     let file = SourceFile::new("review.jpg", "image/jpeg", std::fs::read("review.jpg")?);
//!     let out = compressor.compress_one(&file, &CompressionOptions::default()).await?;
//!     println!("{} ({} bytes)", out.name, out.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod types;

// Re-exports for convenient access
pub use config::Config;
pub use error::{ConfigError, PipelineError, PipelineResult, Result, SquashError};
pub use output::{BatchSummary, ReportFormat, ReportWriter};
pub use pipeline::{
    classify, compression_plan, is_allowed, Compressor, DiscoveredFile, FileDiscovery,
};
pub use types::{
    CompressionOptions, CompressionPlan, FileRecord, MediaType, OutputFile, SourceFile,
    TargetFormat,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_default_options_match_config() {
        assert_eq!(
            Config::default().compression.options(),
            CompressionOptions::default()
        );
    }
}
