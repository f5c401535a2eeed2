//! Core data types for the squash compression pipeline.
//!
//! Files travel through the pipeline as in-memory payloads: the caller hands
//! over a [`SourceFile`] and gets back an [`OutputFile`] of the same shape.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::error::{PipelineError, PipelineResult};

/// An image file as handed over by the caller.
///
/// The payload is reference-counted: cloning a `SourceFile` never copies the
/// bytes, which is how a bypassed file is returned "as is".
#[derive(Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Filename, including extension
    pub name: String,

    /// Declared media type; may be empty when the caller does not know it
    pub media_type: String,

    /// Raw file contents
    pub bytes: Arc<[u8]>,
}

/// Pipeline output. Same shape as the input: either the input itself
/// (bypass) or a freshly encoded file.
pub type OutputFile = SourceFile;

impl SourceFile {
    /// Create a file from its name, declared type and contents.
    pub fn new(
        name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Payload size in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whether both files point at the very same payload allocation.
    pub fn shares_payload(&self, other: &SourceFile) -> bool {
        Arc::ptr_eq(&self.bytes, &other.bytes)
    }

    /// Lowercased filename extension, if any.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }

    /// Shallow copy with a different declared type. The payload is shared.
    pub fn with_media_type(&self, media_type: impl Into<String>) -> Self {
        Self {
            name: self.name.clone(),
            media_type: media_type.into(),
            bytes: Arc::clone(&self.bytes),
        }
    }
}

impl fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceFile")
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Canonical classification of an input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Jpeg,
    Png,
    Webp,
    Heic,
    Heif,
    Unknown,
}

impl MediaType {
    /// Recognize a declared MIME type. Parameters (`;charset=...`) and case
    /// are ignored; `image/jpg` is accepted as a JPEG alias.
    pub fn from_mime(mime: &str) -> Self {
        let essence = mime.split(';').next().unwrap_or("").trim();
        match essence.to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Self::Jpeg,
            "image/png" => Self::Png,
            "image/webp" => Self::Webp,
            "image/heic" => Self::Heic,
            "image/heif" => Self::Heif,
            _ => Self::Unknown,
        }
    }

    /// Recognize a filename extension (without the dot, any case).
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Self::Jpeg,
            "png" => Self::Png,
            "webp" => Self::Webp,
            "heic" => Self::Heic,
            "heif" => Self::Heif,
            _ => Self::Unknown,
        }
    }

    /// Canonical MIME string.
    pub fn mime(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
            Self::Heic => "image/heic",
            Self::Heif => "image/heif",
            Self::Unknown => "application/octet-stream",
        }
    }

    /// Preferred filename extension, if the type has one.
    pub fn extension(self) -> Option<&'static str> {
        match self {
            Self::Jpeg => Some("jpg"),
            Self::Png => Some("png"),
            Self::Webp => Some("webp"),
            Self::Heic => Some("heic"),
            Self::Heif => Some("heif"),
            Self::Unknown => None,
        }
    }

    /// Decoder format for this type, when the `image` crate can decode it.
    pub fn image_format(self) -> Option<image::ImageFormat> {
        match self {
            Self::Jpeg => Some(image::ImageFormat::Jpeg),
            Self::Png => Some(image::ImageFormat::Png),
            Self::Webp => Some(image::ImageFormat::WebP),
            Self::Heic | Self::Heif | Self::Unknown => None,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

/// What the pipeline does with a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionPlan {
    /// Return the file unchanged
    Bypass,
    /// Decode, rescale and re-encode
    Compress,
}

/// Compact lossy format the pipeline re-encodes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    #[default]
    Webp,
    Jpeg,
}

impl TargetFormat {
    /// MIME type of encoded output.
    pub fn mime(self) -> &'static str {
        match self {
            Self::Webp => "image/webp",
            Self::Jpeg => "image/jpeg",
        }
    }

    /// Filename extension of encoded output.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Webp => "webp",
            Self::Jpeg => "jpg",
        }
    }

    /// Parse format from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "webp" => Some(Self::Webp),
            "jpeg" | "jpg" => Some(Self::Jpeg),
            _ => None,
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Webp => write!(f, "webp"),
            Self::Jpeg => write!(f, "jpeg"),
        }
    }
}

/// Default longest-edge bound in pixels.
pub const DEFAULT_MAX_SIDE: u32 = 2048;

/// Default lossy encode quality.
pub const DEFAULT_QUALITY: f32 = 0.86;

/// Largest side libwebp can encode; larger targets fail at encode time.
pub const WEBP_MAX_DIMENSION: u32 = 16383;

/// Per-invocation compression options.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionOptions {
    /// Longest-edge bound in pixels; larger images are shrunk to fit
    pub max_side: u32,

    /// Lossy encode quality in (0, 1]
    pub quality: f32,

    /// Output format
    pub format: TargetFormat,
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self {
            max_side: DEFAULT_MAX_SIDE,
            quality: DEFAULT_QUALITY,
            format: TargetFormat::Webp,
        }
    }
}

impl CompressionOptions {
    /// Check that the options are within range.
    pub fn validate(&self) -> PipelineResult<()> {
        if self.max_side == 0 {
            return Err(PipelineError::InvalidOptions(
                "max_side must be > 0".into(),
            ));
        }
        if !(self.quality > 0.0 && self.quality <= 1.0) {
            return Err(PipelineError::InvalidOptions(format!(
                "quality must be in (0, 1], got {}",
                self.quality
            )));
        }
        Ok(())
    }
}

/// Serializable summary of one output file, for reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    /// Output filename
    pub name: String,

    /// Output media type
    pub media_type: String,

    /// Output size in bytes
    pub size: u64,
}

impl From<&OutputFile> for FileRecord {
    fn from(file: &OutputFile) -> Self {
        Self {
            name: file.name.clone(),
            media_type: file.media_type.clone(),
            size: file.len() as u64,
        }
    }
}
