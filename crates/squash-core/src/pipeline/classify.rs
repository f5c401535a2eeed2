//! Media type classification and compression policy.
//!
//! Classification looks only at the declared type and the filename, never at
//! the bytes, so the plan for a file is known before anything is decoded.

use crate::types::{CompressionPlan, MediaType, SourceFile};

/// Types the pipeline accepts.
pub const ALLOWED_MEDIA_TYPES: [MediaType; 5] = [
    MediaType::Jpeg,
    MediaType::Png,
    MediaType::Webp,
    MediaType::Heic,
    MediaType::Heif,
];

/// Classify a file: declared type first, filename extension second.
pub fn classify(file: &SourceFile) -> MediaType {
    match MediaType::from_mime(&file.media_type) {
        MediaType::Unknown => file
            .extension()
            .map(|ext| MediaType::from_extension(&ext))
            .unwrap_or(MediaType::Unknown),
        known => known,
    }
}

/// Whether the file classifies as one of the allowed types.
pub fn is_allowed(file: &SourceFile) -> bool {
    ALLOWED_MEDIA_TYPES.contains(&classify(file))
}

/// HEIC/HEIF cannot be transcoded here and are passed through untouched.
pub fn compression_plan(file: &SourceFile) -> CompressionPlan {
    plan_for(classify(file))
}

/// Plan for an already-classified type.
pub fn plan_for(media_type: MediaType) -> CompressionPlan {
    match media_type {
        MediaType::Heic | MediaType::Heif => CompressionPlan::Bypass,
        _ => CompressionPlan::Compress,
    }
}

/// Whether a filename extension belongs to an allowed type.
pub fn is_supported_extension(ext: &str) -> bool {
    ALLOWED_MEDIA_TYPES.contains(&MediaType::from_extension(ext))
}
