//! Image compression pipeline components.
//!
//! - **classify**: media type classification and bypass policy
//! - **decode**: fallback chain of decode strategies
//! - **metadata**: EXIF orientation
//! - **bitmap**: tracked ownership of decoded rasters
//! - **encode**: resize and lossy re-encode
//! - **pool**: bounded worker pool for batches
//! - **compressor**: single-file and batch orchestration
//! - **discovery**: find image files on disk (front ends only)

pub mod bitmap;
pub mod classify;
pub mod compressor;
pub mod decode;
pub mod discovery;
pub mod encode;
pub mod metadata;
pub mod pool;

// Re-exports for convenient access
pub use bitmap::{DecodedBitmap, ResourceTracker};
pub use classify::{classify, compression_plan, is_allowed, ALLOWED_MEDIA_TYPES};
pub use compressor::Compressor;
pub use decode::{DecodeStrategy, ImageDecoder, OrientedDecode, PlainDecode, RasterizeDecode};
pub use discovery::{DiscoveredFile, FileDiscovery};
pub use encode::{target_dimensions, EncodedImage, ImageEncoder, SurfaceKind};
