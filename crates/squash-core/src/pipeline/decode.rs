//! Image decoding through an ordered chain of fallback strategies.
//!
//! Strategies are tried in order; each one's failure is recorded and the next
//! is attempted. The chain as a whole runs on the blocking pool, bounded by
//! the decode timeout when one is configured.

use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::config::LimitsConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::types::SourceFile;

use super::bitmap::{DecodedBitmap, ResourceTracker, ScratchBuffer};
use super::classify::classify;
use super::metadata::{apply_orientation, OrientationReader};

/// One way of turning encoded bytes into a raster.
pub trait DecodeStrategy: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Attempt to decode the file. The error string is collected into the
    /// final decode error if every strategy fails.
    fn decode(&self, file: &SourceFile, tracker: &ResourceTracker)
        -> Result<DynamicImage, String>;
}

/// Decoder format implied by the file's declared type or extension.
fn declared_format(file: &SourceFile) -> Result<ImageFormat, String> {
    let media_type = classify(file);
    media_type
        .image_format()
        .ok_or_else(|| format!("no decoder for {media_type}"))
}

/// Decode with the declared format and apply the EXIF orientation.
pub struct OrientedDecode;

impl DecodeStrategy for OrientedDecode {
    fn name(&self) -> &'static str {
        "oriented"
    }

    fn decode(&self, file: &SourceFile, _: &ResourceTracker) -> Result<DynamicImage, String> {
        let format = declared_format(file)?;
        let orientation = OrientationReader::read(&file.bytes)?;
        let image =
            image::load_from_memory_with_format(&file.bytes, format).map_err(|e| e.to_string())?;
        Ok(match orientation {
            Some(o) => apply_orientation(image, o),
            None => image,
        })
    }
}

/// Decode with the declared format, ignoring orientation metadata.
pub struct PlainDecode;

impl DecodeStrategy for PlainDecode {
    fn name(&self) -> &'static str {
        "plain"
    }

    fn decode(&self, file: &SourceFile, _: &ResourceTracker) -> Result<DynamicImage, String> {
        let format = declared_format(file)?;
        image::load_from_memory_with_format(&file.bytes, format).map_err(|e| e.to_string())
    }
}

/// Detect the container from content, draw onto an RGBA raster, round-trip
/// it through lossless PNG and decode that.
///
/// Handles files whose declared type does not match their content.
pub struct RasterizeDecode;

impl DecodeStrategy for RasterizeDecode {
    fn name(&self) -> &'static str {
        "rasterize"
    }

    fn decode(&self, file: &SourceFile, tracker: &ResourceTracker) -> Result<DynamicImage, String> {
        let reader = ImageReader::new(Cursor::new(&file.bytes[..]))
            .with_guessed_format()
            .map_err(|e| format!("cannot detect image format: {e}"))?;
        if reader.format().is_none() {
            return Err("unrecognized container".to_string());
        }
        let loaded = reader.decode().map_err(|e| e.to_string())?;
        let raster = DynamicImage::ImageRgba8(loaded.to_rgba8());
        drop(loaded);

        let mut scratch = ScratchBuffer::acquire(tracker);
        raster
            .write_to(&mut Cursor::new(scratch.buffer()), ImageFormat::Png)
            .map_err(|e| format!("rasterize failed: {e}"))?;
        drop(raster);

        image::load_from_memory_with_format(scratch.as_slice(), ImageFormat::Png)
            .map_err(|e| e.to_string())
    }
}

/// Reject files whose header declares a side above `max_dim`. Files whose
/// header cannot be read are left to the strategies to report.
fn check_header_dimensions(file: &SourceFile, max_dim: u32) -> PipelineResult<()> {
    let dimensions = ImageReader::new(Cursor::new(&file.bytes[..]))
        .with_guessed_format()
        .ok()
        .and_then(|reader| reader.into_dimensions().ok());

    match dimensions {
        Some((width, height)) if width > max_dim || height > max_dim => {
            Err(PipelineError::ImageTooLarge {
                name: file.name.clone(),
                width,
                height,
                max_dim,
            })
        }
        _ => Ok(()),
    }
}

/// The default strategy chain, most specific first.
pub fn default_strategies() -> Vec<Box<dyn DecodeStrategy>> {
    vec![
        Box::new(OrientedDecode),
        Box::new(PlainDecode),
        Box::new(RasterizeDecode),
    ]
}

/// Image decoder with configurable limits, timeout and fallback chain.
pub struct ImageDecoder {
    limits: LimitsConfig,
    strategies: Arc<Vec<Box<dyn DecodeStrategy>>>,
    tracker: ResourceTracker,
}

impl ImageDecoder {
    /// Create a decoder with the default strategy chain.
    pub fn new(limits: LimitsConfig, tracker: ResourceTracker) -> Self {
        Self::with_strategies(limits, tracker, default_strategies())
    }

    /// Create a decoder with a custom strategy chain.
    pub fn with_strategies(
        limits: LimitsConfig,
        tracker: ResourceTracker,
        strategies: Vec<Box<dyn DecodeStrategy>>,
    ) -> Self {
        Self {
            limits,
            strategies: Arc::new(strategies),
            tracker,
        }
    }

    /// Decode a file into a bitmap, trying each strategy in turn.
    ///
    /// Runs on the blocking pool. The optional dimension limit is checked
    /// against the image header before any pixels are decoded; the optional
    /// timeout bounds the whole chain.
    pub async fn decode(&self, file: &SourceFile) -> PipelineResult<DecodedBitmap> {
        let owned = file.clone();
        let strategies = Arc::clone(&self.strategies);
        let tracker = self.tracker.clone();
        let max_dim = self.limits.max_image_dimension;

        let job = tokio::task::spawn_blocking(move || {
            if let Some(max_dim) = max_dim {
                check_header_dimensions(&owned, max_dim)?;
            }
            Self::decode_sync(&strategies, &owned, &tracker)
        });

        let joined = match self.limits.decode_timeout_ms {
            Some(timeout_ms) => timeout(Duration::from_millis(timeout_ms), job)
                .await
                .map_err(|_| PipelineError::Timeout {
                    name: file.name.clone(),
                    stage: "decode".to_string(),
                    timeout_ms,
                })?,
            None => job.await,
        };

        joined.map_err(|e| PipelineError::Decode {
            name: file.name.clone(),
            message: format!("Task join error: {}", e),
        })?
    }

    /// Run the strategy chain synchronously (on the blocking pool).
    fn decode_sync(
        strategies: &[Box<dyn DecodeStrategy>],
        file: &SourceFile,
        tracker: &ResourceTracker,
    ) -> PipelineResult<DecodedBitmap> {
        let mut failures = Vec::with_capacity(strategies.len());

        for strategy in strategies {
            match strategy.decode(file, tracker) {
                Ok(image) => {
                    if !failures.is_empty() {
                        tracing::warn!(
                            "Decoded {} with fallback strategy '{}' after: {}",
                            file.name,
                            strategy.name(),
                            failures.join("; ")
                        );
                    }
                    return Ok(DecodedBitmap::new(image, strategy.name(), tracker));
                }
                Err(message) => {
                    tracing::debug!(
                        "Decode strategy '{}' failed for {}: {}",
                        strategy.name(),
                        file.name,
                        message
                    );
                    failures.push(format!("{}: {}", strategy.name(), message));
                }
            }
        }

        let message = if failures.is_empty() {
            "no decode strategies configured".to_string()
        } else {
            failures.join("; ")
        };
        Err(PipelineError::Decode {
            name: file.name.clone(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::metadata::fixtures::jpeg_with_orientation;
    use image::RgbImage;

    fn encoded(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        }));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    fn decoder(tracker: &ResourceTracker) -> ImageDecoder {
        ImageDecoder::new(LimitsConfig::default(), tracker.clone())
    }

    #[tokio::test]
    async fn test_oriented_decode_rotates() {
        let tracker = ResourceTracker::new();
        let jpeg = jpeg_with_orientation(&encoded(40, 20, ImageFormat::Jpeg), 6);
        let file = SourceFile::new("rotated.jpg", "image/jpeg", jpeg);

        let bitmap = decoder(&tracker).decode(&file).await.unwrap();
        assert_eq!(bitmap.strategy(), "oriented");
        assert_eq!((bitmap.width(), bitmap.height()), (20, 40));
    }

    #[tokio::test]
    async fn test_bad_orientation_falls_back_to_plain() {
        let tracker = ResourceTracker::new();
        let jpeg = jpeg_with_orientation(&encoded(40, 20, ImageFormat::Jpeg), 9);
        let file = SourceFile::new("odd.jpg", "image/jpeg", jpeg);

        let bitmap = decoder(&tracker).decode(&file).await.unwrap();
        assert_eq!(bitmap.strategy(), "plain");
        assert_eq!((bitmap.width(), bitmap.height()), (40, 20));
    }

    #[tokio::test]
    async fn test_mislabelled_file_falls_back_to_rasterize() {
        let tracker = ResourceTracker::new();
        // PNG bytes declared as JPEG
        let file = SourceFile::new("fake.jpg", "image/jpeg", encoded(16, 8, ImageFormat::Png));

        let bitmap = decoder(&tracker).decode(&file).await.unwrap();
        assert_eq!(bitmap.strategy(), "rasterize");
        assert_eq!((bitmap.width(), bitmap.height()), (16, 8));
        drop(bitmap);

        // Scratch buffer and bitmap both released
        assert_eq!(tracker.acquired(), 2);
        assert_eq!(tracker.live(), 0);
    }

    #[tokio::test]
    async fn test_garbage_fails_all_strategies() {
        let tracker = ResourceTracker::new();
        let file = SourceFile::new("broken.png", "image/png", b"not an image at all".to_vec());

        let err = decoder(&tracker).decode(&file).await.unwrap_err();
        match err {
            PipelineError::Decode { name, message } => {
                assert_eq!(name, "broken.png");
                assert!(message.contains("oriented"));
                assert!(message.contains("plain"));
                assert!(message.contains("rasterize"));
            }
            other => panic!("expected decode error, got {other:?}"),
        }
        assert_eq!(tracker.live(), 0);
    }

    #[tokio::test]
    async fn test_image_too_large() {
        let tracker = ResourceTracker::new();
        let limits = LimitsConfig {
            max_image_dimension: Some(32),
            ..LimitsConfig::default()
        };
        let decoder = ImageDecoder::new(limits, tracker.clone());
        let file = SourceFile::new("big.png", "image/png", encoded(64, 8, ImageFormat::Png));

        let err = decoder.decode(&file).await.unwrap_err();
        assert!(matches!(err, PipelineError::ImageTooLarge { width: 64, .. }));
        // Rejected from the header, before any raster was produced
        assert_eq!(tracker.acquired(), 0);
    }

    #[tokio::test]
    async fn test_no_dimension_limit_by_default() {
        let tracker = ResourceTracker::new();
        let file = SourceFile::new("strip.png", "image/png", encoded(12000, 2, ImageFormat::Png));

        let bitmap = decoder(&tracker).decode(&file).await.unwrap();
        assert_eq!((bitmap.width(), bitmap.height()), (12000, 2));
    }

    struct SlowDecode;

    impl DecodeStrategy for SlowDecode {
        fn name(&self) -> &'static str {
            "slow"
        }

        fn decode(&self, _: &SourceFile, _: &ResourceTracker) -> Result<DynamicImage, String> {
            std::thread::sleep(Duration::from_millis(300));
            Ok(DynamicImage::new_rgb8(1, 1))
        }
    }

    #[tokio::test]
    async fn test_configured_timeout_applies() {
        let limits = LimitsConfig {
            decode_timeout_ms: Some(20),
            ..LimitsConfig::default()
        };
        let decoder =
            ImageDecoder::with_strategies(limits, ResourceTracker::new(), vec![Box::new(SlowDecode)]);
        let file = SourceFile::new("a.png", "image/png", Vec::<u8>::new());

        let err = decoder.decode(&file).await.unwrap_err();
        assert!(matches!(err, PipelineError::Timeout { timeout_ms: 20, .. }));
    }

    #[tokio::test]
    async fn test_no_timeout_by_default() {
        let decoder = ImageDecoder::with_strategies(
            LimitsConfig::default(),
            ResourceTracker::new(),
            vec![Box::new(SlowDecode)],
        );
        let file = SourceFile::new("a.png", "image/png", Vec::<u8>::new());

        let bitmap = decoder.decode(&file).await.unwrap();
        assert_eq!(bitmap.strategy(), "slow");
    }

    #[tokio::test]
    async fn test_empty_chain_is_decode_error() {
        let decoder =
            ImageDecoder::with_strategies(LimitsConfig::default(), ResourceTracker::new(), vec![]);
        let file = SourceFile::new("a.png", "image/png", encoded(4, 4, ImageFormat::Png));
        let err = decoder.decode(&file).await.unwrap_err();
        assert!(err.to_string().contains("no decode strategies"));
    }
}
