//! Resize and lossy re-encode of decoded bitmaps.

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, RgbImage, RgbaImage};

use crate::error::{PipelineError, PipelineResult};
use crate::types::{CompressionOptions, TargetFormat, WEBP_MAX_DIMENSION};

use super::bitmap::DecodedBitmap;

/// Where the raster surface was drawn and encoded.
///
/// The inline surface is only used when no tokio runtime is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    /// Blocking pool of the current tokio runtime
    Offscreen,
    /// The calling task
    Inline,
}

/// Result of encoding a bitmap.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    /// Encoded file contents
    pub bytes: Vec<u8>,
    /// Output width in pixels
    pub width: u32,
    /// Output height in pixels
    pub height: u32,
    /// Output format
    pub format: TargetFormat,
    /// Surface the encode ran on
    pub surface: SurfaceKind,
}

/// Output dimensions for an image bounded by `max_side` on its longest edge.
///
/// Only ever shrinks; each side is rounded and kept at least 1 pixel.
pub fn target_dimensions(width: u32, height: u32, max_side: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_side {
        return (width.max(1), height.max(1));
    }
    let factor = max_side as f64 / longest as f64;
    let scale = |side: u32| ((side as f64 * factor).round() as u32).max(1);
    (scale(width), scale(height))
}

/// Encodes bitmaps, preferring an off-task surface when a runtime is present.
#[derive(Debug, Clone, Default)]
pub struct ImageEncoder;

impl ImageEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Resize and encode a bitmap. `name` is only used for error context.
    pub async fn encode(
        &self,
        bitmap: &DecodedBitmap,
        options: &CompressionOptions,
        name: &str,
    ) -> PipelineResult<EncodedImage> {
        let encode_error = |message: String| PipelineError::Encode {
            name: name.to_string(),
            message,
        };
        let raster = bitmap
            .raster()
            .ok_or_else(|| encode_error("bitmap already released".to_string()))?;
        let options = *options;

        if tokio::runtime::Handle::try_current().is_ok() {
            let job = std::sync::Arc::clone(&raster);
            return run_offscreen(move || render(&job, &options))
                .await
                .map_err(encode_error);
        }

        render(&raster, &options)
            .map(|encoded| encoded.on(SurfaceKind::Inline))
            .map_err(encode_error)
    }
}

impl EncodedImage {
    fn on(mut self, surface: SurfaceKind) -> Self {
        self.surface = surface;
        self
    }
}

/// Run a render job on the blocking pool. A job that panics or is cancelled
/// is an error; it is not retried inline.
async fn run_offscreen<F>(job: F) -> Result<EncodedImage, String>
where
    F: FnOnce() -> Result<EncodedImage, String> + Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| format!("offscreen encode task failed: {e}"))?
        .map(|encoded| encoded.on(SurfaceKind::Offscreen))
}

/// Draw onto a surface of the target size and encode it. Both surface kinds
/// run exactly this routine.
fn render(image: &DynamicImage, options: &CompressionOptions) -> Result<EncodedImage, String> {
    let (width, height) = target_dimensions(image.width(), image.height(), options.max_side);
    if options.format == TargetFormat::Webp && width.max(height) > WEBP_MAX_DIMENSION {
        return Err(format!(
            "{width}x{height} exceeds the WebP limit of {WEBP_MAX_DIMENSION} pixels per side"
        ));
    }
    let surface = draw_surface(image, width, height)?;

    let bytes = match options.format {
        TargetFormat::Webp => encode_webp(&surface, options.quality)?,
        TargetFormat::Jpeg => encode_jpeg(&surface, options.quality)?,
    };

    Ok(EncodedImage {
        bytes,
        width,
        height,
        format: options.format,
        surface: SurfaceKind::Inline,
    })
}

/// Allocate an RGBA surface and draw the image onto it at the given size.
fn draw_surface(image: &DynamicImage, width: u32, height: u32) -> Result<RgbaImage, String> {
    let byte_len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|px| px.checked_mul(4))
        .filter(|&len| len > 0 && len <= isize::MAX as usize)
        .ok_or_else(|| format!("no drawable surface for {width}x{height}"))?;
    tracing::trace!("Surface {}x{} ({} bytes)", width, height, byte_len);

    if (width, height) == (image.width(), image.height()) {
        Ok(image.to_rgba8())
    } else {
        Ok(image.thumbnail_exact(width, height).to_rgba8())
    }
}

fn encode_webp(surface: &RgbaImage, quality: f32) -> Result<Vec<u8>, String> {
    let encoder = webp::Encoder::from_rgba(surface.as_raw(), surface.width(), surface.height());
    let memory = encoder
        .encode_simple(false, quality * 100.0)
        .map_err(|e| format!("WebP encoding failed: {e:?}"))?;
    Ok(memory.to_vec())
}

fn encode_jpeg(surface: &RgbaImage, quality: f32) -> Result<Vec<u8>, String> {
    let flat = flatten_onto_white(surface);
    let quality = (quality * 100.0).round().clamp(1.0, 100.0) as u8;
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality)
        .encode(flat.as_raw(), flat.width(), flat.height(), ExtendedColorType::Rgb8)
        .map_err(|e| format!("JPEG encoding failed: {e}"))?;
    Ok(buf)
}

/// JPEG has no alpha channel; composite over white.
fn flatten_onto_white(surface: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(surface.width(), surface.height(), |x, y| {
        let [r, g, b, a] = surface.get_pixel(x, y).0;
        let alpha = a as u16;
        let blend = |c: u8| ((c as u16 * alpha + 255 * (255 - alpha)) / 255) as u8;
        image::Rgb([blend(r), blend(g), blend(b)])
    })
}
