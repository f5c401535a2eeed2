//! Pipeline orchestration: classify, bypass or decode + encode, batch drain.

use std::borrow::Cow;
use std::collections::VecDeque;
use std::path::Path;

use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use crate::types::{
    CompressionOptions, CompressionPlan, MediaType, OutputFile, SourceFile, TargetFormat,
};

use super::bitmap::ResourceTracker;
use super::classify::{classify, compression_plan, plan_for, ALLOWED_MEDIA_TYPES};
use super::decode::{DecodeStrategy, ImageDecoder};
use super::encode::ImageEncoder;
use super::pool::drain_with_workers;

/// Compresses single files and batches.
pub struct Compressor {
    decoder: ImageDecoder,
    encoder: ImageEncoder,
    parallel_workers: usize,
    tracker: ResourceTracker,
}

impl Compressor {
    /// Create a compressor with the default decode chain.
    pub fn new(config: &Config) -> Self {
        let tracker = ResourceTracker::new();
        Self {
            decoder: ImageDecoder::new(config.limits.clone(), tracker.clone()),
            encoder: ImageEncoder::new(),
            parallel_workers: config.processing.parallel_workers,
            tracker,
        }
    }

    /// Create a compressor with a custom decode chain.
    pub fn with_strategies(config: &Config, strategies: Vec<Box<dyn DecodeStrategy>>) -> Self {
        let tracker = ResourceTracker::new();
        Self {
            decoder: ImageDecoder::with_strategies(
                config.limits.clone(),
                tracker.clone(),
                strategies,
            ),
            encoder: ImageEncoder::new(),
            parallel_workers: config.processing.parallel_workers,
            tracker,
        }
    }

    /// Resource counters for bitmaps and scratch buffers.
    pub fn tracker(&self) -> &ResourceTracker {
        &self.tracker
    }

    /// Compress a single file.
    ///
    /// HEIC/HEIF files come back as the input itself (payload shared, name
    /// and type unchanged). Everything else is decoded, bounded to
    /// `options.max_side` and re-encoded to `options.format`.
    pub async fn compress_one(
        &self,
        file: &SourceFile,
        options: &CompressionOptions,
    ) -> PipelineResult<OutputFile> {
        options.validate()?;
        let start = std::time::Instant::now();

        let media_type = classify(file);
        if !ALLOWED_MEDIA_TYPES.contains(&media_type) {
            return Err(PipelineError::UnsupportedType {
                name: file.name.clone(),
                media_type: file.media_type.clone(),
            });
        }

        if plan_for(media_type) == CompressionPlan::Bypass {
            tracing::debug!("Bypassing {} ({})", file.name, media_type);
            return Ok(file.clone());
        }

        let normalized = normalize_alias(file);

        let decode_start = std::time::Instant::now();
        let mut bitmap = self.decoder.decode(&normalized).await?;
        tracing::trace!("  Decode: {:?} via {}", decode_start.elapsed(), bitmap.strategy());

        let encode_start = std::time::Instant::now();
        let encoded = self.encoder.encode(&bitmap, options, &file.name).await;
        bitmap.release();
        let encoded = encoded?;
        tracing::trace!("  Encode: {:?} on {:?}", encode_start.elapsed(), encoded.surface);

        tracing::debug!(
            "Compressed {} in {:?} ({}x{} -> {}x{}, {} -> {} bytes)",
            file.name,
            start.elapsed(),
            bitmap.width(),
            bitmap.height(),
            encoded.width,
            encoded.height,
            file.len(),
            encoded.bytes.len()
        );

        Ok(SourceFile::new(
            output_name(&file.name, options.format),
            options.format.mime(),
            encoded.bytes,
        ))
    }

    /// Compress a batch. Output order is unspecified: bypassed files come
    /// first, then compressed files in completion order. The first failure
    /// aborts the batch.
    pub async fn compress_many(
        &self,
        files: Vec<SourceFile>,
        options: &CompressionOptions,
    ) -> PipelineResult<Vec<OutputFile>> {
        self.compress_many_with_progress(files, options, |_| {}).await
    }

    /// Like [`compress_many`](Self::compress_many), calling `on_file` for
    /// every output as it is produced.
    pub async fn compress_many_with_progress<F>(
        &self,
        files: Vec<SourceFile>,
        options: &CompressionOptions,
        on_file: F,
    ) -> PipelineResult<Vec<OutputFile>>
    where
        F: Fn(&OutputFile) + Sync,
    {
        options.validate()?;
        let total = files.len();
        let mut outputs = Vec::with_capacity(total);
        let mut pending = VecDeque::with_capacity(total);

        for file in files {
            match compression_plan(&file) {
                CompressionPlan::Bypass => {
                    on_file(&file);
                    outputs.push(file);
                }
                CompressionPlan::Compress => pending.push_back(file),
            }
        }

        if pending.is_empty() {
            tracing::debug!("All {} file(s) bypassed", total);
            return Ok(outputs);
        }

        let workers = self.parallel_workers.min(pending.len());
        tracing::debug!(
            "Compressing {} file(s) with {} worker(s), {} bypassed",
            pending.len(),
            workers,
            outputs.len()
        );

        let on_file = &on_file;
        let compressed = drain_with_workers(pending, workers, |file| async move {
            let output = self.compress_one(&file, options).await?;
            on_file(&output);
            Ok::<_, PipelineError>(output)
        })
        .await?;

        outputs.extend(compressed);
        Ok(outputs)
    }
}

/// `image/jpg` is not a registered type; decoders expect `image/jpeg`.
fn normalize_alias(file: &SourceFile) -> Cow<'_, SourceFile> {
    if file.media_type.trim().eq_ignore_ascii_case("image/jpg") {
        Cow::Owned(file.with_media_type(MediaType::Jpeg.mime()))
    } else {
        Cow::Borrowed(file)
    }
}

/// Swap the filename extension for the target format's.
fn output_name(name: &str, format: TargetFormat) -> String {
    let renamed = Path::new(name).with_extension(format.extension());
    match renamed.to_str() {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => format!("image.{}", format.extension()),
    }
}
