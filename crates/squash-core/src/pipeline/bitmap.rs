//! Decoded rasters and scratch buffers with tracked, scoped release.
//!
//! Both resources are released exactly once: explicitly through `release()`
//! or implicitly on drop, whichever comes first. A shared
//! [`ResourceTracker`] counts acquisitions and releases so that leaks show up
//! as a non-zero live count.

use image::DynamicImage;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Counts acquired and released pipeline resources.
#[derive(Debug, Clone, Default)]
pub struct ResourceTracker {
    counters: Arc<Counters>,
}

#[derive(Debug, Default)]
struct Counters {
    acquired: AtomicUsize,
    released: AtomicUsize,
}

impl ResourceTracker {
    /// Create a tracker with zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    fn acquire(&self) {
        self.counters.acquired.fetch_add(1, Ordering::AcqRel);
    }

    fn release(&self) {
        self.counters.released.fetch_add(1, Ordering::AcqRel);
    }

    /// Total resources acquired so far.
    pub fn acquired(&self) -> usize {
        self.counters.acquired.load(Ordering::Acquire)
    }

    /// Total resources released so far.
    pub fn released(&self) -> usize {
        self.counters.released.load(Ordering::Acquire)
    }

    /// Resources currently held.
    pub fn live(&self) -> usize {
        self.acquired().saturating_sub(self.released())
    }
}

/// A decoded raster owned by one pipeline invocation.
pub struct DecodedBitmap {
    raster: Option<Arc<DynamicImage>>,
    width: u32,
    height: u32,
    strategy: &'static str,
    tracker: ResourceTracker,
}

impl DecodedBitmap {
    pub(crate) fn new(image: DynamicImage, strategy: &'static str, tracker: &ResourceTracker) -> Self {
        tracker.acquire();
        Self {
            width: image.width(),
            height: image.height(),
            raster: Some(Arc::new(image)),
            strategy,
            tracker: tracker.clone(),
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Name of the decode strategy that produced this bitmap.
    pub fn strategy(&self) -> &'static str {
        self.strategy
    }

    /// Whether the pixel data has been released.
    pub fn is_released(&self) -> bool {
        self.raster.is_none()
    }

    /// Shared handle to the pixels for an encode job, or `None` once released.
    ///
    /// A job holding the handle keeps the pixels alive until it finishes even
    /// if the bitmap itself is released first.
    pub(crate) fn raster(&self) -> Option<Arc<DynamicImage>> {
        self.raster.clone()
    }

    /// Free the pixel data. Returns `false` if it was already released.
    pub fn release(&mut self) -> bool {
        match self.raster.take() {
            Some(raster) => {
                drop(raster);
                self.tracker.release();
                true
            }
            None => false,
        }
    }
}

impl Drop for DecodedBitmap {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for DecodedBitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedBitmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("strategy", &self.strategy)
            .field("released", &self.is_released())
            .finish()
    }
}

/// Temporary byte buffer used while re-rasterizing an image.
pub(crate) struct ScratchBuffer {
    buf: Option<Vec<u8>>,
    tracker: ResourceTracker,
}

impl ScratchBuffer {
    pub(crate) fn acquire(tracker: &ResourceTracker) -> Self {
        tracker.acquire();
        Self {
            buf: Some(Vec::new()),
            tracker: tracker.clone(),
        }
    }

    /// Mutable access to the buffer. Empty after release.
    pub(crate) fn buffer(&mut self) -> &mut Vec<u8> {
        self.buf.get_or_insert_with(Vec::new)
    }

    pub(crate) fn as_slice(&self) -> &[u8] {
        self.buf.as_deref().unwrap_or(&[])
    }
}

impl Drop for ScratchBuffer {
    fn drop(&mut self) {
        if self.buf.take().is_some() {
            self.tracker.release();
        }
    }
}
