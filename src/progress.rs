//! Progress-callback trait for per-image batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as the orchestrator works through a batch.
//!
//! # Example
//!
//! ```rust
//! use quiz_ocr::{BatchProgressCallback, ExtractionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_image_complete(&self, index: usize, total: usize, processed_with: &str, confidence: f32) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Image {}/{} via {} ({:.2})", index + 1, total, processed_with, confidence);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { completed: AtomicUsize::new(0) });
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(counter as Arc<dyn BatchProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the batch orchestrator as it processes each image.
///
/// Images are processed one after another, so calls never overlap within
/// a batch; implementations are still `Send + Sync` because a callback may
/// be shared by concurrent batches. All methods default to no-ops.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once, after validation, before the first image.
    ///
    /// # Arguments
    /// * `total_images`: primary plus auxiliary images in this batch
    fn on_batch_start(&self, total_images: usize) {
        let _ = total_images;
    }

    /// Called before recognition starts for an image.
    ///
    /// # Arguments
    /// * `index`: 0-based position (0 is the primary image)
    /// * `total`: images in the batch
    /// * `file_name`: original file name of the image
    fn on_image_start(&self, index: usize, total: usize, file_name: &str) {
        let _ = (index, total, file_name);
    }

    /// Called when an image has been recognised and analysed.
    ///
    /// # Arguments
    /// * `processed_with`: `"local"` or `"remote+local"`
    /// * `confidence`: confidence of the winning text
    fn on_image_complete(&self, index: usize, total: usize, processed_with: &str, confidence: f32) {
        let _ = (index, total, processed_with, confidence);
    }

    /// Called once after every image completed successfully.
    fn on_batch_complete(&self, total_images: usize) {
        let _ = total_images;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;
