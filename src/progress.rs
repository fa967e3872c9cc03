//! Progress-callback trait for per-annotation export events.
//!
//! Inject an [`Arc<dyn ExportProgressCallback>`] via
//! [`crate::config::EditorConfigBuilder::progress_callback`] to be told as
//! the compositor draws (or skips) each annotation.
//!
//! The compositor runs on a blocking thread, so the trait is `Send + Sync`.
//!
//! # Example
//!
//! ```rust
//! use pdf_annotator::{EditorConfig, ExportProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     drawn: AtomicUsize,
//! }
//!
//! impl ExportProgressCallback for CountingCallback {
//!     fn on_annotation_drawn(&self, page: u32, index: usize, total: usize) {
//!         self.drawn.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("page {page}: {}/{total}", index + 1);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { drawn: AtomicUsize::new(0) });
//!
//! let config = EditorConfig::builder()
//!     .progress_callback(counter as Arc<dyn ExportProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the export compositor as it works through the annotations.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait ExportProgressCallback: Send + Sync {
    /// Called once after the fresh copy is parsed, before anything is drawn.
    ///
    /// # Arguments
    /// * `total` — number of annotations that will be attempted
    fn on_export_start(&self, total: usize) {
        let _ = total;
    }

    /// Called after an annotation has been drawn.
    ///
    /// # Arguments
    /// * `page`  — 1-based target page
    /// * `index` — 0-based position among all annotations, skipped ones
    ///   included
    /// * `total` — number of annotations attempted
    fn on_annotation_drawn(&self, page: u32, index: usize, total: usize) {
        let _ = (page, index, total);
    }

    /// Called when an annotation is skipped.
    ///
    /// # Arguments
    /// * `page`  — 1-based target page
    /// * `error` — human-readable reason
    fn on_annotation_skipped(&self, page: u32, error: &str) {
        let _ = (page, error);
    }

    /// Called once after the document has been serialised.
    ///
    /// # Arguments
    /// * `drawn`   — annotations drawn
    /// * `skipped` — annotations skipped
    fn on_export_complete(&self, drawn: usize, skipped: usize) {
        let _ = (drawn, skipped);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExportProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::EditorConfig`].
pub type ProgressCallback = Arc<dyn ExportProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        total: AtomicUsize,
        drawn: AtomicUsize,
        skipped: AtomicUsize,
        finished: AtomicUsize,
    }

    impl ExportProgressCallback for TrackingCallback {
        fn on_export_start(&self, total: usize) {
            self.total.store(total, Ordering::SeqCst);
        }

        fn on_annotation_drawn(&self, _page: u32, _index: usize, _total: usize) {
            self.drawn.fetch_add(1, Ordering::SeqCst);
        }

        fn on_annotation_skipped(&self, _page: u32, _error: &str) {
            self.skipped.fetch_add(1, Ordering::SeqCst);
        }

        fn on_export_complete(&self, drawn: usize, skipped: usize) {
            self.finished.store(drawn + skipped, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_export_start(3);
        cb.on_annotation_drawn(1, 0, 3);
        cb.on_annotation_skipped(2, "bad image");
        cb.on_export_complete(2, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_export_start(3);
        tracker.on_annotation_drawn(1, 0, 3);
        tracker.on_annotation_drawn(1, 1, 3);
        tracker.on_annotation_skipped(2, "unsupported image");
        tracker.on_export_complete(2, 1);

        assert_eq!(tracker.total.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.drawn.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.skipped.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.finished.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_export_start(1);
        cb.on_annotation_drawn(1, 0, 1);
    }
}
