//! Progress-callback trait for intake and submission events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ClientConfigBuilder::progress_callback`] to receive
//! events as files are probed and the batch is uploaded.
//!
//! # No percentages
//!
//! The upload endpoint does not report conversion progress, so there is no
//! `on_submit_progress(percent)`. Submission is bracketed by
//! `on_submit_start` / `on_submit_complete`; a UI should show an
//! indeterminate spinner in between.
//!
//! # Example
//!
//! ```rust
//! use edgequake_imgconvert::{ClientConfig, ConversionProgressCallback, FileRecord};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     ready: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_record_ready(&self, index: usize, total: usize, record: &FileRecord) {
//!         self.ready.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("[{}/{}] {}", index + 1, total, record.display_name);
//!     }
//! }
//!
//! let cb = Arc::new(CountingCallback { ready: AtomicUsize::new(0) });
//! let config = ClientConfig::builder()
//!     .progress_callback(cb as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::intake::FileRecord;
use std::sync::Arc;

/// Called by intake and submission as work progresses.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
///
/// # Ordering
///
/// Probes complete in any order. `on_record_ready` therefore receives the
/// record's position in the submitted batch (`index`), and a list view must
/// place the row at that index rather than appending.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once after validation, before any file is probed.
    fn on_intake_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called when a file's probes have finished (successfully or not).
    ///
    /// # Arguments
    /// * `index`: 0-based position within the ingested batch
    /// * `total`: files in the batch
    /// * `record`: the finished record
    fn on_record_ready(&self, index: usize, total: usize, record: &FileRecord) {
        let _ = (index, total, record);
    }

    /// Called when one of a file's probes failed. The record is still
    /// admitted and `on_record_ready` still fires for it.
    fn on_probe_error(&self, index: usize, error: &str) {
        let _ = (index, error);
    }

    /// Called once after every record of the batch was appended.
    fn on_intake_complete(&self, admitted: usize, selection_len: usize) {
        let _ = (admitted, selection_len);
    }

    /// Called right before the upload request is sent.
    fn on_submit_start(&self, file_count: usize) {
        let _ = file_count;
    }

    /// Called when the upload finished. `error` is `None` on success.
    fn on_submit_complete(&self, error: Option<&str>) {
        let _ = error;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ClientConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
