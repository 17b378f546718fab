//! Progress-callback trait for per-file batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] into
//! [`crate::config::OcrConfig`] or [`crate::config::RewriteConfig`] to receive
//! events as the batch driver works through its file list. The library itself
//! only emits `tracing` events; the binaries turn these callbacks into the
//! `[i/n] Processing …` lines and the progress bar.
//!
//! # Example
//!
//! ```rust
//! use verdict_pipeline::{BatchProgressCallback, FileResult};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct Counter(AtomicUsize);
//!
//! impl BatchProgressCallback for Counter {
//!     fn on_file_complete(&self, _total: usize, result: &FileResult) {
//!         if result.outcome.is_written() {
//!             self.0.fetch_add(1, Ordering::SeqCst);
//!         }
//!     }
//! }
//! ```

use crate::output::{BatchReport, FileResult};
use std::sync::Arc;

/// Called by the batch drivers as they process each file.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
///
/// # Thread safety
///
/// With `concurrency > 1`, `on_file_start` and `on_file_complete` may be
/// called from several tasks at once and in completion order rather than
/// file order.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once after the file list is known, before any request is sent.
    fn on_batch_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called just before a file is read and sent.
    ///
    /// `index` is 1-indexed in sorted order.
    fn on_file_start(&self, index: usize, total_files: usize, name: &str) {
        let _ = (index, total_files, name);
    }

    /// Called for each page the OCR service could not process.
    ///
    /// `filename` is the name the service reports for the page.
    fn on_page_failed(&self, filename: &str, error: &str) {
        let _ = (filename, error);
    }

    /// Called when a file has been written, skipped, or has failed.
    fn on_file_complete(&self, total_files: usize, result: &FileResult) {
        let _ = (total_files, result);
    }

    /// Called once after every file has been attempted.
    fn on_batch_complete(&self, report: &BatchReport) {
        let _ = report;
    }
}

/// A no-op implementation used when no callback is configured.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in the configs.
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;
