//! Progress-callback trait for per-document extraction events.
//!
//! Attach an [`Arc<dyn ExtractionProgressCallback>`] with
//! [`crate::run::Pipeline::with_progress`] to follow a run as it goes: a
//! terminal progress bar, a log line, a channel to a UI.
//!
//! # Example
//!
//! ```rust
//! use cvslides::ExtractionProgressCallback;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct Counter(AtomicUsize);
//!
//! impl ExtractionProgressCallback for Counter {
//!     fn on_document_complete(&self, index: usize, total: usize, name: &str) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{}/{}: {}", index + 1, total, name);
//!     }
//! }
//! ```

use std::sync::Arc;

/// Called by the pipeline as documents settle.
///
/// All methods default to no-ops. Per-document events are delivered from the
/// batch-completion step, one batch at a time, in submission order.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once after segmentation, before any extraction.
    ///
    /// # Arguments
    /// * `total_documents`: documents that will be submitted
    fn on_run_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called when a document produced a record.
    ///
    /// # Arguments
    /// * `index`: 0-based position in the overall document list
    /// * `total`: total documents
    /// * `name` : the extracted candidate name
    fn on_document_complete(&self, index: usize, total: usize, name: &str) {
        let _ = (index, total, name);
    }

    /// Called when a document failed after all attempts.
    fn on_document_error(&self, index: usize, total: usize, error: &str) {
        let _ = (index, total, error);
    }

    /// Called after each batch settles with the updated progress counter.
    fn on_batch_complete(&self, completed: usize, total: usize) {
        let _ = (completed, total);
    }

    /// Called once when the run stops, whether finished or cancelled.
    fn on_run_complete(&self, succeeded: usize, failed: usize) {
        let _ = (succeeded, failed);
    }
}

/// Default when no callback is attached.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;
