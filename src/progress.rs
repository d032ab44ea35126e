//! Progress-callback trait for job events.
//!
//! Inject an [`Arc<dyn JobProgressCallback>`] via
//! [`crate::config::ToolkitConfigBuilder::progress_callback`] to receive
//! events while a job runs. Jobs borrow themselves mutably for the whole
//! run, so callbacks are the only way to observe a run in flight.
//!
//! Pages are processed strictly one after another; callbacks are never
//! invoked concurrently for the same job. The trait is still `Send + Sync`
//! because page work hops onto the blocking thread pool.
//!
//! # Example
//!
//! ```rust
//! use pdf_toolbox::{JobProgressCallback, ToolkitConfig};
//! use std::sync::{Arc, Mutex};
//!
//! #[derive(Default)]
//! struct StatusLog(Mutex<Vec<String>>);
//!
//! impl JobProgressCallback for StatusLog {
//!     fn on_status(&self, message: &str) {
//!         self.0.lock().unwrap().push(message.to_string());
//!     }
//! }
//!
//! let config = ToolkitConfig::builder()
//!     .progress_callback(Arc::new(StatusLog::default()))
//!     .build()
//!     .unwrap();
//! ```

use crate::job::JobMode;
use std::sync::Arc;

/// Called by a job as it moves through its stages.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait JobProgressCallback: Send + Sync {
    /// Called once after validation, when the job enters `Running`.
    ///
    /// # Arguments
    /// * `mode`       : which pipeline is running
    /// * `total_units`: pages for compress/convert, documents for merge, 1 for images
    fn on_job_start(&self, mode: JobMode, total_units: usize) {
        let _ = (mode, total_units);
    }

    /// Human-readable status line ("Processing page 2 of 5...").
    fn on_status(&self, message: &str) {
        let _ = message;
    }

    /// Called just before a page is rasterised.
    ///
    /// # Arguments
    /// * `page_num`   : 1-indexed page number
    /// * `total_pages`: total pages in the document
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page was rasterised and encoded.
    ///
    /// # Arguments
    /// * `encoded_len`: byte length of the encoded page image
    fn on_page_complete(&self, page_num: usize, total_pages: usize, encoded_len: usize) {
        let _ = (page_num, total_pages, encoded_len);
    }

    /// Called when a page failed and was left out of the output.
    fn on_page_skipped(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once when the job reaches a terminal state.
    ///
    /// # Arguments
    /// * `success_count`: units that made it into the output (0 on failure)
    fn on_job_complete(&self, mode: JobMode, total_units: usize, success_count: usize) {
        let _ = (mode, total_units, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl JobProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ToolkitConfig`].
pub type ProgressCallback = Arc<dyn JobProgressCallback>;
