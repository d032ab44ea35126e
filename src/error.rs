//! Error types for the pdf-toolbox library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ToolkitError`]: **Fatal**: the job cannot produce an artifact
//!   (rejected file, unreadable PDF, fewer than two merge inputs, every page
//!   failed). Returned as `Err(ToolkitError)` from loaders and from
//!   [`crate::job::Job::run`].
//!
//! * [`PageError`]: **Non-fatal**: a single page failed to rasterise or
//!   encode while compressing or converting. The page is left out of the
//!   output and the run continues; the error only surfaces through logs and
//!   [`crate::progress::JobProgressCallback::on_page_skipped`].
//!
//! Merge has no page-level errors: any failure there aborts the whole run.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf-toolbox library.
#[derive(Debug, Error)]
pub enum ToolkitError {
    // ── Acquisition errors ────────────────────────────────────────────────
    /// The offered file is not of the accepted type. Raised before any
    /// loader or job sees the bytes.
    #[error("'{name}' was rejected: {reason}")]
    RejectedFile { name: String, reason: String },

    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    // ── Document errors ───────────────────────────────────────────────────
    /// The bytes are not a PDF that can be opened without a password.
    #[error("'{name}' is not a valid PDF: {detail}\nMake sure the file is not corrupted or password-protected.")]
    InvalidFormat { name: String, detail: String },

    /// Merge was started with fewer than two documents.
    #[error("Please select at least {required} PDF files to merge (got {provided}).")]
    InsufficientInput { required: usize, provided: usize },

    /// Compress, convert, or image compression was started before a file was loaded.
    #[error("No file loaded. Select a file before starting.")]
    NoDocument,

    // ── Pipeline errors ───────────────────────────────────────────────────
    /// An unrecoverable failure while building the output.
    #[error("An error occurred while processing: {detail}")]
    PipelineFailure { detail: String },

    /// Every page failed; the output would be empty.
    #[error("All {total} pages failed to render.\nFirst error: {first_error}")]
    NoPagesProduced { total: usize, first_error: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Compress and convert need the pdfium shared library at runtime.\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium (or pass --pdfium-lib).\n\
  • Or place libpdfium next to the binary / install it system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ToolkitError {
    /// Whether this error was raised before the job entered `Running`.
    ///
    /// Validation errors leave the job state untouched.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ToolkitError::RejectedFile { .. }
                | ToolkitError::FileNotFound { .. }
                | ToolkitError::PermissionDenied { .. }
                | ToolkitError::InvalidFormat { .. }
                | ToolkitError::InsufficientInput { .. }
                | ToolkitError::NoDocument
        )
    }
}

/// A non-fatal error for a single page.
///
/// Compress and convert skip the page and keep going. The run only fails
/// when no page at all could be produced.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// Page rasterisation failed.
    #[error("Page {page}: rasterisation failed: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// Lossy encoding of the rendered bitmap failed.
    #[error("Page {page}: image encoding failed: {detail}")]
    EncodeFailed { page: usize, detail: String },
}

impl PageError {
    /// 1-indexed page number the error refers to.
    pub fn page(&self) -> usize {
        match self {
            PageError::RenderFailed { page, .. } | PageError::EncodeFailed { page, .. } => *page,
        }
    }
}
