//! # pdf-toolbox
//!
//! Merge, compress, and convert PDF documents locally.
//!
//! ## Modes
//!
//! | Job | Input | Output |
//! |-----|-------|--------|
//! | [`MergeJob`] | two or more PDFs, ordered | one PDF, pages copied verbatim |
//! | [`CompressJob`] | one PDF + quality | one PDF of JPEG pages (text no longer selectable) |
//! | [`ConvertJob`] | one PDF | zip of `page_<n>.jpg` at quality 0.95 |
//! | [`ImageCompressJob`] | one image + quality | one JPEG |
//!
//! ## Pipeline Overview
//!
//! ```text
//! file
//!  │
//!  ├─ 1. Accept   type gate (application/pdf, image/*)
//!  ├─ 2. Load     parse with lopdf, read page sizes
//!  ├─ 3. Render   rasterise one page at 1.5× via pdfium (spawn_blocking)
//!  ├─ 4. Encode   JPEG at the requested quality
//!  ├─ 5. Build    merged PDF / image-only PDF / zip archive
//!  └─ 6. Emit     artifact behind a revocable `artifact:<uuid>` reference
//! ```
//!
//! Compress and convert skip pages that fail to render and only fail when
//! no page could be produced. Merge fails as a whole.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_toolbox::{pipeline::input::accept_path, CompressJob, ToolkitConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut job = CompressJob::new(ToolkitConfig::default());
//!     job.load_file(accept_path("report.pdf")?)?;
//!     job.set_quality(0.5);
//!
//!     let outcome = job.run().await?;
//!     if let Some(report) = outcome.report {
//!         println!("{}", report);
//!     }
//!     let artifact = job.artifact().expect("artifact of a successful run");
//!     std::fs::write(&outcome.filename, artifact.bytes())?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdftools` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf-toolbox = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod artifact;
pub mod config;
pub mod error;
pub mod job;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod tools;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use artifact::{ArtifactHandle, ArtifactStore, OutputArtifact};
pub use config::{
    Quality, ToolkitConfig, ToolkitConfigBuilder, CONVERT_QUALITY, DEFAULT_QUALITY, RENDER_SCALE,
};
pub use error::{PageError, ToolkitError};
pub use job::{
    CompressJob, ConvertJob, ImageCompressJob, Job, JobMode, JobOutcome, JobPipeline, JobState,
    MergeJob, PipelineContext, PipelineOutput,
};
pub use pipeline::encode::{EncodeError, EncodedImage, ImageEncoder, JpegEncoder};
pub use pipeline::load::{load_document, DocumentInfo, PageSize, SourceDocument};
pub use pipeline::render::{PageBitmap, PageRasterizer, PdfiumRasterizer};
pub use progress::{JobProgressCallback, NoopProgressCallback, ProgressCallback};
pub use report::{format_size, SizeDirection, SizeReport};
pub use tools::{inspect, write_artifact};
