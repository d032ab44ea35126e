//! Configuration types shared by every job.
//!
//! All tunable behaviour is controlled through [`ToolkitConfig`], built via
//! its [`ToolkitConfigBuilder`]. A job takes its own copy of the config when
//! it is created, so two jobs never share mutable settings.
//!
//! Two values are deliberately *not* configurable: the render scale used for
//! rasterisation ([`RENDER_SCALE`]) and the quality used by the convert mode
//! ([`CONVERT_QUALITY`]). Convert favours fidelity over size, and compress
//! only exposes quality.

use crate::error::ToolkitError;
use crate::pipeline::encode::ImageEncoder;
use crate::pipeline::render::PageRasterizer;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Scale factor applied to every page before rasterisation.
///
/// 1.5× keeps body text legible after lossy JPEG re-encoding.
pub const RENDER_SCALE: f32 = 1.5;

/// Fixed JPEG quality used by the convert mode.
pub const CONVERT_QUALITY: Quality = Quality(0.95);

/// Default JPEG quality for compress and image compression.
pub const DEFAULT_QUALITY: Quality = Quality(0.7);

/// Base name of the merged document (the `.pdf` extension is appended).
pub const DEFAULT_MERGED_STEM: &str = "merged-document";

/// Lossy-encoding quality factor, always within `[0.1, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(into = "f32", from = "f32")]
pub struct Quality(f32);

impl Quality {
    pub const MIN: f32 = 0.1;
    pub const MAX: f32 = 1.0;

    /// Clamp `value` into range. NaN falls back to [`DEFAULT_QUALITY`].
    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            return DEFAULT_QUALITY;
        }
        Quality(value.clamp(Self::MIN, Self::MAX))
    }

    /// Strict constructor: rejects values outside `[0.1, 1.0]`.
    pub fn try_new(value: f32) -> Result<Self, ToolkitError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Quality(value))
        } else {
            Err(ToolkitError::InvalidConfig(format!(
                "quality must be {}–{}, got {}",
                Self::MIN,
                Self::MAX,
                value
            )))
        }
    }

    pub fn value(self) -> f32 {
        self.0
    }

    /// The 1–100 scale used by JPEG encoders.
    pub fn as_jpeg_quality(self) -> u8 {
        (self.0 * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

impl Default for Quality {
    fn default() -> Self {
        DEFAULT_QUALITY
    }
}

impl From<f32> for Quality {
    fn from(value: f32) -> Self {
        Quality::new(value)
    }
}

impl From<Quality> for f32 {
    fn from(q: Quality) -> Self {
        q.0
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.0}%", self.0 * 100.0)
    }
}

/// Configuration for merge, compress, convert, and image-compress jobs.
///
/// # Example
/// ```rust
/// use pdf_toolbox::ToolkitConfig;
///
/// let config = ToolkitConfig::builder()
///     .default_quality(0.5)
///     .merged_file_stem("bundle")
///     .build()
///     .unwrap();
/// assert_eq!(config.default_quality.value(), 0.5);
/// ```
#[derive(Clone)]
pub struct ToolkitConfig {
    /// Initial quality of compress and image-compress jobs. Default: 0.7.
    pub default_quality: Quality,

    /// File stem of the merge output. Default: `merged-document`.
    pub merged_file_stem: String,

    /// Explicit path to the pdfium shared library.
    ///
    /// If None, `PDFIUM_LIB_PATH`, the working directory, and the system
    /// library search path are tried in that order.
    pub pdfium_library_path: Option<PathBuf>,

    /// Pre-constructed rasteriser. Takes precedence over the pdfium default.
    pub rasterizer: Option<Arc<dyn PageRasterizer>>,

    /// Pre-constructed encoder. Defaults to baseline JPEG.
    pub encoder: Option<Arc<dyn ImageEncoder>>,

    /// Receives per-page and status events while a job runs.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ToolkitConfig {
    fn default() -> Self {
        Self {
            default_quality: DEFAULT_QUALITY,
            merged_file_stem: DEFAULT_MERGED_STEM.to_string(),
            pdfium_library_path: None,
            rasterizer: None,
            encoder: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ToolkitConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolkitConfig")
            .field("default_quality", &self.default_quality)
            .field("merged_file_stem", &self.merged_file_stem)
            .field("pdfium_library_path", &self.pdfium_library_path)
            .field(
                "rasterizer",
                &self.rasterizer.as_ref().map(|_| "<dyn PageRasterizer>"),
            )
            .field("encoder", &self.encoder.as_ref().map(|_| "<dyn ImageEncoder>"))
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn JobProgressCallback>"),
            )
            .finish()
    }
}

impl ToolkitConfig {
    /// Create a new builder for `ToolkitConfig`.
    pub fn builder() -> ToolkitConfigBuilder {
        ToolkitConfigBuilder {
            config: Self::default(),
        }
    }

    /// File name of the merge output.
    pub fn merged_file_name(&self) -> String {
        format!("{}.pdf", self.merged_file_stem)
    }
}

/// Builder for [`ToolkitConfig`].
pub struct ToolkitConfigBuilder {
    config: ToolkitConfig,
}

impl fmt::Debug for ToolkitConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolkitConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl ToolkitConfigBuilder {
    pub fn default_quality(mut self, q: f32) -> Self {
        self.config.default_quality = Quality::new(q);
        self
    }

    pub fn merged_file_stem(mut self, stem: impl Into<String>) -> Self {
        self.config.merged_file_stem = stem.into();
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_path = Some(path.into());
        self
    }

    pub fn rasterizer(mut self, rasterizer: Arc<dyn PageRasterizer>) -> Self {
        self.config.rasterizer = Some(rasterizer);
        self
    }

    pub fn encoder(mut self, encoder: Arc<dyn ImageEncoder>) -> Self {
        self.config.encoder = Some(encoder);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ToolkitConfig, ToolkitError> {
        let stem = self.config.merged_file_stem.trim();
        if stem.is_empty() {
            return Err(ToolkitError::InvalidConfig(
                "merged file stem must not be empty".into(),
            ));
        }
        if stem.contains(['/', '\\']) {
            return Err(ToolkitError::InvalidConfig(format!(
                "merged file stem must be a bare name, got '{stem}'"
            )));
        }
        Ok(self.config)
    }
}
