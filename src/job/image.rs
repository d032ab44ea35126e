//! Image compression: re-encode a single raster image as JPEG.

use super::{Job, JobMode, JobPipeline, PipelineContext, PipelineOutput};
use crate::config::{Quality, ToolkitConfig};
use crate::error::ToolkitError;
use crate::pipeline::encode::JPEG_MIME;
use crate::pipeline::input::AcceptedFile;
use crate::report::SizeReport;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// An uploaded image, not yet decoded.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub name: String,
    pub mime: String,
    pub bytes: Arc<[u8]>,
}

impl From<AcceptedFile> for SourceImage {
    fn from(file: AcceptedFile) -> Self {
        Self {
            name: file.name,
            mime: file.mime,
            bytes: file.bytes.into(),
        }
    }
}

/// `photo.png` → `photo.jpg`.
pub fn jpeg_name(source_name: &str) -> String {
    let stem = Path::new(source_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "compressed-image".to_string());
    format!("{stem}.jpg")
}

#[derive(Debug)]
pub struct ImageCompressPipeline {
    image: Option<SourceImage>,
    quality: Quality,
}

impl JobPipeline for ImageCompressPipeline {
    type Input = (SourceImage, Quality);

    fn mode(&self) -> JobMode {
        JobMode::ImageCompress
    }

    fn prepare(&self) -> Result<Self::Input, ToolkitError> {
        let image = self.image.clone().ok_or(ToolkitError::NoDocument)?;
        Ok((image, self.quality))
    }

    fn units(&self, _input: &Self::Input) -> usize {
        1
    }

    async fn execute(
        &mut self,
        (source, quality): Self::Input,
        ctx: &PipelineContext,
    ) -> Result<PipelineOutput, ToolkitError> {
        let encoder = Arc::clone(&ctx.encoder);
        let bytes = Arc::clone(&source.bytes);
        let name = source.name.clone();

        let encoded = tokio::task::spawn_blocking(move || {
            let decoded = ::image::load_from_memory(&bytes).map_err(|e| {
                ToolkitError::PipelineFailure {
                    detail: format!("failed to decode '{}': {}", name, e),
                }
            })?;
            encoder
                .encode(&decoded, quality)
                .map_err(|e| ToolkitError::PipelineFailure {
                    detail: format!("failed to encode '{}': {}", name, e),
                })
        })
        .await
        .map_err(|e| ToolkitError::Internal(format!("Encode task panicked: {}", e)))??;

        let report = SizeReport::new(source.bytes.len() as u64, encoded.len() as u64);
        info!(name = %source.name, %quality, "{}", report);

        Ok(PipelineOutput {
            bytes: encoded.bytes,
            mime: JPEG_MIME.to_string(),
            filename: jpeg_name(&source.name),
            report: Some(report),
            pages_written: 1,
            pages_skipped: 0,
        })
    }

    fn reset(&mut self) {
        self.image = None;
    }
}

/// Single-image JPEG compressor.
pub type ImageCompressJob = Job<ImageCompressPipeline>;

impl Job<ImageCompressPipeline> {
    pub fn new(config: ToolkitConfig) -> Self {
        let pipeline = ImageCompressPipeline {
            image: None,
            quality: config.default_quality,
        };
        Job::with_pipeline(pipeline, config)
    }

    /// Replace the loaded image. Any previous result is discarded.
    ///
    /// Decoding is deferred to [`Job::run`]; a corrupt image moves the job
    /// to `Failed` with a [`ToolkitError::PipelineFailure`].
    pub fn load(&mut self, image: impl Into<SourceImage>) {
        self.clear_result();
        self.pipeline.image = Some(image.into());
    }

    pub fn image(&self) -> Option<&SourceImage> {
        self.pipeline.image.as_ref()
    }

    pub fn set_quality(&mut self, quality: f32) {
        self.pipeline.quality = Quality::new(quality);
    }

    pub fn quality(&self) -> Quality {
        self.pipeline.quality
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png(w: u32, h: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(w, h, |x, y| {
            Rgb([(x * 7) as u8, (y * 13) as u8, ((x + y) * 3) as u8])
        }));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    fn upload(name: &str, bytes: Vec<u8>) -> AcceptedFile {
        AcceptedFile {
            name: name.into(),
            mime: "image/png".into(),
            bytes,
        }
    }

    #[test]
    fn output_name_uses_jpg_extension() {
        assert_eq!(jpeg_name("holiday.png"), "holiday.jpg");
        assert_eq!(jpeg_name("scan.jpeg"), "scan.jpg");
        assert_eq!(jpeg_name(""), "compressed-image.jpg");
    }

    #[tokio::test]
    async fn compresses_png_to_jpeg() {
        let mut job = ImageCompressJob::new(ToolkitConfig::default());
        let original = png(48, 32);
        let original_len = original.len() as u64;
        job.load(upload("photo.png", original));

        let outcome = job.run().await.unwrap();
        assert_eq!(outcome.filename, "photo.jpg");
        assert_eq!(outcome.mime, JPEG_MIME);
        assert_eq!(outcome.report.unwrap().original_bytes, original_len);

        let decoded = ::image::load_from_memory(job.artifact().unwrap().bytes()).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (48, 32));
    }

    #[tokio::test]
    async fn corrupt_image_fails_the_run() {
        let mut job = ImageCompressJob::new(ToolkitConfig::default());
        job.load(upload("broken.png", b"not an image".to_vec()));
        let err = job.run().await.unwrap_err();
        assert!(matches!(err, ToolkitError::PipelineFailure { .. }));
        // It changed state, so it must not be classed as a validation error.
        assert!(!err.is_validation());
        assert!(job.state().error().unwrap().contains("broken.png"));
        assert!(job.artifact().is_none());
    }

    #[tokio::test]
    async fn run_without_image_is_rejected() {
        let mut job = ImageCompressJob::new(ToolkitConfig::default());
        assert!(matches!(
            job.run().await.unwrap_err(),
            ToolkitError::NoDocument
        ));
    }
}
