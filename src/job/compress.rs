//! Compress: re-encode every page as a JPEG and rebuild the PDF.
//!
//! Text is no longer selectable in the output. Each output page keeps the
//! point size of its source page. Pages that fail are skipped.

use super::{Job, JobMode, JobPipeline, PipelineContext, PipelineOutput};
use crate::config::{Quality, ToolkitConfig};
use crate::error::ToolkitError;
use crate::pipeline::assemble::ImageDocumentBuilder;
use crate::pipeline::input::{AcceptedFile, PDF_MIME};
use crate::pipeline::load::{load_document, SourceDocument};
use crate::pipeline::pages::for_each_page;
use crate::report::SizeReport;
use std::sync::Arc;
use tracing::info;

/// Prefix of the compressed file name.
pub const COMPRESSED_PREFIX: &str = "compressed-";

#[derive(Debug)]
pub struct CompressPipeline {
    document: Option<SourceDocument>,
    quality: Quality,
}

impl CompressPipeline {
    pub fn new(quality: Quality) -> Self {
        Self {
            document: None,
            quality,
        }
    }
}

impl JobPipeline for CompressPipeline {
    type Input = (SourceDocument, Quality);

    fn mode(&self) -> JobMode {
        JobMode::Compress
    }

    fn prepare(&self) -> Result<Self::Input, ToolkitError> {
        let doc = self.document.clone().ok_or(ToolkitError::NoDocument)?;
        Ok((doc, self.quality))
    }

    fn units(&self, (doc, _): &Self::Input) -> usize {
        doc.page_count()
    }

    async fn execute(
        &mut self,
        (doc, quality): Self::Input,
        ctx: &PipelineContext,
    ) -> Result<PipelineOutput, ToolkitError> {
        info!(name = doc.name(), pages = doc.page_count(), %quality, "compressing");
        let mut builder = ImageDocumentBuilder::new();

        let tally = for_each_page(
            ctx,
            &doc,
            quality,
            |_, _| {},
            |page| builder.add_page(&page.image, page.size),
        )
        .await?;

        let bytes = builder.finish()?;
        let report = SizeReport::new(doc.byte_len(), bytes.len() as u64);
        info!(name = doc.name(), "{}", report);

        Ok(PipelineOutput {
            bytes,
            mime: PDF_MIME.to_string(),
            filename: format!("{COMPRESSED_PREFIX}{}", doc.name()),
            report: Some(report),
            pages_written: tally.written,
            pages_skipped: tally.skipped.len(),
        })
    }

    fn reset(&mut self) {
        self.document = None;
    }
}

/// Rasterising PDF compressor.
pub type CompressJob = Job<CompressPipeline>;

impl Job<CompressPipeline> {
    pub fn new(config: ToolkitConfig) -> Self {
        let quality = config.default_quality;
        Job::with_pipeline(CompressPipeline::new(quality), config)
    }

    /// Replace the loaded document. Any previous result is discarded.
    pub fn load(&mut self, doc: SourceDocument) {
        self.clear_result();
        self.pipeline.document = Some(doc);
    }

    /// Load a file that passed the type gate.
    pub fn load_file(&mut self, file: AcceptedFile) -> Result<(), ToolkitError> {
        let doc = SourceDocument::try_from(file)?;
        self.load(doc);
        Ok(())
    }

    /// Load raw PDF bytes.
    pub fn load_bytes(
        &mut self,
        name: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Result<(), ToolkitError> {
        let doc = load_document(name, bytes)?;
        self.load(doc);
        Ok(())
    }

    pub fn document(&self) -> Option<&SourceDocument> {
        self.pipeline.document.as_ref()
    }

    /// Set the quality of the next run. Values are clamped to `[0.1, 1.0]`.
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

    #[tokio::test]
    async fn run_without_document_is_rejected() {
        let mut job = CompressJob::new(ToolkitConfig::default());
        let err = job.run().await.unwrap_err();
        assert!(matches!(err, ToolkitError::NoDocument));
        assert!(job.state().is_idle());
    }

    #[test]
    fn quality_defaults_from_config_and_clamps() {
        let config = ToolkitConfig::builder()
            .default_quality(0.4)
            .build()
            .unwrap();
        let mut job = CompressJob::new(config);
        assert_eq!(job.quality().value(), 0.4);
        job.set_quality(0.0);
        assert_eq!(job.quality().value(), Quality::MIN);
        job.set_quality(2.0);
        assert_eq!(job.quality().value(), Quality::MAX);
    }

    #[test]
    fn invalid_bytes_leave_job_empty() {
        let mut job = CompressJob::new(ToolkitConfig::default());
        assert!(job.load_bytes("x.pdf", b"nope".to_vec()).is_err());
        assert!(job.document().is_none());
    }
}
