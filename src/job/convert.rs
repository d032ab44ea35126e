//! Convert: rasterise every page to a JPEG and package them as a zip.

use super::{Job, JobMode, JobPipeline, PipelineContext, PipelineOutput};
use crate::config::{ToolkitConfig, CONVERT_QUALITY};
use crate::error::ToolkitError;
use crate::pipeline::archive::{ArchivePackager, ZIP_MIME};
use crate::pipeline::input::AcceptedFile;
use crate::pipeline::load::{load_document, SourceDocument};
use crate::pipeline::pages::for_each_page;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub const STATUS_STARTING: &str = "Starting conversion...";
pub const STATUS_PACKAGING: &str = "Generating ZIP file...";
pub const STATUS_DONE: &str = "Conversion complete! Your download is ready.";
pub const STATUS_FAILED: &str = "An error occurred. Please try again.";

pub fn page_status(page_num: usize, total: usize) -> String {
    format!("Processing page {page_num} of {total}...")
}

/// Archive entry name for a 1-indexed page.
pub fn entry_name(page_num: usize) -> String {
    format!("page_{page_num}.jpg")
}

/// `report.pdf` → `report.zip`.
pub fn archive_name(source_name: &str) -> String {
    let stem = Path::new(source_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "document".to_string());
    format!("{stem}.zip")
}

#[derive(Debug, Default)]
pub struct ConvertPipeline {
    document: Option<SourceDocument>,
    progress: String,
}

impl ConvertPipeline {
    fn set_progress(&mut self, ctx: &PipelineContext, message: String) {
        ctx.progress.on_status(&message);
        self.progress = message;
    }
}

impl JobPipeline for ConvertPipeline {
    type Input = SourceDocument;

    fn mode(&self) -> JobMode {
        JobMode::Convert
    }

    fn prepare(&self) -> Result<Self::Input, ToolkitError> {
        self.document.clone().ok_or(ToolkitError::NoDocument)
    }

    fn units(&self, doc: &Self::Input) -> usize {
        doc.page_count()
    }

    async fn execute(
        &mut self,
        doc: Self::Input,
        ctx: &PipelineContext,
    ) -> Result<PipelineOutput, ToolkitError> {
        self.set_progress(ctx, STATUS_STARTING.to_string());
        info!(name = doc.name(), pages = doc.page_count(), "converting");

        let mut archive = ArchivePackager::new();
        let progress = &mut self.progress;

        let tally = for_each_page(
            ctx,
            &doc,
            CONVERT_QUALITY,
            |page_num, total| {
                let message = page_status(page_num, total);
                ctx.progress.on_status(&message);
                *progress = message;
            },
            |page| archive.add(&entry_name(page.page_num), &page.image.bytes),
        )
        .await?;

        self.set_progress(ctx, STATUS_PACKAGING.to_string());
        let entries = archive.len();
        let bytes = archive.finish()?;
        self.set_progress(ctx, STATUS_DONE.to_string());
        info!(name = doc.name(), entries, bytes = bytes.len(), "archive ready");

        Ok(PipelineOutput {
            bytes,
            mime: ZIP_MIME.to_string(),
            filename: archive_name(doc.name()),
            report: None,
            pages_written: tally.written,
            pages_skipped: tally.skipped.len(),
        })
    }

    fn on_failed(&mut self, ctx: &PipelineContext, _error: &ToolkitError) {
        self.set_progress(ctx, STATUS_FAILED.to_string());
    }

    fn reset(&mut self) {
        self.document = None;
        self.progress.clear();
    }
}

/// PDF to zip-of-JPEGs converter.
pub type ConvertJob = Job<ConvertPipeline>;

impl Job<ConvertPipeline> {
    pub fn new(config: ToolkitConfig) -> Self {
        Job::with_pipeline(ConvertPipeline::default(), config)
    }

    /// Replace the loaded document. Any previous result is discarded.
    pub fn load(&mut self, doc: SourceDocument) {
        self.clear_result();
        self.pipeline.progress.clear();
        self.pipeline.document = Some(doc);
    }

    pub fn load_file(&mut self, file: AcceptedFile) -> Result<(), ToolkitError> {
        let doc = SourceDocument::try_from(file)?;
        self.load(doc);
        Ok(())
    }

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

    /// Latest human-readable progress line; empty before the first run.
    pub fn progress(&self) -> &str {
        &self.pipeline.progress
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn naming() {
        assert_eq!(entry_name(3), "page_3.jpg");
        assert_eq!(archive_name("report.pdf"), "report.zip");
        assert_eq!(archive_name("my.scan.PDF"), "my.scan.zip");
        assert_eq!(archive_name(""), "document.zip");
        assert_eq!(page_status(2, 5), "Processing page 2 of 5...");
    }

    #[tokio::test]
    async fn run_without_document_is_rejected() {
        let mut job = ConvertJob::new(ToolkitConfig::default());
        assert!(matches!(
            job.run().await.unwrap_err(),
            ToolkitError::NoDocument
        ));
        assert_eq!(job.progress(), "");
        assert!(job.state().is_idle());
    }
}
