//! Merge: concatenate an ordered list of PDFs into one document.
//!
//! Pages are copied verbatim, so text stays selectable. The list is cleared
//! after a successful merge; a failed merge keeps it for another attempt.

use super::{Job, JobMode, JobPipeline, PipelineContext, PipelineOutput};
use crate::config::ToolkitConfig;
use crate::error::ToolkitError;
use crate::pipeline::assemble::merge_documents;
use crate::pipeline::input::{partition_uploads, AcceptedFile, Upload, PDF_MIME};
use crate::pipeline::load::SourceDocument;
use tracing::{debug, info, warn};

/// Fewest documents a merge accepts.
pub const MIN_MERGE_DOCUMENTS: usize = 2;

#[derive(Debug, Default)]
pub struct MergePipeline {
    documents: Vec<SourceDocument>,
}

impl JobPipeline for MergePipeline {
    type Input = Vec<SourceDocument>;

    fn mode(&self) -> JobMode {
        JobMode::Merge
    }

    fn prepare(&self) -> Result<Self::Input, ToolkitError> {
        if self.documents.len() < MIN_MERGE_DOCUMENTS {
            return Err(ToolkitError::InsufficientInput {
                required: MIN_MERGE_DOCUMENTS,
                provided: self.documents.len(),
            });
        }
        Ok(self.documents.clone())
    }

    fn units(&self, input: &Self::Input) -> usize {
        input.len()
    }

    async fn execute(
        &mut self,
        input: Self::Input,
        ctx: &PipelineContext,
    ) -> Result<PipelineOutput, ToolkitError> {
        let pages: usize = input.iter().map(SourceDocument::page_count).sum();
        ctx.progress
            .on_status(&format!("Merging {} documents...", input.len()));

        let bytes = tokio::task::spawn_blocking(move || merge_documents(&input))
            .await
            .map_err(|e| ToolkitError::Internal(format!("Merge task panicked: {}", e)))??;

        Ok(PipelineOutput {
            bytes,
            mime: PDF_MIME.to_string(),
            filename: ctx.config.merged_file_name(),
            report: None,
            pages_written: pages,
            pages_skipped: 0,
        })
    }

    /// Merge counts documents, and a successful merge includes all of them.
    fn completed_units(&self, _output: &PipelineOutput) -> usize {
        self.documents.len()
    }

    fn on_succeeded(&mut self, _ctx: &PipelineContext) {
        debug!(cleared = self.documents.len(), "merge list cleared");
        self.documents.clear();
    }

    fn reset(&mut self) {
        self.documents.clear();
    }
}

/// Ordered merge of two or more PDFs.
pub type MergeJob = Job<MergePipeline>;

impl Job<MergePipeline> {
    pub fn new(config: ToolkitConfig) -> Self {
        Job::with_pipeline(MergePipeline::default(), config)
    }

    /// Documents in merge order.
    pub fn documents(&self) -> &[SourceDocument] {
        &self.pipeline.documents
    }

    /// Append an already loaded document.
    pub fn add(&mut self, doc: SourceDocument) {
        info!(name = doc.name(), pages = doc.page_count(), "added to merge list");
        self.pipeline.documents.push(doc);
    }

    /// Load and append a file that passed the type gate.
    pub fn add_file(&mut self, file: AcceptedFile) -> Result<(), ToolkitError> {
        let doc = SourceDocument::try_from(file)?;
        self.add(doc);
        Ok(())
    }

    /// Add a multi-file selection. PDFs are appended in order; everything
    /// that was rejected or failed to load is returned.
    pub fn add_files(&mut self, files: impl IntoIterator<Item = Upload>) -> Vec<ToolkitError> {
        let partitioned = partition_uploads(files);
        let mut errors = partitioned.rejected;
        for file in partitioned.accepted {
            if let Err(e) = self.add_file(file) {
                warn!("skipping unreadable PDF: {}", e);
                errors.push(e);
            }
        }
        errors
    }

    /// Remove the document at `index`. Out-of-range indices are ignored.
    pub fn remove(&mut self, index: usize) -> Option<SourceDocument> {
        if index < self.pipeline.documents.len() {
            Some(self.pipeline.documents.remove(index))
        } else {
            None
        }
    }

    /// Swap the document at `index` with the one before it.
    ///
    /// Returns false (and changes nothing) for the first entry or an
    /// out-of-range index.
    pub fn move_up(&mut self, index: usize) -> bool {
        if index == 0 || index >= self.pipeline.documents.len() {
            return false;
        }
        self.pipeline.documents.swap(index - 1, index);
        true
    }

    /// Swap the document at `index` with the one after it.
    pub fn move_down(&mut self, index: usize) -> bool {
        if index + 1 >= self.pipeline.documents.len() {
            return false;
        }
        self.pipeline.documents.swap(index, index + 1);
        true
    }
}
