//! The job state machine shared by every mode.
//!
//! A [`Job`] couples a mode-specific [`JobPipeline`] with the state machine,
//! the injected backends, and the artifact it currently owns:
//!
//! ```text
//!  Idle ──run──▶ Running ──ok──▶ Succeeded(outcome)
//!                   │
//!                   └──err──▶ Failed(reason)
//!
//!  any state ──reset──▶ Idle
//! ```
//!
//! Validation (no document loaded, fewer than two merge inputs) happens in
//! [`JobPipeline::prepare`] before the state changes, so a rejected run leaves
//! the job exactly as it was. [`Job::run`] takes `&mut self`; a job can never
//! have two runs in flight.

pub mod compress;
pub mod convert;
pub mod image;
pub mod merge;

use crate::artifact::{ArtifactHandle, ArtifactStore};
use crate::config::ToolkitConfig;
use crate::error::ToolkitError;
use crate::pipeline::encode::{ImageEncoder, JpegEncoder};
use crate::pipeline::render::{PageRasterizer, PdfiumRasterizer};
use crate::progress::{NoopProgressCallback, ProgressCallback};
use crate::report::SizeReport;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

pub use compress::{CompressJob, CompressPipeline};
pub use convert::{ConvertJob, ConvertPipeline};
pub use image::{ImageCompressJob, ImageCompressPipeline, SourceImage};
pub use merge::{MergeJob, MergePipeline};

/// Reason recorded when a run future is dropped before it finishes.
pub const INTERRUPTED_REASON: &str = "run was interrupted before completion";

/// Which pipeline a job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobMode {
    Merge,
    Compress,
    Convert,
    ImageCompress,
}

impl fmt::Display for JobMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JobMode::Merge => "merge",
            JobMode::Compress => "compress",
            JobMode::Convert => "convert",
            JobMode::ImageCompress => "image-compress",
        })
    }
}

/// Summary of a successful run. The bytes stay with the artifact handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOutcome {
    pub artifact_id: Uuid,
    pub reference: String,
    pub filename: String,
    pub mime: String,
    pub bytes: usize,
    pub report: Option<SizeReport>,
    pub pages_written: usize,
    pub pages_skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum JobState {
    #[default]
    Idle,
    Running,
    Succeeded(JobOutcome),
    Failed(String),
}

impl JobState {
    pub fn is_idle(&self) -> bool {
        matches!(self, JobState::Idle)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, JobState::Running)
    }

    pub fn outcome(&self) -> Option<&JobOutcome> {
        match self {
            JobState::Succeeded(outcome) => Some(outcome),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            JobState::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Backends and settings a pipeline runs with.
///
/// Built once per job from its [`ToolkitConfig`]: injected backends win,
/// otherwise pdfium and baseline JPEG are used.
#[derive(Clone)]
pub struct PipelineContext {
    pub config: ToolkitConfig,
    pub rasterizer: Arc<dyn PageRasterizer>,
    pub encoder: Arc<dyn ImageEncoder>,
    pub progress: ProgressCallback,
}

impl PipelineContext {
    pub fn new(config: ToolkitConfig) -> Self {
        let rasterizer = config.rasterizer.clone().unwrap_or_else(|| {
            Arc::new(PdfiumRasterizer::new(config.pdfium_library_path.clone()))
        });
        let encoder = config
            .encoder
            .clone()
            .unwrap_or_else(|| Arc::new(JpegEncoder));
        let progress = config
            .progress_callback
            .clone()
            .unwrap_or_else(|| Arc::new(NoopProgressCallback));
        Self {
            config,
            rasterizer,
            encoder,
            progress,
        }
    }
}

impl fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// What a pipeline hands back to the job on success.
#[derive(Debug)]
pub struct PipelineOutput {
    pub bytes: Vec<u8>,
    pub mime: String,
    pub filename: String,
    pub report: Option<SizeReport>,
    pub pages_written: usize,
    pub pages_skipped: usize,
}

/// Mode-specific half of a job.
pub trait JobPipeline: Send {
    /// Snapshot of the inputs a run works on.
    type Input: Send;

    fn mode(&self) -> JobMode;

    /// Validate and snapshot the inputs. Errors here never change job state.
    fn prepare(&self) -> Result<Self::Input, ToolkitError>;

    /// Units reported to [`crate::JobProgressCallback::on_job_start`].
    fn units(&self, input: &Self::Input) -> usize;

    fn execute(
        &mut self,
        input: Self::Input,
        ctx: &PipelineContext,
    ) -> impl Future<Output = Result<PipelineOutput, ToolkitError>> + Send;

    /// Units of `output` reported to
    /// [`crate::JobProgressCallback::on_job_complete`]. Must count the same
    /// thing as [`JobPipeline::units`]; pages by default.
    fn completed_units(&self, output: &PipelineOutput) -> usize {
        output.pages_written
    }

    /// Called after the artifact of a successful run is emitted.
    fn on_succeeded(&mut self, _ctx: &PipelineContext) {}

    /// Called after a run failed inside `execute`.
    fn on_failed(&mut self, _ctx: &PipelineContext, _error: &ToolkitError) {}

    /// Drop all per-mode inputs.
    fn reset(&mut self);
}

/// A pipeline plus its state machine and current artifact.
pub struct Job<P: JobPipeline> {
    pipeline: P,
    ctx: PipelineContext,
    store: ArtifactStore,
    state: JobState,
    artifact: Option<ArtifactHandle>,
}

impl<P: JobPipeline> fmt::Debug for Job<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("mode", &self.pipeline.mode())
            .field("state", &self.state)
            .field("artifact", &self.artifact)
            .finish()
    }
}

impl<P: JobPipeline> Job<P> {
    pub fn with_pipeline(pipeline: P, config: ToolkitConfig) -> Self {
        Self {
            pipeline,
            ctx: PipelineContext::new(config),
            store: ArtifactStore::new(),
            state: JobState::Idle,
            artifact: None,
        }
    }

    /// Emit artifacts into a shared store instead of a private one.
    pub fn with_store(mut self, store: ArtifactStore) -> Self {
        self.store = store;
        self
    }

    pub fn mode(&self) -> JobMode {
        self.pipeline.mode()
    }

    pub fn state(&self) -> &JobState {
        &self.state
    }

    pub fn config(&self) -> &ToolkitConfig {
        &self.ctx.config
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// The artifact of the last successful run, while it is live.
    pub fn artifact(&self) -> Option<&ArtifactHandle> {
        self.artifact.as_ref()
    }

    /// Run the pipeline once.
    ///
    /// # Errors
    /// Validation errors are returned without touching state. Anything that
    /// fails after that moves the job to [`JobState::Failed`] and is also
    /// returned.
    pub async fn run(&mut self) -> Result<JobOutcome, ToolkitError> {
        let input = self.pipeline.prepare()?;
        let mode = self.pipeline.mode();
        let units = self.pipeline.units(&input);

        if let Some(previous) = self.artifact.take() {
            previous.revoke();
        }

        info!(%mode, units, "job started");
        self.ctx.progress.on_job_start(mode, units);
        let guard = RunGuard::enter(&mut self.state);

        match self.pipeline.execute(input, &self.ctx).await {
            Ok(output) => {
                let pages_written = output.pages_written;
                let completed = self.pipeline.completed_units(&output);
                let handle = self
                    .store
                    .emit(output.bytes, output.mime, output.filename);
                let outcome = JobOutcome {
                    artifact_id: handle.id(),
                    reference: handle.reference(),
                    filename: handle.filename().to_string(),
                    mime: handle.mime().to_string(),
                    bytes: handle.bytes().len(),
                    report: output.report,
                    pages_written,
                    pages_skipped: output.pages_skipped,
                };
                guard.finish(JobState::Succeeded(outcome.clone()));
                self.artifact = Some(handle);
                self.pipeline.on_succeeded(&self.ctx);

                info!(
                    %mode,
                    filename = %outcome.filename,
                    bytes = outcome.bytes,
                    pages_written,
                    pages_skipped = outcome.pages_skipped,
                    "job succeeded"
                );
                self.ctx.progress.on_job_complete(mode, units, completed);
                Ok(outcome)
            }
            Err(e) => {
                error!(%mode, "job failed: {}", e);
                guard.finish(JobState::Failed(e.to_string()));
                self.pipeline.on_failed(&self.ctx, &e);
                self.ctx.progress.on_job_complete(mode, units, 0);
                Err(e)
            }
        }
    }

    /// Revoke the artifact, clear the inputs and return to `Idle`.
    pub fn reset(&mut self) {
        if let Some(handle) = self.artifact.take() {
            handle.revoke();
        }
        self.pipeline.reset();
        self.state = JobState::Idle;
    }

    /// Revoke the artifact and return to `Idle`, keeping the inputs.
    fn clear_result(&mut self) {
        if let Some(handle) = self.artifact.take() {
            handle.revoke();
        }
        self.state = JobState::Idle;
    }
}

/// Holds the state as `Running` for the duration of `execute`.
///
/// If the run future is dropped mid-flight the guard is dropped unfinished
/// and the state becomes `Failed`, never a stuck `Running`.
struct RunGuard<'a> {
    state: &'a mut JobState,
    finished: bool,
}

impl<'a> RunGuard<'a> {
    fn enter(state: &'a mut JobState) -> Self {
        *state = JobState::Running;
        Self {
            state,
            finished: false,
        }
    }

    fn finish(mut self, terminal: JobState) {
        *self.state = terminal;
        self.finished = true;
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            *self.state = JobState::Failed(INTERRUPTED_REASON.to_string());
        }
    }
}
