//! CLI binary for pdf-toolbox.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ToolkitConfig`, runs one job and writes its artifact.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pdf_toolbox::pipeline::input::{accept_image_path, accept_path};
use pdf_toolbox::{
    format_size, inspect, write_artifact, CompressJob, ConvertJob, ImageCompressJob, Job,
    JobMode, JobPipeline, JobProgressCallback, MergeJob, ProgressCallback, Quality, SizeDirection,
    ToolkitConfig,
};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus one log line per page.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    skipped: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until `on_job_start` tells us the total.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self::with_bar(bar))
    }

    fn with_bar(bar: ProgressBar) -> Self {
        Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            skipped: AtomicUsize::new(0),
        }
    }

    fn activate_bar(&self, mode: JobMode, total: usize) {
        let unit = if mode == JobMode::Merge {
            "docs"
        } else {
            "pages"
        };
        let progress_style = ProgressStyle::with_template(&format!(
            "{{spinner:.cyan}} {{prefix:.bold}}  \
             [{{bar:42.green/238}}] {{pos:>3}}/{{len}} {unit}  \
             ⏱ {{elapsed_precise}}  {{msg}}"
        ))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix(capitalise(&mode.to_string()));
        self.bar.reset_eta();
    }

    fn elapsed(&self, page_num: usize) -> String {
        let elapsed_ms = self
            .start_times
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&page_num)
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);
        dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0))
    }
}

impl JobProgressCallback for CliProgressCallback {
    fn on_job_start(&self, mode: JobMode, total_units: usize) {
        self.activate_bar(mode, total_units);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Starting {mode} ({total_units} units)…"))
        ));
    }

    fn on_status(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        self.start_times
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(page_num, Instant::now());
    }

    fn on_page_complete(&self, page_num: usize, total: usize, encoded_len: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<10}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format_size(encoded_len as u64)),
            self.elapsed(page_num),
        ));
        self.bar.inc(1);
    }

    fn on_page_skipped(&self, page_num: usize, total: usize, error: &str) {
        self.skipped.fetch_add(1, Ordering::SeqCst);

        // Keep one line per page.
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
            self.elapsed(page_num),
        ));
        self.bar.inc(1);
    }

    fn on_job_complete(&self, mode: JobMode, total_units: usize, success_count: usize) {
        self.bar.finish_and_clear();
        if mode == JobMode::Merge || mode == JobMode::ImageCompress {
            return;
        }

        // Reset so a reused callback starts the next job from zero.
        let skipped = self.skipped.swap(0, Ordering::SeqCst);
        if success_count == 0 {
            eprintln!(
                "{} no pages produced  ({} of {} skipped)",
                red("✘"),
                red(&skipped.to_string()),
                total_units
            );
        } else if skipped == 0 {
            eprintln!(
                "{} {} pages processed",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} pages processed  ({} skipped)",
                cyan("⚠"),
                bold(&success_count.to_string()),
                total_units,
                red(&skipped.to_string()),
            );
        }
    }
}

fn capitalise(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Merge documents in the given order
  pdftools merge intro.pdf body.pdf appendix.pdf

  # Compress at 50% JPEG quality into ./out
  pdftools -d out compress scan.pdf --quality 0.5

  # Convert every page to page_<n>.jpg inside report.zip
  pdftools convert report.pdf

  # Re-encode an image as JPEG
  pdftools image photo.png --quality 0.6

  # Inspect a PDF (no pdfium needed)
  pdftools inspect report.pdf --json

NOTES:
  compress rasterises every page; text is no longer selectable afterwards.
  compress and convert skip pages that fail to render.

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH       Path to libpdfium (file or directory)
  PDFTOOLS_OUTPUT_DIR   Default output directory
  PDFTOOLS_QUALITY      Default quality for compress / image
  RUST_LOG              Overrides the log filter (e.g. pdf_toolbox=debug)
"#;

/// Merge, compress and convert PDF documents locally.
#[derive(Parser, Debug)]
#[command(
    name = "pdftools",
    version,
    about = "Merge, compress and convert PDF documents locally",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory the output file is written to.
    #[arg(short = 'd', long, global = true, env = "PDFTOOLS_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Path to the pdfium shared library (file or directory).
    #[arg(long, global = true, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Print the job outcome as JSON.
    #[arg(long, global = true, env = "PDFTOOLS_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, global = true, env = "PDFTOOLS_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDFTOOLS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDFTOOLS_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Merge two or more PDFs, in the order given.
    Merge {
        #[arg(required = true, num_args = 2..)]
        inputs: Vec<PathBuf>,

        /// Output file stem (".pdf" is appended).
        #[arg(long, env = "PDFTOOLS_MERGED_NAME", default_value = "merged-document")]
        name: String,
    },
    /// Rasterise every page to JPEG and rebuild the PDF.
    Compress {
        input: PathBuf,

        /// JPEG quality, 0.1–1.0.
        #[arg(long, env = "PDFTOOLS_QUALITY", default_value_t = 0.7, value_parser = parse_quality)]
        quality: f32,
    },
    /// Rasterise every page to JPEG and package them as a zip.
    Convert { input: PathBuf },
    /// Re-encode an image as JPEG.
    Image {
        input: PathBuf,

        /// JPEG quality, 0.1–1.0.
        #[arg(long, env = "PDFTOOLS_QUALITY", default_value_t = 0.7, value_parser = parse_quality)]
        quality: f32,
    },
    /// Print page count, version and page sizes.
    Inspect { input: PathBuf },
}

fn parse_quality(s: &str) -> std::result::Result<f32, String> {
    let value: f32 = s.parse().map_err(|e| format!("'{s}' is not a number: {e}"))?;
    Quality::try_new(value)
        .map(Quality::value)
        .map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar covers what INFO logs would say.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Inspect mode ─────────────────────────────────────────────────────
    if let Command::Inspect { input } = &cli.command {
        let info = inspect(input).context("Failed to inspect PDF")?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&info).context("Failed to serialize document info")?
            );
        } else {
            println!("File:         {}", info.name);
            println!("Size:         {}", format_size(info.bytes));
            println!("Pages:        {}", info.pages);
            println!("PDF Version:  {}", info.version);
            for (i, size) in info.page_sizes.iter().enumerate() {
                println!(
                    "  page {:>3}:   {:.1} × {:.1} pt",
                    i + 1,
                    size.width,
                    size.height
                );
            }
        }
        return Ok(());
    }

    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn JobProgressCallback>)
    } else {
        None
    };

    match &cli.command {
        Command::Merge { inputs, name } => {
            let config = build_config(&cli, progress_cb, Some(name), None)?;
            let mut job = MergeJob::new(config);
            for path in inputs {
                let file = accept_path(path)
                    .with_context(|| format!("Cannot use {}", path.display()))?;
                job.add_file(file)
                    .with_context(|| format!("Failed to load {}", path.display()))?;
            }
            finish(&cli, &mut job).await
        }
        Command::Compress { input, quality } => {
            let config = build_config(&cli, progress_cb, None, Some(*quality))?;
            let mut job = CompressJob::new(config);
            job.load_file(accept_path(input)?)
                .with_context(|| format!("Failed to load {}", input.display()))?;
            finish(&cli, &mut job).await
        }
        Command::Convert { input } => {
            let config = build_config(&cli, progress_cb, None, None)?;
            let mut job = ConvertJob::new(config);
            job.load_file(accept_path(input)?)
                .with_context(|| format!("Failed to load {}", input.display()))?;
            finish(&cli, &mut job).await
        }
        Command::Image { input, quality } => {
            let config = build_config(&cli, progress_cb, None, Some(*quality))?;
            let mut job = ImageCompressJob::new(config);
            job.load(accept_image_path(input)?);
            finish(&cli, &mut job).await
        }
        Command::Inspect { .. } => Ok(()),
    }
}

/// Run the job, write its artifact and print a summary.
async fn finish<P: JobPipeline>(cli: &Cli, job: &mut Job<P>) -> Result<()> {
    let mode = job.mode();
    let outcome = job
        .run()
        .await
        .with_context(|| format!("{} failed", capitalise(&mode.to_string())))?;

    let artifact = job
        .artifact()
        .context("Job succeeded without an artifact")?;
    let path = write_artifact(&cli.output_dir, artifact.artifact())
        .await
        .context("Failed to write output")?;

    if cli.json {
        let mut value = serde_json::to_value(&outcome).context("Failed to serialise outcome")?;
        value["path"] = serde_json::Value::String(path.display().to_string());
        println!(
            "{}",
            serde_json::to_string_pretty(&value).context("Failed to serialise outcome")?
        );
        return Ok(());
    }

    if cli.quiet {
        return Ok(());
    }

    eprintln!(
        "{}  {}  {}  →  {}",
        green("✔"),
        outcome.filename,
        dim(&format_size(outcome.bytes as u64)),
        bold(&path.display().to_string()),
    );
    if let Some(report) = outcome.report {
        let line = report.to_string();
        eprintln!(
            "   {}",
            match report.direction() {
                SizeDirection::Reduction => green(&line),
                SizeDirection::Increase => red(&line),
            }
        );
    }
    if outcome.pages_skipped > 0 {
        eprintln!(
            "   {} {} page(s) could not be rendered and were left out",
            cyan("⚠"),
            outcome.pages_skipped
        );
    }
    Ok(())
}

/// Map CLI args to `ToolkitConfig`.
fn build_config(
    cli: &Cli,
    progress: Option<ProgressCallback>,
    merged_name: Option<&String>,
    quality: Option<f32>,
) -> Result<ToolkitConfig> {
    let mut builder = ToolkitConfig::builder();

    if let Some(q) = quality {
        builder = builder.default_quality(q);
    }
    if let Some(name) = merged_name {
        builder = builder.merged_file_stem(name.trim_end_matches(".pdf"));
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_library_path(lib);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
