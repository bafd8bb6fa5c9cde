//! CLI binary for vid2doc.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ClientConfig`, renders job progress and writes results.

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use vid2doc::pipeline::{input, retrieve, submit};
use vid2doc::run::{download_all, write_preview};
use vid2doc::{
    observe_once, ClientConfig, DownloadTarget, ExportFormat, HttpJobService, JobId, JobOutcome,
    JobProgressCallback, JobService, JobStatus, ProgressCallback, ProgressMonitor, RequestError,
    Stage, StatusSnapshot, Vid2DocError, DEFAULT_BASE_URL,
};

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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar whose position is the job's progress
/// percentage, prefixed by the derived stage, with the server message after.
struct CliProgressCallback {
    bar: ProgressBar,
    poll_errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}%  ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        let bar = ProgressBar::new(100);
        bar.set_style(style);
        bar.set_prefix(stage_prefix(Stage::Uploading));
        bar.set_message("Submitting…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            poll_errors: AtomicUsize::new(0),
        })
    }
}

fn stage_prefix(stage: Stage) -> String {
    format!("{} {:<22}", stage.icon(), stage.label())
}

impl JobProgressCallback for CliProgressCallback {
    fn on_submitted(&self, job_id: &JobId) {
        self.bar.println(format!(
            "{} {} {}",
            cyan("◆"),
            bold("Job accepted"),
            dim(job_id.short())
        ));
        self.bar.set_message("Waiting for status…");
    }

    fn on_status(&self, _job_id: &JobId, snapshot: &StatusSnapshot, stage: Stage) {
        self.bar.set_position(u64::from(snapshot.progress));
        self.bar.set_prefix(stage_prefix(stage));
        self.bar.set_message(snapshot.message.clone());
    }

    fn on_poll_error(&self, _job_id: &JobId, error: &RequestError) {
        self.poll_errors.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!(
            "  {} status check failed: {}  {}",
            red("✗"),
            error,
            dim("(retrying)")
        ));
    }

    fn on_complete(&self, job_id: &JobId, preview: &str) {
        self.bar.finish_and_clear();
        let retries = self.poll_errors.load(Ordering::SeqCst);
        eprintln!(
            "{} Newsletter ready  {}  {}",
            green("✔"),
            dim(job_id.short()),
            dim(&format!("{} chars", preview.len())),
        );
        if retries > 0 {
            eprintln!("   {} status checks failed along the way", dim(&retries.to_string()));
        }
    }

    fn on_failed(&self, job_id: &JobId, error: &str) {
        self.bar.abandon();
        eprintln!("{} Job {} failed: {}", red("✘"), job_id.short(), red(error));
    }

    fn on_retrieval_error(&self, _job_id: &JobId, detail: &str) {
        self.bar.abandon();
        eprintln!("{} {}", red("✘"), red(detail));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Upload a local video, print the newsletter preview (stdout)
  vid2doc talk.mp4

  # Submit a YouTube URL, save preview + every format into ./out
  vid2doc https://www.youtube.com/watch?v=dQw4w9WgXcQ -o out \
      --format docx --format html --format markdown

  # Only the bundled zip, then delete the job on the server
  vid2doc talk.mov --archive -o out --cleanup

  # One status check for an existing job
  vid2doc --status 3f2a9c1e-5d7b-4c1a-9e0f-1b2c3d4e5f60

  # Download artifacts of a job that already completed
  vid2doc --download 3f2a9c1e-5d7b-4c1a-9e0f-1b2c3d4e5f60 --format docx -o out

  # JSON outcome (final status + preview)
  vid2doc --json talk.mp4 > outcome.json

STAGES (derived from progress):
    0–19%  Uploading
   20–29%  Extracting Audio
   30–49%  Extracting Frames
   50–69%  Analyzing with AI
   70–99%  Generating Newsletter
     100%  Complete

ENVIRONMENT VARIABLES:
  VID2DOC_BASE_URL        Conversion service base URL (default http://localhost:8000)
  VID2DOC_POLL_INTERVAL   Status poll interval in milliseconds (default 2000)
  VID2DOC_OUTPUT_DIR      Directory for the preview and downloads
  RUST_LOG                Override log filtering (e.g. vid2doc=debug)
"#;

/// Turn videos into newsletters with a remote conversion service.
#[derive(Parser, Debug)]
#[command(
    name = "vid2doc",
    version,
    about = "Turn videos into newsletters with a remote conversion service",
    long_about = "Submit a local video or a YouTube URL to a video-to-newsletter conversion \
service, follow the job's progress live, then print the preview and download the generated \
DOCX, HTML, Markdown or zipped bundle.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local video file path or HTTP/HTTPS URL.
    #[arg(required_unless_present_any = ["status", "download"])]
    input: Option<String>,

    /// Conversion service base URL.
    #[arg(long, env = "VID2DOC_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Status poll interval in milliseconds.
    #[arg(long, env = "VID2DOC_POLL_INTERVAL", default_value_t = 2000)]
    poll_interval: u64,

    /// Write the preview and downloads into this directory.
    #[arg(short, long, env = "VID2DOC_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Download this format after completion (repeatable).
    #[arg(long = "format", value_enum)]
    formats: Vec<FormatArg>,

    /// Download the zipped bundle of all formats after completion.
    #[arg(long)]
    archive: bool,

    /// Delete the job on the server once everything is downloaded.
    #[arg(long)]
    cleanup: bool,

    /// Timeout for status, preview and download requests, in seconds.
    #[arg(long, env = "VID2DOC_REQUEST_TIMEOUT", default_value_t = 30)]
    request_timeout: u64,

    /// Timeout for the video upload, in seconds.
    #[arg(long, env = "VID2DOC_UPLOAD_TIMEOUT", default_value_t = 600)]
    upload_timeout: u64,

    /// Output structured JSON instead of Markdown.
    #[arg(long, env = "VID2DOC_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "VID2DOC_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "VID2DOC_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "VID2DOC_QUIET")]
    quiet: bool,

    /// Print the current status of an existing job and exit.
    #[arg(long, value_name = "JOB_ID", conflicts_with_all = ["input", "download"])]
    status: Option<String>,

    /// Download artifacts of an already-completed job and exit.
    #[arg(long, value_name = "JOB_ID", conflicts_with = "input")]
    download: Option<String>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Docx,
    Html,
    #[value(alias = "md")]
    Markdown,
}

impl From<FormatArg> for ExportFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Docx => ExportFormat::Docx,
            FormatArg::Html => ExportFormat::Html,
            FormatArg::Markdown => ExportFormat::Markdown,
        }
    }
}

impl Cli {
    fn targets(&self) -> Vec<DownloadTarget> {
        let mut targets: Vec<DownloadTarget> = Vec::new();
        for &f in &self.formats {
            let t = DownloadTarget::Format(f.into());
            if !targets.contains(&t) {
                targets.push(t);
            }
        }
        if self.archive {
            targets.push(DownloadTarget::Archive);
        }
        targets
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress =
        !cli.quiet && !cli.no_progress && !cli.json && cli.status.is_none() && cli.download.is_none();
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

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn JobProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;
    let service: Arc<dyn JobService> =
        Arc::new(HttpJobService::new(&config).context("Failed to create HTTP client")?);

    // ── Status-only mode ─────────────────────────────────────────────────
    if let Some(ref id) = cli.status {
        let job_id = JobId::new(id.trim());
        let snapshot = observe_once(service.as_ref(), &job_id)
            .await
            .with_context(|| format!("Failed to query status of job {job_id}"))?;
        print_status(&cli, &job_id, &snapshot)?;
        return Ok(());
    }

    // ── Download-only mode ───────────────────────────────────────────────
    if let Some(ref id) = cli.download {
        let job_id = JobId::new(id.trim());
        let snapshot = observe_once(service.as_ref(), &job_id)
            .await
            .with_context(|| format!("Failed to query status of job {job_id}"))?;
        if snapshot.status != JobStatus::Completed {
            bail!(
                "Job {} is {}, downloads are only available once it has completed",
                job_id,
                snapshot.status
            );
        }
        let mut targets = cli.targets();
        if targets.is_empty() {
            targets.push(DownloadTarget::Archive);
        }
        let dir = cli.output_dir.clone().unwrap_or_else(|| PathBuf::from("."));
        download_and_report(&cli, service.as_ref(), &job_id, &targets, &dir).await?;
        cleanup(&cli, service.as_ref(), &job_id).await;
        return Ok(());
    }

    // ── Full run ─────────────────────────────────────────────────────────
    let input_str = cli.input.as_deref().unwrap_or_default();
    let input = input::resolve_input(input_str)
        .await
        .with_context(|| format!("Failed to read input '{input_str}'"))?;

    let job_id = submit::submit(service.as_ref(), &input, config.progress_callback.as_ref())
        .await
        .context("Submission failed")?;

    // Ctrl-C stops the loop; the job itself keeps running remotely.
    let interrupt = CancellationToken::new();
    let on_ctrl_c = interrupt.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let mut outcome = monitor_job(&cli, Arc::clone(&service), &config, &job_id, interrupt).await?;
    outcome.preview = retrieve::resolve_image_links(&outcome.preview, &config.base_url, &job_id);

    // ── Write / print preview ────────────────────────────────────────────
    if let Some(ref dir) = cli.output_dir {
        let path = write_preview(&outcome, dir)
            .await
            .context("Failed to write preview")?;
        if !cli.quiet {
            eprintln!("{}  preview  →  {}", green("✔"), bold(&path.display().to_string()));
        }
    }
    if cli.json {
        let json = serde_json::to_string_pretty(&outcome).context("Failed to serialise outcome")?;
        println!("{json}");
    } else if cli.output_dir.is_none() {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        out.write_all(outcome.preview.as_bytes())
            .context("Failed to write to stdout")?;
        // Ensure a trailing newline on stdout.
        if !outcome.preview.ends_with('\n') {
            out.write_all(b"\n").ok();
        }
    }

    // ── Downloads ────────────────────────────────────────────────────────
    let targets = cli.targets();
    if !targets.is_empty() {
        let dir = cli.output_dir.clone().unwrap_or_else(|| PathBuf::from("."));
        download_and_report(&cli, service.as_ref(), &job_id, &targets, &dir).await?;
    }

    cleanup(&cli, service.as_ref(), &job_id).await;
    Ok(())
}

/// Monitor `job_id` until it is terminal or `interrupt` fires.
///
/// An interrupted run never applies `--cleanup`: the job is still running
/// on the server.
async fn monitor_job(
    cli: &Cli,
    service: Arc<dyn JobService>,
    config: &ClientConfig,
    job_id: &JobId,
    interrupt: CancellationToken,
) -> Result<JobOutcome> {
    let handle = ProgressMonitor::new(service, config)
        .start(job_id.clone())
        .context("Failed to start monitoring")?;

    // Ends either way: the handle cancels its own token once dropped.
    let token = handle.cancellation_token();
    tokio::spawn(async move {
        tokio::select! {
            () = interrupt.cancelled() => token.cancel(),
            () = token.cancelled() => {}
        }
    });

    match handle.wait().await {
        Ok(outcome) => Ok(outcome),
        Err(Vid2DocError::Cancelled { job_id: id }) => {
            if !cli.quiet {
                eprintln!(
                    "{} Stopped watching job {}; it keeps running on the server",
                    cyan("⚠"),
                    id
                );
                if cli.cleanup {
                    eprintln!("{}  --cleanup skipped for a job that is still running", dim("·"));
                }
            }
            bail!("Monitoring cancelled")
        }
        Err(e) => Err(e).context("Job did not produce a newsletter"),
    }
}

/// Map CLI args to `ClientConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ClientConfig> {
    let mut builder = ClientConfig::builder()
        .base_url(&cli.base_url)
        .poll_interval_ms(cli.poll_interval)
        .request_timeout_secs(cli.request_timeout)
        .upload_timeout_secs(cli.upload_timeout);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_status(cli: &Cli, job_id: &JobId, snapshot: &StatusSnapshot) -> Result<()> {
    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(snapshot).context("Failed to serialise status")?
        );
        return Ok(());
    }

    let stage = snapshot.stage();
    println!("Job:       {}", job_id);
    println!("Status:    {}", snapshot.status);
    println!("Progress:  {}%", snapshot.progress);
    println!("Stage:     {} {}", stage.icon(), stage.label());
    if !snapshot.message.is_empty() {
        println!("Message:   {}", snapshot.message);
    }
    if let Some(ref e) = snapshot.error {
        println!("Error:     {}", e);
    }
    Ok(())
}

/// Download every target concurrently and print one line per result.
///
/// Fails only after all downloads finished, if any of them failed.
async fn download_and_report(
    cli: &Cli,
    service: &dyn JobService,
    job_id: &JobId,
    targets: &[DownloadTarget],
    dir: &Path,
) -> Result<()> {
    let results = download_all(service, job_id, targets, dir).await;

    let mut failed = 0usize;
    for (target, result) in &results {
        match result {
            Ok(path) => {
                if !cli.quiet {
                    eprintln!(
                        "{}  {:<8} →  {}",
                        green("✔"),
                        target.to_string(),
                        bold(&path.display().to_string())
                    );
                }
            }
            Err(e) => {
                failed += 1;
                eprintln!("{}  {:<8}    {}", red("✗"), target.to_string(), red(&e.to_string()));
            }
        }
    }

    if failed > 0 {
        bail!("{}/{} downloads failed", failed, results.len());
    }
    Ok(())
}

async fn cleanup(cli: &Cli, service: &dyn JobService, job_id: &JobId) {
    if !cli.cleanup {
        return;
    }
    match service.delete_job(job_id).await {
        Ok(()) => {
            if !cli.quiet {
                eprintln!("{}  deleted job {} on the server", dim("·"), job_id.short());
            }
        }
        Err(e) => eprintln!("{} could not delete job {}: {}", cyan("⚠"), job_id, e),
    }
}
