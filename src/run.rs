//! Eager entry points: submit, wait for the job, return the result.
//!
//! ## Why eager vs. streaming?
//!
//! [`process_video`] is the simple API: it returns once the job is terminal
//! and the preview is in hand. Use [`crate::stream::watch_job`] instead when
//! the caller wants every status update as it is observed.

use crate::config::ClientConfig;
use crate::error::Vid2DocError;
use crate::job::{DownloadTarget, JobId, JobOutcome};
use crate::pipeline::input::{self, SubmissionInput};
use crate::pipeline::monitor::ProgressMonitor;
use crate::pipeline::{retrieve, submit};
use crate::service::{HttpJobService, JobService};
use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Submit a video (local path or URL) and wait until it is processed.
///
/// This is the primary entry point for the library.
///
/// # Returns
/// `Ok(JobOutcome)` once the job completed and its preview was fetched.
///
/// # Errors
/// - `Validation` / `FileNotFound` / `PermissionDenied` — before any request
/// - `Submission` — the service refused the job
/// - `JobFailed` — the remote pipeline failed
/// - `Retrieval` — completed, but the preview could not be loaded
pub async fn process_video(
    input_str: impl AsRef<str>,
    config: &ClientConfig,
) -> Result<JobOutcome, Vid2DocError> {
    let input = input::resolve_input(input_str.as_ref()).await?;
    let service: Arc<dyn JobService> = Arc::new(HttpJobService::new(config)?);
    process_video_with(service, &input, config).await
}

/// Like [`process_video`], against any [`JobService`].
pub async fn process_video_with(
    service: Arc<dyn JobService>,
    input: &SubmissionInput,
    config: &ClientConfig,
) -> Result<JobOutcome, Vid2DocError> {
    let start = Instant::now();

    // ── Step 1: Submit ───────────────────────────────────────────────────
    let job_id = submit::submit(service.as_ref(), input, config.progress_callback.as_ref()).await?;

    // ── Step 2: Monitor until terminal ───────────────────────────────────
    let monitor = ProgressMonitor::new(service, config);
    let outcome = monitor.start(job_id)?.wait().await?;

    info!(
        "Job {} done: {} observations, {}ms total",
        outcome.job_id,
        outcome.observations,
        start.elapsed().as_millis()
    );
    Ok(outcome)
}

/// Process a video and write the results into `output_dir`.
///
/// The preview goes to `preview_{jobId}.md`; every requested target is then
/// downloaded concurrently. Download failures do not fail the call: each
/// target's result is reported individually.
///
/// # Errors
/// A target the configuration does not offer is a `Validation` error,
/// raised before the input is read or anything is submitted.
pub async fn process_video_to_dir(
    input_str: impl AsRef<str>,
    output_dir: impl AsRef<Path>,
    targets: &[DownloadTarget],
    config: &ClientConfig,
) -> Result<(JobOutcome, Vec<(DownloadTarget, Result<PathBuf, Vid2DocError>)>), Vid2DocError> {
    let dir = output_dir.as_ref();
    for &target in targets {
        retrieve::check_offered(config, target)?;
    }
    let input = input::resolve_input(input_str.as_ref()).await?;
    let service: Arc<dyn JobService> = Arc::new(HttpJobService::new(config)?);

    let outcome = process_video_with(Arc::clone(&service), &input, config).await?;
    write_preview(&outcome, dir).await?;

    let downloads = download_all(service.as_ref(), &outcome.job_id, targets, dir).await;
    Ok((outcome, downloads))
}

/// Write the preview document to `dir/preview_{jobId}.md`.
pub async fn write_preview(outcome: &JobOutcome, dir: &Path) -> Result<PathBuf, Vid2DocError> {
    let path = dir.join(preview_filename(&outcome.job_id));
    retrieve::write_atomic(&path, outcome.preview.as_bytes()).await?;
    Ok(path)
}

pub fn preview_filename(job_id: &JobId) -> String {
    format!("preview_{job_id}.md")
}

/// Download every target into `dir` concurrently.
///
/// Results come back in the order of `targets`; one failing or slow target
/// has no effect on the others.
pub async fn download_all(
    service: &dyn JobService,
    job_id: &JobId,
    targets: &[DownloadTarget],
    dir: &Path,
) -> Vec<(DownloadTarget, Result<PathBuf, Vid2DocError>)> {
    join_all(targets.iter().map(|&target| async move {
        let result = match retrieve::fetch(service, job_id, target).await {
            Ok(artifact) => retrieve::save_artifact(&artifact, dir).await,
            Err(e) => Err(e),
        };
        (target, result)
    }))
    .await
}

/// Synchronous wrapper around [`process_video`].
///
/// Creates a temporary tokio runtime internally.
pub fn process_video_sync(
    input_str: impl AsRef<str>,
    config: &ClientConfig,
) -> Result<JobOutcome, Vid2DocError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Vid2DocError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(process_video(input_str, config))
}
