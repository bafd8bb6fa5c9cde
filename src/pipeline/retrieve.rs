//! Artifact retriever: preview, single-format downloads and the archive.
//!
//! Every call is one request/response with no retry. Failures come back as
//! [`Vid2DocError::Retrieval`] for that call only; they never touch the job
//! or any other download in flight.

use crate::config::ClientConfig;
use crate::error::Vid2DocError;
use crate::job::{DownloadTarget, DownloadedArtifact, ExportFormat, JobId};
use crate::service::JobService;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Fetch the rendered preview document of a completed job.
pub async fn fetch_preview(service: &dyn JobService, job_id: &JobId) -> Result<String, Vid2DocError> {
    service.preview(job_id).await.map_err(|e| {
        warn!("Job {}: preview fetch failed — {}", job_id, e);
        Vid2DocError::Retrieval {
            job_id: job_id.to_string(),
            what: "preview".into(),
            detail: e.detail_or("Failed to load newsletter preview"),
        }
    })
}

/// Download the bundled archive (all formats in one zip).
pub async fn fetch_archive(
    service: &dyn JobService,
    job_id: &JobId,
) -> Result<DownloadedArtifact, Vid2DocError> {
    fetch(service, job_id, DownloadTarget::Archive).await
}

/// Download a single export format.
pub async fn fetch_artifact(
    service: &dyn JobService,
    job_id: &JobId,
    format: ExportFormat,
) -> Result<DownloadedArtifact, Vid2DocError> {
    fetch(service, job_id, DownloadTarget::Format(format)).await
}

/// Download any target; the artifact carries its suggested filename.
pub async fn fetch(
    service: &dyn JobService,
    job_id: &JobId,
    target: DownloadTarget,
) -> Result<DownloadedArtifact, Vid2DocError> {
    match service.download(job_id, target).await {
        Ok(bytes) => {
            let filename = target.filename(job_id);
            info!("Job {}: downloaded {} ({} bytes)", job_id, filename, bytes.len());
            Ok(DownloadedArtifact {
                target,
                filename,
                bytes,
            })
        }
        Err(e) => {
            warn!("Job {}: {} download failed — {}", job_id, target, e);
            let fallback = match target {
                DownloadTarget::Archive => "Failed to download newsletter".to_string(),
                DownloadTarget::Format(f) => format!("Failed to download {f} format"),
            };
            Err(Vid2DocError::Retrieval {
                job_id: job_id.to_string(),
                what: target.to_string(),
                detail: e.detail_or(&fallback),
            })
        }
    }
}

/// Refuse per-format downloads the configuration does not offer.
pub fn check_offered(config: &ClientConfig, target: DownloadTarget) -> Result<(), Vid2DocError> {
    match target {
        DownloadTarget::Format(f) if !config.formats.contains(&f) => Err(Vid2DocError::validation(
            format!("format '{f}' is not offered by this client configuration"),
        )),
        _ => Ok(()),
    }
}

/// Write an artifact into `dir` under its suggested filename.
///
/// Atomic: the bytes go to a temp file in the same directory which is then
/// renamed, so a crash never leaves a truncated document behind.
pub async fn save_artifact(
    artifact: &DownloadedArtifact,
    dir: &Path,
) -> Result<PathBuf, Vid2DocError> {
    let path = dir.join(&artifact.filename);
    write_atomic(&path, &artifact.bytes).await?;
    Ok(path)
}

pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), Vid2DocError> {
    let write_err = |source: std::io::Error| Vid2DocError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    tokio::fs::create_dir_all(&dir).await.map_err(write_err)?;

    let target = path.to_path_buf();
    let data = bytes.to_vec();
    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        use std::io::Write;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(&data)?;
        tmp.persist(&target).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(|e| Vid2DocError::Internal(format!("Write task panicked: {e}")))?
    .map_err(write_err)
}

// ── Preview image links ──────────────────────────────────────────────────

static RE_IMAGE_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[([^\]]*)\]\(\s*([^)\s]+)((?:\s+[^)]*)?)\)").unwrap());

/// Rewrite relative image references in preview Markdown to absolute URLs
/// under `{base_url}/output/{jobId}/`.
///
/// Absolute (`http(s)://`, `data:`) and root-relative links are kept as is;
/// empty alt text becomes "Newsletter image".
pub fn resolve_image_links(content: &str, base_url: &str, job_id: &JobId) -> String {
    let base = base_url.trim_end_matches('/');
    RE_IMAGE_LINK
        .replace_all(content, |caps: &regex::Captures<'_>| {
            let alt = match &caps[1] {
                "" => "Newsletter image",
                a => a,
            };
            let src = &caps[2];
            let title = &caps[3];
            let resolved = if is_absolute_link(src) {
                src.to_string()
            } else {
                format!("{base}/output/{job_id}/{}", src.trim_start_matches("./"))
            };
            format!("![{alt}]({resolved}{title})")
        })
        .into_owned()
}

fn is_absolute_link(src: &str) -> bool {
    src.starts_with("http://")
        || src.starts_with("https://")
        || src.starts_with("data:")
        || src.starts_with('/')
}
