//! Job, status and artifact types shared by every component.
//!
//! All wire types derive `Serialize`/`Deserialize` so the CLI can dump a
//! [`JobOutcome`] as JSON and tests can build snapshots from literals.

use crate::error::Vid2DocError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ── Job identity ─────────────────────────────────────────────────────────

/// Server-assigned job identifier. Opaque: no structure is assumed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 8 characters, for compact progress displays.
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(8) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ── Status ───────────────────────────────────────────────────────────────

/// Job status as reported by the remote service.
///
/// `Completed` and `Failed` are the only terminal states. Any status string
/// the client does not recognise deserialises to [`JobStatus::Unknown`] and
/// is treated as active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    /// URL jobs fetch the source video before processing starts.
    Downloading,
    Processing,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Downloading => "downloading",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observation of a job, as returned by `GET /api/status/{jobId}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub status: JobStatus,
    /// Completion percentage, 0–100.
    #[serde(default)]
    pub progress: u8,
    /// Human-readable current activity.
    #[serde(default)]
    pub message: String,
    /// Present only when `status == failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusSnapshot {
    /// The snapshot a freshly submitted job starts from.
    pub fn initial() -> Self {
        Self {
            status: JobStatus::Queued,
            progress: 0,
            message: "Starting...".to_string(),
            error: None,
        }
    }

    /// Display stage derived from `progress` alone.
    pub fn stage(&self) -> Stage {
        Stage::from_progress(self.progress)
    }
}

// ── Stage ────────────────────────────────────────────────────────────────

/// Presentation-only pipeline stage, derived purely from `progress`.
///
/// | progress  | stage                 |
/// |-----------|-----------------------|
/// | [0, 20)   | Uploading             |
/// | [20, 30)  | Extracting Audio      |
/// | [30, 50)  | Extracting Frames     |
/// | [50, 70)  | Analyzing with AI     |
/// | [70, 100) | Generating Newsletter |
/// | 100       | Complete              |
///
/// Deliberately independent of [`JobStatus`]: it gives fine-grained
/// sub-progress inside a single coarse server status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Uploading,
    ExtractingAudio,
    ExtractingFrames,
    AnalyzingWithAi,
    GeneratingNewsletter,
    Complete,
}

impl Stage {
    /// Boundary values belong to the next bucket: 20 is `ExtractingAudio`.
    pub fn from_progress(progress: u8) -> Self {
        match progress {
            0..=19 => Self::Uploading,
            20..=29 => Self::ExtractingAudio,
            30..=49 => Self::ExtractingFrames,
            50..=69 => Self::AnalyzingWithAi,
            70..=99 => Self::GeneratingNewsletter,
            _ => Self::Complete,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Uploading => "Uploading",
            Self::ExtractingAudio => "Extracting Audio",
            Self::ExtractingFrames => "Extracting Frames",
            Self::AnalyzingWithAi => "Analyzing with AI",
            Self::GeneratingNewsletter => "Generating Newsletter",
            Self::Complete => "Complete",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Self::Uploading => "📤",
            Self::ExtractingAudio => "🎵",
            Self::ExtractingFrames => "🎬",
            Self::AnalyzingWithAi => "🤖",
            Self::GeneratingNewsletter => "📝",
            Self::Complete => "✅",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── Artifacts ────────────────────────────────────────────────────────────

/// Single-document export formats offered by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Docx,
    Html,
    Markdown,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [Self::Docx, Self::Html, Self::Markdown];

    /// Path segment used in `GET /api/download/{jobId}/{format}`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Docx => "docx",
            Self::Html => "html",
            Self::Markdown => "markdown",
        }
    }

    pub fn extension(self) -> &'static str {
        extension_for(self.as_str())
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = Vid2DocError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "docx" => Ok(Self::Docx),
            "html" => Ok(Self::Html),
            "markdown" | "md" => Ok(Self::Markdown),
            other => Err(Vid2DocError::validation(format!(
                "unsupported export format '{other}' (expected docx, html or markdown)"
            ))),
        }
    }
}

/// File extension for a requested format name.
///
/// Total over all strings: `html` and `docx` map to themselves, everything
/// else (including unsupported names such as `pdf`) falls back to `md`.
pub fn extension_for(format: &str) -> &'static str {
    match format {
        "html" => "html",
        "docx" => "docx",
        _ => "md",
    }
}

/// Suggested download filename for a single-format artifact.
pub fn artifact_filename(job_id: &JobId, format: &str) -> String {
    format!("newsletter_{}.{}", job_id, extension_for(format))
}

/// Suggested download filename for the bundled archive.
pub fn archive_filename(job_id: &JobId) -> String {
    format!("newsletter_{job_id}.zip")
}

/// What to download from a completed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DownloadTarget {
    /// All formats bundled in one zip.
    Archive,
    Format(ExportFormat),
}

impl DownloadTarget {
    pub fn filename(self, job_id: &JobId) -> String {
        match self {
            Self::Archive => archive_filename(job_id),
            Self::Format(f) => artifact_filename(job_id, f.as_str()),
        }
    }
}

impl fmt::Display for DownloadTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Archive => f.write_str("archive"),
            Self::Format(fmt_) => write!(f, "{fmt_}"),
        }
    }
}

/// A downloaded artifact: the bytes plus the suggested filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedArtifact {
    pub target: DownloadTarget,
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Result of driving a job to completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOutcome {
    pub job_id: JobId,
    /// The first snapshot observed with `status == completed`.
    pub final_status: StatusSnapshot,
    /// Preview document (Markdown) fetched once after completion.
    pub preview: String,
    /// Number of successful status observations, including the terminal one.
    pub observations: usize,
}
