//! # vid2doc
//!
//! Drive a remote video-to-newsletter conversion service: submit a video,
//! track the job until it finishes, then fetch the generated documents.
//!
//! ## Why this crate?
//!
//! The conversion service does the heavy lifting (audio transcription, frame
//! extraction, AI analysis, document rendering) as an asynchronous job that
//! runs for minutes. The client side is small but easy to get wrong: polls
//! that keep firing after the job finished, a second loop racing the first,
//! callbacks arriving after the user moved on, one failed download breaking
//! the others. This crate gets those details right once.
//!
//! ## Lifecycle Overview
//!
//! ```text
//! video file / URL
//!  │
//!  ├─ 1. Input     resolve and validate locally (no request on bad input)
//!  ├─ 2. Submit    one upload or URL submission → job id
//!  ├─ 3. Monitor   poll status every 2s, derive a display stage, stop on
//!  │               completed/failed, fetch the preview exactly once
//!  └─ 4. Retrieve  docx / html / markdown / zip, any number of times
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vid2doc::{process_video, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::builder()
//!         .base_url("http://localhost:8000")
//!         .build()?;
//!     let outcome = process_video("https://www.youtube.com/watch?v=dQw4w9WgXcQ", &config).await?;
//!     println!("{}", outcome.preview);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `vid2doc` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! vid2doc = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod job;
pub mod pipeline;
pub mod progress;
pub mod run;
pub mod service;
pub mod session;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ClientConfig, ClientConfigBuilder, DEFAULT_BASE_URL};
pub use error::{RequestError, Vid2DocError};
pub use job::{
    DownloadTarget, DownloadedArtifact, ExportFormat, JobId, JobOutcome, JobStatus, Stage,
    StatusSnapshot,
};
pub use pipeline::input::{resolve_input, SubmissionInput, VideoFile};
pub use pipeline::monitor::{is_monitored, observe_once, MonitorHandle, ProgressMonitor};
pub use pipeline::retrieve::{
    fetch_archive, fetch_artifact, fetch_preview, resolve_image_links, save_artifact,
};
pub use pipeline::submit::submit;
pub use progress::{JobProgressCallback, NoopProgressCallback, ProgressCallback};
pub use run::{download_all, process_video, process_video_sync, process_video_to_dir, process_video_with};
pub use service::{HttpJobService, JobService};
pub use session::{Session, SessionState};
pub use stream::{submit_and_watch, watch_job, JobEvent, JobEventStream};
