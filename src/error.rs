//! Error types for the vid2doc library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Vid2DocError`] — **Fatal** for the current operation: bad input,
//!   rejected submission, a job the remote pipeline reported as failed, or a
//!   retrieval that did not succeed. Returned as `Err(Vid2DocError)` from the
//!   submit / monitor / retrieve entry points.
//!
//! * [`RequestError`] — **Non-fatal**: a single exchange with the remote
//!   service failed (connection reset, 5xx, garbled body). The progress
//!   monitor swallows these per tick and reports them to the observer; the
//!   submitter and retriever fold them into the matching fatal variant.
//!
//! Keeping the per-request error separate lets the monitor survive transient
//! blips while every other caller still sees a single fatal error type.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the vid2doc library.
///
/// Per-request transport failures use [`RequestError`]; during monitoring
/// they are reported to the observer rather than propagated here.
#[derive(Debug, Error)]
pub enum Vid2DocError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input was rejected locally before any network call.
    #[error("Invalid input: {reason}")]
    Validation { reason: String },

    /// Input file was not found at the given path.
    #[error("Video file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    // ── Remote errors ─────────────────────────────────────────────────────
    /// The service rejected the submission or it never reached the service.
    #[error("Submission failed: {detail}")]
    Submission { detail: String },

    /// The remote pipeline reported `status = failed`.
    #[error("Job {job_id} failed: {error}\nStart a new job to try again.")]
    JobFailed { job_id: String, error: String },

    /// A preview or artifact fetch failed. Does not affect the job itself.
    #[error("Failed to retrieve {what} for job {job_id}: {detail}")]
    Retrieval {
        job_id: String,
        what: String,
        detail: String,
    },

    // ── Lifecycle errors ──────────────────────────────────────────────────
    /// A monitoring loop is already running; a second one is refused.
    #[error("Already monitoring job {job_id}; cancel or reset before starting another")]
    MonitorBusy { job_id: String },

    /// Monitoring was cancelled before the job reached a terminal state.
    #[error("Monitoring of job {job_id} was cancelled")]
    Cancelled { job_id: String },

    /// The operation is not permitted in the session's current state.
    #[error("Cannot {operation} while session is {state}")]
    InvalidState { operation: String, state: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write a downloaded artifact.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Vid2DocError {
    pub(crate) fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    /// True for errors the user fixes by changing the input and retrying.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

/// A non-fatal error for a single request to the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// The request never produced an HTTP response (DNS, refused, timeout).
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered with a non-2xx status.
    #[error("HTTP {status}{}", .detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default())]
    Http { status: u16, detail: Option<String> },

    /// The response body did not match the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl RequestError {
    /// The server-supplied `detail` message, when the service sent one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Http { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// The server detail verbatim, or `fallback` when there is none.
    pub fn detail_or(&self, fallback: &str) -> String {
        self.detail().unwrap_or(fallback).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_failed_display() {
        let e = Vid2DocError::JobFailed {
            job_id: "abc".into(),
            error: "ffmpeg exited with 1".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("abc"), "got: {msg}");
        assert!(msg.contains("ffmpeg exited with 1"), "got: {msg}");
    }

    #[test]
    fn http_error_display_with_detail() {
        let e = RequestError::Http {
            status: 400,
            detail: Some("File must be a video".into()),
        };
        assert_eq!(e.to_string(), "HTTP 400: File must be a video");
    }

    #[test]
    fn http_error_display_without_detail() {
        let e = RequestError::Http {
            status: 502,
            detail: None,
        };
        assert_eq!(e.to_string(), "HTTP 502");
    }

    #[test]
    fn detail_or_prefers_server_detail() {
        let e = RequestError::Http {
            status: 400,
            detail: Some("Invalid YouTube URL".into()),
        };
        assert_eq!(e.detail_or("Failed to process YouTube URL"), "Invalid YouTube URL");

        let e = RequestError::Transport("connection refused".into());
        assert_eq!(e.detail_or("Failed to upload video"), "Failed to upload video");
    }

    #[test]
    fn validation_is_flagged() {
        assert!(Vid2DocError::validation("empty URL").is_validation());
        assert!(!Vid2DocError::Internal("x".into()).is_validation());
    }
}
