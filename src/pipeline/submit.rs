//! Submitter: exchange a validated input for a job id.
//!
//! Exactly one network call per accepted input. Monitoring is *not* started
//! here; the caller decides what to do with the returned [`JobId`].

use crate::error::Vid2DocError;
use crate::job::JobId;
use crate::pipeline::input::SubmissionInput;
use crate::progress::ProgressCallback;
use crate::service::JobService;
use tracing::{info, warn};

/// Generic messages used when the service gives no `detail`.
const UPLOAD_FAILED: &str = "Failed to upload video";
const URL_FAILED: &str = "Failed to process YouTube URL";

/// Submit a video file or source URL.
///
/// # Errors
/// - [`Vid2DocError::Validation`] — non-video media type or blank URL; no
///   request is made
/// - [`Vid2DocError::Submission`] — transport failure or server rejection,
///   carrying the server's `detail` verbatim when present
pub async fn submit(
    service: &dyn JobService,
    input: &SubmissionInput,
    callback: Option<&ProgressCallback>,
) -> Result<JobId, Vid2DocError> {
    input.validate()?;

    let result = match input {
        SubmissionInput::File(video) => {
            info!("Uploading '{}' ({} bytes)", video.file_name, video.bytes.len());
            service
                .submit_file(video)
                .await
                .map_err(|e| (e, UPLOAD_FAILED))
        }
        SubmissionInput::Url(url) => {
            let url = url.trim();
            info!("Submitting source URL {}", url);
            service.submit_url(url).await.map_err(|e| (e, URL_FAILED))
        }
    };

    match result {
        Ok(job_id) => {
            info!("Job {} accepted", job_id);
            if let Some(cb) = callback {
                cb.on_submitted(&job_id);
            }
            Ok(job_id)
        }
        Err((e, fallback)) => {
            warn!("Submission failed: {}", e);
            Err(Vid2DocError::Submission {
                detail: e.detail_or(fallback),
            })
        }
    }
}
