//! The remote conversion service, seen from the client.
//!
//! Every component talks to the service through the [`JobService`] trait so
//! the lifecycle logic never touches HTTP directly. [`http::HttpJobService`]
//! is the production implementation of the REST contract:
//!
//! ```text
//! POST   /api/upload                 multipart `file`      → { job_id }
//! POST   /api/upload-youtube         { url }               → { job_id }
//! GET    /api/status/{jobId}                               → { status, progress, message, error? }
//! GET    /api/preview/{jobId}                              → { content }
//! GET    /api/download/{jobId}                             → zip bytes
//! GET    /api/download/{jobId}/{fmt}                       → document bytes
//! DELETE /api/job/{jobId}                                  → { message }
//! ```
//!
//! Non-2xx responses may carry `{ detail }`; implementations surface it
//! through [`RequestError::Http`].

pub mod http;

use crate::error::RequestError;
use crate::job::{DownloadTarget, JobId, StatusSnapshot};
use crate::pipeline::input::VideoFile;
use async_trait::async_trait;

pub use http::HttpJobService;

/// One method per remote endpoint. Each call is a single request/response
/// exchange with no retry.
#[async_trait]
pub trait JobService: Send + Sync {
    /// Multipart upload of a local video.
    async fn submit_file(&self, video: &VideoFile) -> Result<JobId, RequestError>;

    /// Submit a remote source URL (already trimmed and non-empty).
    async fn submit_url(&self, url: &str) -> Result<JobId, RequestError>;

    /// Current status of a job.
    async fn status(&self, job_id: &JobId) -> Result<StatusSnapshot, RequestError>;

    /// Rendered document content; only valid after `completed`.
    async fn preview(&self, job_id: &JobId) -> Result<String, RequestError>;

    /// Raw bytes of the archive or a single export format.
    async fn download(&self, job_id: &JobId, target: DownloadTarget)
        -> Result<Vec<u8>, RequestError>;

    /// Delete the job and its files on the server.
    async fn delete_job(&self, job_id: &JobId) -> Result<(), RequestError>;
}
