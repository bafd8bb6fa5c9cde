//! reqwest implementation of [`JobService`].
//!
//! Status, preview, download and delete requests share the client-wide
//! `request_timeout_secs`; the upload overrides it per request with
//! `upload_timeout_secs`.

use super::JobService;
use crate::config::ClientConfig;
use crate::error::{RequestError, Vid2DocError};
use crate::job::{DownloadTarget, JobId, StatusSnapshot};
use crate::pipeline::input::VideoFile;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Deserialize)]
struct SubmitResponse {
    job_id: String,
}

#[derive(Serialize)]
struct UrlSubmission<'a> {
    url: &'a str,
}

#[derive(Deserialize)]
struct PreviewResponse {
    content: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

/// HTTP client for the conversion service.
#[derive(Debug, Clone)]
pub struct HttpJobService {
    client: Client,
    base: Url,
    upload_timeout: Duration,
}

impl HttpJobService {
    pub fn new(config: &ClientConfig) -> Result<Self, Vid2DocError> {
        let base = Url::parse(&config.base_url).map_err(|e| {
            Vid2DocError::InvalidConfig(format!("invalid base URL '{}': {e}", config.base_url))
        })?;
        if base.cannot_be_a_base() {
            return Err(Vid2DocError::InvalidConfig(format!(
                "base URL '{}' cannot carry a path",
                config.base_url
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| Vid2DocError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base,
            upload_timeout: Duration::from_secs(config.upload_timeout_secs),
        })
    }

    /// Join path segments onto the base URL, percent-encoding each one so
    /// the opaque job id cannot escape its segment.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

#[async_trait]
impl JobService for HttpJobService {
    async fn submit_file(&self, video: &VideoFile) -> Result<JobId, RequestError> {
        let url = self.url(&["api", "upload"]);
        debug!("POST {} ({} bytes, {})", url, video.bytes.len(), video.media_type);

        let part = Part::bytes(video.bytes.clone())
            .file_name(video.file_name.clone())
            .mime_str(&video.media_type)
            .map_err(|e| RequestError::Transport(format!("invalid media type: {e}")))?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(url)
            .multipart(form)
            .timeout(self.upload_timeout)
            .send()
            .await
            .map_err(transport)?;

        let body: SubmitResponse = decode_json(check(response).await?).await?;
        Ok(JobId::new(body.job_id))
    }

    async fn submit_url(&self, url: &str) -> Result<JobId, RequestError> {
        let endpoint = self.url(&["api", "upload-youtube"]);
        debug!("POST {} url={}", endpoint, url);

        let response = self
            .client
            .post(endpoint)
            .json(&UrlSubmission { url })
            .send()
            .await
            .map_err(transport)?;

        let body: SubmitResponse = decode_json(check(response).await?).await?;
        Ok(JobId::new(body.job_id))
    }

    async fn status(&self, job_id: &JobId) -> Result<StatusSnapshot, RequestError> {
        let response = self
            .client
            .get(self.url(&["api", "status", job_id.as_str()]))
            .send()
            .await
            .map_err(transport)?;
        decode_json(check(response).await?).await
    }

    async fn preview(&self, job_id: &JobId) -> Result<String, RequestError> {
        let response = self
            .client
            .get(self.url(&["api", "preview", job_id.as_str()]))
            .send()
            .await
            .map_err(transport)?;
        let body: PreviewResponse = decode_json(check(response).await?).await?;
        Ok(body.content)
    }

    async fn download(
        &self,
        job_id: &JobId,
        target: DownloadTarget,
    ) -> Result<Vec<u8>, RequestError> {
        let url = match target {
            DownloadTarget::Archive => self.url(&["api", "download", job_id.as_str()]),
            DownloadTarget::Format(f) => {
                self.url(&["api", "download", job_id.as_str(), f.as_str()])
            }
        };
        debug!("GET {}", url);

        let response = self.client.get(url).send().await.map_err(transport)?;
        let bytes = check(response).await?.bytes().await.map_err(transport)?;
        Ok(bytes.to_vec())
    }

    async fn delete_job(&self, job_id: &JobId) -> Result<(), RequestError> {
        let response = self
            .client
            .delete(self.url(&["api", "job", job_id.as_str()]))
            .send()
            .await
            .map_err(transport)?;
        check(response).await?;
        Ok(())
    }
}

// ── Response helpers ─────────────────────────────────────────────────────

fn transport(e: reqwest::Error) -> RequestError {
    if e.is_decode() {
        RequestError::Decode(e.to_string())
    } else {
        RequestError::Transport(e.to_string())
    }
}

/// Pass 2xx responses through; turn everything else into
/// [`RequestError::Http`] carrying the server's `detail` if present.
async fn check(response: Response) -> Result<Response, RequestError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(RequestError::Http {
        status: status.as_u16(),
        detail: parse_detail(&body),
    })
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, RequestError> {
    let text = response.text().await.map_err(transport)?;
    serde_json::from_str(&text).map_err(|e| RequestError::Decode(e.to_string()))
}

/// Extract `detail` from an error body. String details are returned
/// verbatim; structured ones (validation error lists) as compact JSON.
pub fn parse_detail(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match parsed.detail {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}
