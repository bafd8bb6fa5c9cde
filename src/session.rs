//! The client-observed job lifecycle.
//!
//! ```text
//!  Idle ──submit──▶ Monitoring ──wait──┬─▶ Ready   (completed, preview fetched)
//!                                      └─▶ Failed  (error surfaced)
//!  any state ──reset──▶ Idle
//! ```
//!
//! `Ready` permits any number of downloads; `Failed` permits none. A
//! session owns at most one monitoring loop, and `reset` cancels it before
//! discarding the job.

use crate::config::ClientConfig;
use crate::error::Vid2DocError;
use crate::job::{DownloadTarget, DownloadedArtifact, JobId, JobOutcome};
use crate::pipeline::input::SubmissionInput;
use crate::pipeline::monitor::{MonitorHandle, ProgressMonitor};
use crate::pipeline::{retrieve, submit};
use crate::service::{HttpJobService, JobService};
use futures::future::join_all;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Where a session is in the lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No job.
    Idle,
    /// A job was accepted and its loop is running.
    Monitoring { job_id: JobId },
    /// The job completed. `preview` is `None` if its fetch failed.
    Ready {
        job_id: JobId,
        preview: Option<String>,
    },
    /// The remote pipeline reported failure.
    Failed { job_id: JobId, error: String },
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Monitoring { .. } => "monitoring",
            Self::Ready { .. } => "ready",
            Self::Failed { .. } => "failed",
        }
    }

    pub fn job_id(&self) -> Option<&JobId> {
        match self {
            Self::Idle => None,
            Self::Monitoring { job_id }
            | Self::Ready { job_id, .. }
            | Self::Failed { job_id, .. } => Some(job_id),
        }
    }
}

/// One user's view of one job at a time.
pub struct Session {
    service: Arc<dyn JobService>,
    config: ClientConfig,
    monitor: ProgressMonitor,
    handle: Option<MonitorHandle>,
    state: SessionState,
}

impl Session {
    /// Session talking HTTP to `config.base_url`.
    pub fn new(config: ClientConfig) -> Result<Self, Vid2DocError> {
        let service = Arc::new(HttpJobService::new(&config)?);
        Ok(Self::with_service(service, config))
    }

    pub fn with_service(service: Arc<dyn JobService>, config: ClientConfig) -> Self {
        let monitor = ProgressMonitor::new(Arc::clone(&service), &config);
        Self {
            service,
            config,
            monitor,
            handle: None,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn job_id(&self) -> Option<&JobId> {
        self.state.job_id()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Token cancelling the running loop, if any.
    pub fn cancellation_token(&self) -> Option<CancellationToken> {
        self.handle.as_ref().map(MonitorHandle::cancellation_token)
    }

    fn invalid(&self, operation: &str) -> Vid2DocError {
        Vid2DocError::InvalidState {
            operation: operation.to_string(),
            state: self.state.name().to_string(),
        }
    }

    /// Submit a video and start monitoring it. Only valid when idle.
    ///
    /// On validation or submission failure the session stays idle, so the
    /// caller can correct the input and submit again.
    pub async fn submit(&mut self, input: &SubmissionInput) -> Result<JobId, Vid2DocError> {
        if self.state != SessionState::Idle {
            return Err(self.invalid("submit"));
        }

        let job_id = submit::submit(
            self.service.as_ref(),
            input,
            self.config.progress_callback.as_ref(),
        )
        .await?;

        let handle = self.monitor.start(job_id.clone())?;
        self.handle = Some(handle);
        self.state = SessionState::Monitoring {
            job_id: job_id.clone(),
        };
        Ok(job_id)
    }

    /// Drive the running loop to a terminal state.
    ///
    /// # Errors
    /// - [`Vid2DocError::JobFailed`] — session moves to `Failed`
    /// - [`Vid2DocError::Retrieval`] — job completed but the preview fetch
    ///   failed; session moves to `Ready` without a preview
    /// - [`Vid2DocError::Cancelled`] — session returns to `Idle`
    pub async fn wait(&mut self) -> Result<&SessionState, Vid2DocError> {
        let (Some(handle), SessionState::Monitoring { job_id }) = (self.handle.take(), &self.state)
        else {
            return Err(self.invalid("wait"));
        };
        let job_id = job_id.clone();

        match handle.wait().await {
            Ok(JobOutcome { preview, .. }) => {
                self.state = SessionState::Ready {
                    job_id,
                    preview: Some(preview),
                };
                Ok(&self.state)
            }
            Err(Vid2DocError::JobFailed { job_id: id, error }) => {
                self.state = SessionState::Failed {
                    job_id,
                    error: error.clone(),
                };
                Err(Vid2DocError::JobFailed { job_id: id, error })
            }
            Err(e @ Vid2DocError::Retrieval { .. }) => {
                self.state = SessionState::Ready {
                    job_id,
                    preview: None,
                };
                Err(e)
            }
            Err(e) => {
                self.state = SessionState::Idle;
                Err(e)
            }
        }
    }

    /// The preview of a ready job.
    pub fn preview(&self) -> Option<&str> {
        match &self.state {
            SessionState::Ready { preview, .. } => preview.as_deref(),
            _ => None,
        }
    }

    /// The preview with relative image links resolved against the service.
    pub fn preview_with_images(&self) -> Option<String> {
        let job_id = self.job_id()?;
        self.preview()
            .map(|p| retrieve::resolve_image_links(p, &self.config.base_url, job_id))
    }

    /// Fetch the preview again, e.g. after the post-completion fetch failed.
    pub async fn refresh_preview(&mut self) -> Result<&str, Vid2DocError> {
        let SessionState::Ready { job_id, .. } = &self.state else {
            return Err(self.invalid("fetch preview"));
        };
        let job_id = job_id.clone();
        let content = retrieve::fetch_preview(self.service.as_ref(), &job_id).await?;
        self.state = SessionState::Ready {
            job_id,
            preview: Some(content),
        };
        Ok(self.preview().unwrap_or_default())
    }

    fn ready_job(&self, operation: &str) -> Result<&JobId, Vid2DocError> {
        match &self.state {
            SessionState::Ready { job_id, .. } => Ok(job_id),
            _ => Err(self.invalid(operation)),
        }
    }

    /// Download one artifact. Only valid when ready.
    pub async fn download(&self, target: DownloadTarget) -> Result<DownloadedArtifact, Vid2DocError> {
        let job_id = self.ready_job("download")?;
        retrieve::check_offered(&self.config, target)?;
        retrieve::fetch(self.service.as_ref(), job_id, target).await
    }

    /// Download several artifacts concurrently. Each result is independent
    /// of the others.
    pub async fn download_many(
        &self,
        targets: &[DownloadTarget],
    ) -> Vec<(DownloadTarget, Result<DownloadedArtifact, Vid2DocError>)> {
        join_all(
            targets
                .iter()
                .map(|&target| async move { (target, self.download(target).await) }),
        )
        .await
    }

    /// Discard all in-memory state and return to idle. Any running loop is
    /// cancelled first.
    pub async fn reset(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.cancel().await;
        }
        if let Some(job_id) = self.state.job_id() {
            info!("Session reset (was {} for job {})", self.state.name(), job_id);
        }
        self.state = SessionState::Idle;
    }

    /// Like [`Session::reset`], but also deletes the job on the server.
    ///
    /// The session is idle afterwards even if the delete request failed.
    pub async fn reset_and_delete(&mut self) -> Result<(), Vid2DocError> {
        let job_id = self.state.job_id().cloned();
        self.reset().await;

        let Some(job_id) = job_id else {
            return Ok(());
        };
        self.service.delete_job(&job_id).await.map_err(|e| {
            warn!("Job {}: delete failed — {}", job_id, e);
            Vid2DocError::Retrieval {
                job_id: job_id.to_string(),
                what: "delete".into(),
                detail: e.detail_or("Failed to delete job"),
            }
        })
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("config", &self.config)
            .finish()
    }
}
