//! Streaming API: every observation of a job as it happens.
//!
//! ## Why stream?
//!
//! Jobs take minutes. A `Stream` lets callers render progress however they
//! like (a TUI, a websocket, a log line per tick) without implementing
//! [`JobProgressCallback`] themselves. The eager [`crate::run::process_video`]
//! only returns once the job is terminal.
//!
//! The stream ends after the terminal event. Dropping it cancels the
//! underlying monitoring loop.

use crate::config::ClientConfig;
use crate::error::{RequestError, Vid2DocError};
use crate::job::{JobId, Stage, StatusSnapshot};
use crate::pipeline::input;
use crate::pipeline::monitor::{MonitorHandle, ProgressMonitor};
use crate::pipeline::submit;
use crate::progress::{JobProgressCallback, ProgressCallback};
use crate::service::{HttpJobService, JobService};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// One thing that happened to a monitored job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    /// A status snapshot was applied.
    Status {
        snapshot: StatusSnapshot,
        stage: Stage,
    },
    /// A status query failed; polling continues.
    PollError(RequestError),
    /// Terminal: completed, preview fetched.
    Completed { preview: String },
    /// Terminal: the remote pipeline failed.
    Failed { error: String },
    /// Terminal: completed, but the preview could not be loaded.
    PreviewFailed { detail: String },
}

impl JobEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed { .. } | Self::Failed { .. } | Self::PreviewFailed { .. }
        )
    }
}

/// Forwards observer calls into a channel, then to the caller's own
/// callback if one was configured.
struct ChannelCallback {
    tx: mpsc::UnboundedSender<JobEvent>,
    inner: Option<ProgressCallback>,
}

impl ChannelCallback {
    fn send(&self, event: JobEvent) {
        // Receiver gone means the stream was dropped; the loop is being
        // cancelled anyway.
        let _ = self.tx.send(event);
    }
}

impl JobProgressCallback for ChannelCallback {
    fn on_submitted(&self, job_id: &JobId) {
        if let Some(cb) = &self.inner {
            cb.on_submitted(job_id);
        }
    }

    fn on_status(&self, job_id: &JobId, snapshot: &StatusSnapshot, stage: Stage) {
        self.send(JobEvent::Status {
            snapshot: snapshot.clone(),
            stage,
        });
        if let Some(cb) = &self.inner {
            cb.on_status(job_id, snapshot, stage);
        }
    }

    fn on_poll_error(&self, job_id: &JobId, error: &RequestError) {
        self.send(JobEvent::PollError(error.clone()));
        if let Some(cb) = &self.inner {
            cb.on_poll_error(job_id, error);
        }
    }

    fn on_complete(&self, job_id: &JobId, preview: &str) {
        self.send(JobEvent::Completed {
            preview: preview.to_string(),
        });
        if let Some(cb) = &self.inner {
            cb.on_complete(job_id, preview);
        }
    }

    fn on_failed(&self, job_id: &JobId, error: &str) {
        self.send(JobEvent::Failed {
            error: error.to_string(),
        });
        if let Some(cb) = &self.inner {
            cb.on_failed(job_id, error);
        }
    }

    fn on_retrieval_error(&self, job_id: &JobId, detail: &str) {
        self.send(JobEvent::PreviewFailed {
            detail: detail.to_string(),
        });
        if let Some(cb) = &self.inner {
            cb.on_retrieval_error(job_id, detail);
        }
    }
}

/// A stream of [`JobEvent`]s for one job.
///
/// Owns the monitoring loop: dropping the stream cancels it.
pub struct JobEventStream {
    events: UnboundedReceiverStream<JobEvent>,
    handle: MonitorHandle,
}

impl JobEventStream {
    pub fn job_id(&self) -> &JobId {
        self.handle.job_id()
    }

    /// Token that cancels the underlying loop; the stream then ends.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.handle.cancellation_token()
    }
}

impl Stream for JobEventStream {
    type Item = JobEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().events).poll_next(cx)
    }
}

impl std::fmt::Debug for JobEventStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobEventStream")
            .field("handle", &self.handle)
            .finish()
    }
}

/// Watch an already-submitted job.
///
/// The configured `progress_callback`, if any, still receives every call.
///
/// # Errors
/// [`Vid2DocError::MonitorBusy`] if the job is already being watched or
/// monitored elsewhere in the process.
///
/// # Example
/// ```rust,no_run
/// use futures::StreamExt;
/// use std::sync::Arc;
/// use vid2doc::{watch_job, ClientConfig, HttpJobService, JobEvent, JobId};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ClientConfig::default();
/// let service = Arc::new(HttpJobService::new(&config)?);
/// let mut events = watch_job(service, JobId::new("3f2a9c1e"), &config)?;
/// while let Some(event) = events.next().await {
///     if let JobEvent::Status { snapshot, stage } = &event {
///         println!("{:>3}% {}", snapshot.progress, stage);
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub fn watch_job(
    service: Arc<dyn JobService>,
    job_id: JobId,
    config: &ClientConfig,
) -> Result<JobEventStream, Vid2DocError> {
    let (tx, rx) = mpsc::unbounded_channel();
    let callback: ProgressCallback = Arc::new(ChannelCallback {
        tx,
        inner: config.progress_callback.clone(),
    });

    let mut config = config.clone();
    config.progress_callback = Some(callback);

    // The loop task holds the only long-lived sender; the stream ends when
    // the loop does.
    let handle = ProgressMonitor::new(service, &config).start(job_id)?;
    Ok(JobEventStream {
        events: UnboundedReceiverStream::new(rx),
        handle,
    })
}

/// Submit a video (local path or URL) over HTTP and watch it.
pub async fn submit_and_watch(
    input_str: impl AsRef<str>,
    config: &ClientConfig,
) -> Result<JobEventStream, Vid2DocError> {
    let input = input::resolve_input(input_str.as_ref()).await?;
    let service: Arc<dyn JobService> = Arc::new(HttpJobService::new(config)?);
    let job_id = submit::submit(service.as_ref(), &input, config.progress_callback.as_ref()).await?;
    info!("Streaming events for job {}", job_id);
    watch_job(service, job_id, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_events() {
        assert!(JobEvent::Completed { preview: String::new() }.is_terminal());
        assert!(JobEvent::Failed { error: "x".into() }.is_terminal());
        assert!(JobEvent::PreviewFailed { detail: "x".into() }.is_terminal());
        assert!(!JobEvent::PollError(RequestError::Transport("x".into())).is_terminal());
        assert!(!JobEvent::Status {
            snapshot: StatusSnapshot::initial(),
            stage: Stage::Uploading,
        }
        .is_terminal());
    }

    #[test]
    fn forwards_to_inner_callback() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        struct Counter(AtomicUsize);
        impl JobProgressCallback for Counter {
            fn on_status(&self, _: &JobId, _: &StatusSnapshot, _: Stage) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cb = ChannelCallback {
            tx,
            inner: Some(counter.clone() as ProgressCallback),
        };
        cb.on_status(&JobId::new("j"), &StatusSnapshot::initial(), Stage::Uploading);

        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
        assert!(matches!(rx.try_recv(), Ok(JobEvent::Status { .. })));
    }
}
