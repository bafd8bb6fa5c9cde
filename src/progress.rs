//! Observer trait for job-lifecycle events.
//!
//! Inject an [`Arc<dyn JobProgressCallback>`] via
//! [`crate::config::ClientConfigBuilder::progress_callback`] to receive every
//! status snapshot the monitor observes, plus submission, transient-error and
//! terminal events.
//!
//! # Why callbacks instead of shared state?
//!
//! The monitor has no dependency on presentation state: it pushes each event
//! through this trait and the host decides where it goes (a terminal progress
//! bar, a channel, a websocket). [`crate::stream::watch_job`] is the same
//! events delivered as a `Stream`.
//!
//! # Example
//!
//! ```rust
//! use vid2doc::{JobId, JobProgressCallback, StatusSnapshot, Stage};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct CountingCallback {
//!     ticks: AtomicUsize,
//! }
//!
//! impl JobProgressCallback for CountingCallback {
//!     fn on_status(&self, _job_id: &JobId, snapshot: &StatusSnapshot, stage: Stage) {
//!         self.ticks.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{stage}: {}% {}", snapshot.progress, snapshot.message);
//!     }
//! }
//! ```

use crate::error::RequestError;
use crate::job::{JobId, Stage, StatusSnapshot};
use std::sync::Arc;

/// Called by the submitter and the progress monitor as a job advances.
///
/// Implementations must be `Send + Sync`: the monitor runs on a spawned
/// tokio task. All methods have default no-op implementations so callers
/// only override what they care about.
///
/// No method is invoked after the monitor has been cancelled.
pub trait JobProgressCallback: Send + Sync {
    /// Called once when the service accepted the submission.
    fn on_submitted(&self, job_id: &JobId) {
        let _ = job_id;
    }

    /// Called for every applied status observation, terminal or not.
    ///
    /// Queries can overlap when the service is slower than the poll
    /// interval. A response that arrives after a newer one was already
    /// applied is dropped without a call, so successive `snapshot`s are
    /// always in query order.
    ///
    /// # Arguments
    /// * `snapshot` — the status as returned by the service
    /// * `stage`    — display stage derived from `snapshot.progress`
    fn on_status(&self, job_id: &JobId, snapshot: &StatusSnapshot, stage: Stage) {
        let _ = (job_id, snapshot, stage);
    }

    /// Called when a single status query failed. Monitoring continues.
    fn on_poll_error(&self, job_id: &JobId, error: &RequestError) {
        let _ = (job_id, error);
    }

    /// Called once after completion, with the fetched preview content.
    fn on_complete(&self, job_id: &JobId, preview: &str) {
        let _ = (job_id, preview);
    }

    /// Called once when the service reported `status = failed`.
    fn on_failed(&self, job_id: &JobId, error: &str) {
        let _ = (job_id, error);
    }

    /// Called when the post-completion preview fetch failed.
    fn on_retrieval_error(&self, job_id: &JobId, error: &str) {
        let _ = (job_id, error);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl JobProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ClientConfig`].
pub type ProgressCallback = Arc<dyn JobProgressCallback>;
