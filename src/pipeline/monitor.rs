//! Progress monitor: poll one job on a fixed interval until it is terminal.
//!
//! ## Timing
//!
//! The first status query fires immediately, then one per `poll_interval_ms`
//! of wall-clock time. Queries run as their own tasks, so a slow response
//! delays only its own processing, never the next tick. Responses that
//! arrive out of order are discarded if a newer observation was already
//! applied.
//!
//! ## Termination
//!
//! ```text
//! tick ──▶ snapshot ──▶ on_status ──┬─ completed ──▶ preview fetch ──▶ on_complete ──▶ stop
//!                                   ├─ failed    ──▶ on_failed ───────────────────────▶ stop
//!                                   └─ otherwise ──▶ wait for next tick
//! tick ──▶ transport error ──▶ on_poll_error ──▶ wait for next tick
//! ```
//!
//! Cancelling the [`MonitorHandle`] (or dropping it) stops the loop before
//! another tick fires; no callback runs once cancellation is observed.
//!
//! ## One loop per job
//!
//! Active jobs are tracked process-wide. Starting a second loop for a job
//! that is already monitored fails with [`Vid2DocError::MonitorBusy`], no
//! matter which [`ProgressMonitor`] (or stream) asks. A monitor also runs at
//! most one loop of its own at a time.

use crate::config::ClientConfig;
use crate::error::{RequestError, Vid2DocError};
use crate::job::{JobId, JobOutcome, JobStatus, StatusSnapshot};
use crate::progress::{JobProgressCallback, ProgressCallback};
use crate::service::JobService;
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Issue a single status query.
pub async fn observe_once(
    service: &dyn JobService,
    job_id: &JobId,
) -> Result<StatusSnapshot, RequestError> {
    service.status(job_id).await
}

// ── Active-loop bookkeeping ──────────────────────────────────────────────

/// Jobs with a running loop, across every monitor in the process.
static ACTIVE_JOBS: Lazy<Mutex<HashSet<JobId>>> = Lazy::new(|| Mutex::new(HashSet::new()));

fn active_jobs() -> MutexGuard<'static, HashSet<JobId>> {
    ACTIVE_JOBS.lock().unwrap_or_else(PoisonError::into_inner)
}

/// True while some loop in this process is monitoring `job_id`.
pub fn is_monitored(job_id: &JobId) -> bool {
    active_jobs().contains(job_id)
}

type ActiveSlot = Arc<Mutex<Option<JobId>>>;

fn lock(slot: &ActiveSlot) -> MutexGuard<'_, Option<JobId>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Releases the job's registry entry and the monitor's slot when the loop
/// task ends or is dropped.
struct ActiveGuard {
    slot: ActiveSlot,
    job_id: JobId,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        active_jobs().remove(&self.job_id);
        *lock(&self.slot) = None;
    }
}

/// Starts monitoring loops, at most one at a time per monitor and per job.
#[derive(Clone)]
pub struct ProgressMonitor {
    service: Arc<dyn JobService>,
    interval: Duration,
    callback: Option<ProgressCallback>,
    active: ActiveSlot,
}

impl ProgressMonitor {
    pub fn new(service: Arc<dyn JobService>, config: &ClientConfig) -> Self {
        Self {
            service,
            interval: config.poll_interval(),
            callback: config.progress_callback.clone(),
            active: Arc::new(Mutex::new(None)),
        }
    }

    /// Issue a single status query for `job_id` without starting a loop.
    pub async fn observe_once(&self, job_id: &JobId) -> Result<StatusSnapshot, RequestError> {
        observe_once(self.service.as_ref(), job_id).await
    }

    /// The job currently being monitored, if a loop is running.
    pub fn active_job(&self) -> Option<JobId> {
        lock(&self.active).clone()
    }

    /// Start the polling loop for `job_id` on the current tokio runtime.
    ///
    /// # Errors
    /// [`Vid2DocError::MonitorBusy`] if `job_id` is already monitored anywhere
    /// in the process, or if a loop started by this monitor (or a clone of
    /// it) is still running.
    pub fn start(&self, job_id: JobId) -> Result<MonitorHandle, Vid2DocError> {
        {
            let mut slot = lock(&self.active);
            if let Some(current) = slot.as_ref() {
                return Err(Vid2DocError::MonitorBusy {
                    job_id: current.to_string(),
                });
            }
            if !active_jobs().insert(job_id.clone()) {
                warn!("Job {} is already being monitored", job_id);
                return Err(Vid2DocError::MonitorBusy {
                    job_id: job_id.to_string(),
                });
            }
            *slot = Some(job_id.clone());
        }

        let cancel = CancellationToken::new();
        let ctx = LoopContext {
            service: Arc::clone(&self.service),
            job_id: job_id.clone(),
            interval: self.interval,
            callback: self.callback.clone(),
            cancel: cancel.clone(),
            _guard: ActiveGuard {
                slot: Arc::clone(&self.active),
                job_id: job_id.clone(),
            },
        };

        info!("Monitoring job {} every {:?}", job_id, self.interval);
        let task = tokio::spawn(run_loop(ctx));

        Ok(MonitorHandle {
            job_id,
            cancel,
            task: Some(task),
        })
    }
}

/// Owner of a running monitoring loop.
///
/// Dropping the handle cancels the loop.
pub struct MonitorHandle {
    job_id: JobId,
    cancel: CancellationToken,
    task: Option<JoinHandle<Result<JobOutcome, Vid2DocError>>>,
}

impl MonitorHandle {
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// True once the loop has stopped for any reason.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// A token that cancels this loop, for wiring to signal handlers.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the job to reach a terminal state.
    ///
    /// # Returns
    /// - `Ok(JobOutcome)` — completed and the preview was fetched
    /// - `Err(JobFailed)` — the service reported `failed`
    /// - `Err(Retrieval)` — completed, but the preview fetch failed
    /// - `Err(Cancelled)` — the loop was cancelled first
    pub async fn wait(mut self) -> Result<JobOutcome, Vid2DocError> {
        let Some(task) = self.task.take() else {
            return Err(Vid2DocError::Internal("monitor already awaited".into()));
        };
        match task.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(Vid2DocError::Cancelled {
                job_id: self.job_id.to_string(),
            }),
            Err(e) => Err(Vid2DocError::Internal(format!("Monitor task panicked: {e}"))),
        }
    }

    /// Stop the loop and wait until it has exited. No callback fires after
    /// this returns.
    pub async fn cancel(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for MonitorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorHandle")
            .field("job_id", &self.job_id)
            .field("cancelled", &self.cancel.is_cancelled())
            .field("finished", &self.is_finished())
            .finish()
    }
}

// ── Loop ─────────────────────────────────────────────────────────────────

struct LoopContext {
    service: Arc<dyn JobService>,
    job_id: JobId,
    interval: Duration,
    callback: Option<ProgressCallback>,
    cancel: CancellationToken,
    _guard: ActiveGuard,
}

impl LoopContext {
    /// Invoke the observer unless cancellation was requested.
    fn notify(&self, f: impl FnOnce(&dyn JobProgressCallback)) {
        if self.cancel.is_cancelled() {
            return;
        }
        if let Some(cb) = &self.callback {
            f(cb.as_ref());
        }
    }

    fn cancelled(&self) -> Vid2DocError {
        info!("Monitoring of job {} cancelled", self.job_id);
        Vid2DocError::Cancelled {
            job_id: self.job_id.to_string(),
        }
    }
}

type Observation = (u64, Result<StatusSnapshot, RequestError>);

async fn run_loop(ctx: LoopContext) -> Result<JobOutcome, Vid2DocError> {
    let mut ticker = tokio::time::interval(ctx.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut in_flight: JoinSet<Observation> = JoinSet::new();
    let mut issued: u64 = 0;
    let mut newest_applied: Option<u64> = None;
    let mut observations = 0usize;

    loop {
        tokio::select! {
            biased;

            () = ctx.cancel.cancelled() => {
                in_flight.abort_all();
                return Err(ctx.cancelled());
            }

            Some(joined) = in_flight.join_next() => {
                let (seq, result) = match joined {
                    Ok(observation) => observation,
                    Err(e) => {
                        warn!("Job {}: status task ended abnormally: {}", ctx.job_id, e);
                        continue;
                    }
                };

                let snapshot = match result {
                    Ok(snapshot) => snapshot,
                    Err(e) => {
                        warn!("Job {}: status query #{} failed — {}", ctx.job_id, seq, e);
                        ctx.notify(|cb| cb.on_poll_error(&ctx.job_id, &e));
                        continue;
                    }
                };

                if newest_applied.is_some_and(|newest| seq < newest) {
                    debug!("Job {}: discarding stale status #{}", ctx.job_id, seq);
                    continue;
                }
                newest_applied = Some(seq);
                observations += 1;

                let stage = snapshot.stage();
                debug!(
                    "Job {}: {} {}% [{}] {}",
                    ctx.job_id, snapshot.status, snapshot.progress, stage, snapshot.message
                );
                ctx.notify(|cb| cb.on_status(&ctx.job_id, &snapshot, stage));

                match snapshot.status {
                    JobStatus::Completed => {
                        in_flight.abort_all();
                        return finish_completed(&ctx, snapshot, observations).await;
                    }
                    JobStatus::Failed => {
                        in_flight.abort_all();
                        let error = failure_reason(&snapshot);
                        warn!("Job {} failed: {}", ctx.job_id, error);
                        ctx.notify(|cb| cb.on_failed(&ctx.job_id, &error));
                        return Err(Vid2DocError::JobFailed {
                            job_id: ctx.job_id.to_string(),
                            error,
                        });
                    }
                    _ => {}
                }
            }

            _ = ticker.tick() => {
                let seq = issued;
                issued += 1;
                let service = Arc::clone(&ctx.service);
                let job_id = ctx.job_id.clone();
                in_flight.spawn(async move {
                    (seq, observe_once(service.as_ref(), &job_id).await)
                });
            }
        }
    }
}

/// Fetch the preview exactly once, then signal completion.
async fn finish_completed(
    ctx: &LoopContext,
    final_status: StatusSnapshot,
    observations: usize,
) -> Result<JobOutcome, Vid2DocError> {
    info!("Job {} completed; fetching preview", ctx.job_id);

    let preview = tokio::select! {
        biased;
        () = ctx.cancel.cancelled() => return Err(ctx.cancelled()),
        preview = ctx.service.preview(&ctx.job_id) => preview,
    };

    match preview {
        Ok(content) => {
            ctx.notify(|cb| cb.on_complete(&ctx.job_id, &content));
            Ok(JobOutcome {
                job_id: ctx.job_id.clone(),
                final_status,
                preview: content,
                observations,
            })
        }
        Err(e) => {
            let detail = e.detail_or("Failed to load newsletter preview");
            warn!("Job {}: preview fetch failed — {}", ctx.job_id, e);
            ctx.notify(|cb| cb.on_retrieval_error(&ctx.job_id, &detail));
            Err(Vid2DocError::Retrieval {
                job_id: ctx.job_id.to_string(),
                what: "preview".into(),
                detail,
            })
        }
    }
}

fn failure_reason(snapshot: &StatusSnapshot) -> String {
    match &snapshot.error {
        Some(e) if !e.is_empty() => e.clone(),
        _ if !snapshot.message.is_empty() => snapshot.message.clone(),
        _ => "Processing failed".to_string(),
    }
}
