//! Shared fixtures: a scripted in-memory service and a recording observer.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use vid2doc::{
    DownloadTarget, JobId, JobProgressCallback, JobService, JobStatus, RequestError, Stage,
    StatusSnapshot, VideoFile,
};

pub fn snapshot(status: JobStatus, progress: u8, message: &str) -> StatusSnapshot {
    StatusSnapshot {
        status,
        progress,
        message: message.to_string(),
        error: None,
    }
}

pub fn processing(progress: u8) -> StatusSnapshot {
    snapshot(JobStatus::Processing, progress, "Working…")
}

pub fn completed() -> StatusSnapshot {
    snapshot(JobStatus::Completed, 100, "Newsletter generated successfully!")
}

pub fn failed(error: &str) -> StatusSnapshot {
    StatusSnapshot {
        status: JobStatus::Failed,
        progress: 35,
        message: format!("Error: {error}"),
        error: Some(error.to_string()),
    }
}

pub fn http_error(status: u16, detail: &str) -> RequestError {
    RequestError::Http {
        status,
        detail: Some(detail.to_string()),
    }
}

// ── Scripted service ─────────────────────────────────────────────────────────

struct Step {
    delay: Duration,
    result: Result<StatusSnapshot, RequestError>,
}

type Download = (Duration, Result<Vec<u8>, RequestError>);

static NEXT_JOB: AtomicUsize = AtomicUsize::new(1);

/// Answers status queries from a script, one step per query. The last step
/// repeats once the script runs out.
///
/// Every instance hands out its own job id, so tests running in parallel
/// never monitor the same job.
pub struct ScriptedService {
    job_id: String,
    steps: Mutex<VecDeque<Step>>,
    last: Mutex<Option<Result<StatusSnapshot, RequestError>>>,
    submit_answer: Mutex<Result<String, RequestError>>,
    preview: Mutex<Result<String, RequestError>>,
    downloads: Mutex<HashMap<DownloadTarget, Download>>,
    pub submit_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub preview_calls: AtomicUsize,
    pub status_times: Mutex<Vec<Instant>>,
    pub deleted: Mutex<Vec<JobId>>,
}

impl Default for ScriptedService {
    fn default() -> Self {
        let job_id = format!("job-{}", NEXT_JOB.fetch_add(1, Ordering::SeqCst));
        Self {
            submit_answer: Mutex::new(Ok(job_id.clone())),
            job_id,
            steps: Mutex::new(VecDeque::new()),
            last: Mutex::new(None),
            preview: Mutex::new(Ok("# Weekly Newsletter\n".to_string())),
            downloads: Mutex::new(HashMap::new()),
            submit_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            preview_calls: AtomicUsize::new(0),
            status_times: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(self, snapshot: StatusSnapshot) -> Self {
        self.then_delayed(Duration::ZERO, snapshot)
    }

    pub fn then_delayed(self, delay: Duration, snapshot: StatusSnapshot) -> Self {
        self.push(delay, Ok(snapshot))
    }

    pub fn then_error(self, error: RequestError) -> Self {
        self.push(Duration::ZERO, Err(error))
    }

    fn push(self, delay: Duration, result: Result<StatusSnapshot, RequestError>) -> Self {
        self.steps.lock().unwrap().push_back(Step { delay, result });
        self
    }

    pub fn with_submit(self, answer: Result<&str, RequestError>) -> Self {
        *self.submit_answer.lock().unwrap() = answer.map(str::to_string);
        self
    }

    pub fn with_preview(self, answer: Result<&str, RequestError>) -> Self {
        self.set_preview(answer);
        self
    }

    pub fn set_preview(&self, answer: Result<&str, RequestError>) {
        *self.preview.lock().unwrap() = answer.map(str::to_string);
    }

    pub fn with_download(
        self,
        target: DownloadTarget,
        delay: Duration,
        answer: Result<&[u8], RequestError>,
    ) -> Self {
        self.downloads
            .lock()
            .unwrap()
            .insert(target, (delay, answer.map(<[u8]>::to_vec)));
        self
    }

    /// The id `submit` answers with unless overridden.
    pub fn job_id(&self) -> JobId {
        JobId::new(self.job_id.as_str())
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn preview_calls(&self) -> usize {
        self.preview_calls.load(Ordering::SeqCst)
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    fn next_step(&self) -> (Duration, Result<StatusSnapshot, RequestError>) {
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step { delay, result }) => {
                *self.last.lock().unwrap() = Some(result.clone());
                (delay, result)
            }
            None => {
                let last = self.last.lock().unwrap().clone();
                (
                    Duration::ZERO,
                    last.unwrap_or_else(|| Ok(StatusSnapshot::initial())),
                )
            }
        }
    }

    fn submitted(&self) -> Result<JobId, RequestError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.submit_answer.lock().unwrap().clone().map(JobId::from)
    }
}

#[async_trait]
impl JobService for ScriptedService {
    async fn submit_file(&self, _video: &VideoFile) -> Result<JobId, RequestError> {
        self.submitted()
    }

    async fn submit_url(&self, _url: &str) -> Result<JobId, RequestError> {
        self.submitted()
    }

    async fn status(&self, _job_id: &JobId) -> Result<StatusSnapshot, RequestError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.status_times.lock().unwrap().push(Instant::now());
        let (delay, result) = self.next_step();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        result
    }

    async fn preview(&self, _job_id: &JobId) -> Result<String, RequestError> {
        self.preview_calls.fetch_add(1, Ordering::SeqCst);
        self.preview.lock().unwrap().clone()
    }

    async fn download(
        &self,
        _job_id: &JobId,
        target: DownloadTarget,
    ) -> Result<Vec<u8>, RequestError> {
        let (delay, answer) = self
            .downloads
            .lock()
            .unwrap()
            .get(&target)
            .cloned()
            .unwrap_or((Duration::ZERO, Ok(format!("{target} bytes").into_bytes())));
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        answer
    }

    async fn delete_job(&self, job_id: &JobId) -> Result<(), RequestError> {
        self.deleted.lock().unwrap().push(job_id.clone());
        Ok(())
    }
}

// ── Recording observer ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Seen {
    Submitted(String),
    Status { progress: u8, stage: Stage },
    PollError,
    Complete(String),
    Failed(String),
    RetrievalError(String),
}

#[derive(Default)]
pub struct RecordingCallback {
    seen: Mutex<Vec<Seen>>,
}

impl RecordingCallback {
    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn stages(&self) -> Vec<(u8, Stage)> {
        self.seen()
            .into_iter()
            .filter_map(|s| match s {
                Seen::Status { progress, stage } => Some((progress, stage)),
                _ => None,
            })
            .collect()
    }

    fn push(&self, s: Seen) {
        self.seen.lock().unwrap().push(s);
    }
}

impl JobProgressCallback for RecordingCallback {
    fn on_submitted(&self, job_id: &JobId) {
        self.push(Seen::Submitted(job_id.to_string()));
    }

    fn on_status(&self, _job_id: &JobId, snapshot: &StatusSnapshot, stage: Stage) {
        self.push(Seen::Status {
            progress: snapshot.progress,
            stage,
        });
    }

    fn on_poll_error(&self, _job_id: &JobId, _error: &RequestError) {
        self.push(Seen::PollError);
    }

    fn on_complete(&self, _job_id: &JobId, preview: &str) {
        self.push(Seen::Complete(preview.to_string()));
    }

    fn on_failed(&self, _job_id: &JobId, error: &str) {
        self.push(Seen::Failed(error.to_string()));
    }

    fn on_retrieval_error(&self, _job_id: &JobId, detail: &str) {
        self.push(Seen::RetrievalError(detail.to_string()));
    }
}
