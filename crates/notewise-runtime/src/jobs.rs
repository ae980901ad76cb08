//! In-memory job registry.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use notewise_core::{CancelToken, Error, EventSink, GenerationEvent, Result};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::types::{JobKind, JobState, JobStatus};

/// Finished jobs kept for polling; older ones are pruned.
pub const MAX_FINISHED_JOBS: usize = 100;

/// One job's status behind its own lock, plus its cancel flag.
pub struct JobCell {
    status: Mutex<JobStatus>,
    cancel: CancelToken,
}

impl JobCell {
    fn new(status: JobStatus) -> Self {
        Self {
            status: Mutex::new(status),
            cancel: CancelToken::new(),
        }
    }

    pub fn id(&self) -> String {
        self.status.lock().id.clone()
    }

    pub fn snapshot(&self) -> JobStatus {
        self.status.lock().clone()
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Mark the job failed unless it already reached a terminal state.
    pub fn fail(&self, message: impl Into<String>) {
        let mut status = self.status.lock();
        if status.is_finished() {
            return;
        }
        status.state = if self.cancel.is_cancelled() {
            JobState::Cancelled
        } else {
            JobState::Failed
        };
        status.error = Some(message.into());
        status.finished_at = Some(Utc::now());
    }

    /// Fail with `err` and keep its code, also when an `Error` event already
    /// ended the job.
    pub fn fail_with(&self, err: &Error) {
        self.fail(err.user_message());
        let mut status = self.status.lock();
        if status.error_code.is_some() {
            return;
        }
        status.error_code = match status.state {
            JobState::Cancelled => Some(Error::Cancelled.code()),
            JobState::Failed => Some(err.code()),
            _ => None,
        };
    }
}

impl EventSink for JobCell {
    fn emit(&self, event: GenerationEvent) {
        let mut status = self.status.lock();
        if status.is_finished() {
            return;
        }
        match event {
            GenerationEvent::Start => status.state = JobState::Running,
            GenerationEvent::Content { chunk, total_chars } => {
                status.state = JobState::Running;
                status.chars_streamed = total_chars;
                status.last_chunk = Some(chunk);
            }
            GenerationEvent::Progress {
                current,
                total,
                message,
            } => {
                status.state = JobState::Running;
                status.current = current;
                status.total = total;
                status.message = Some(message);
            }
            GenerationEvent::Complete { artifacts } => {
                status.state = JobState::Completed;
                status.artifacts = artifacts;
                status.finished_at = Some(Utc::now());
            }
            GenerationEvent::Error { message } => {
                drop(status);
                self.fail(message);
            }
        }
    }
}

/// Jobs by id. At most one running job per owner.
#[derive(Default)]
pub struct JobStore {
    jobs: DashMap<String, Arc<JobCell>>,
    begin_lock: Mutex<()>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new job for `owner`. `Busy` while another of the owner's
    /// jobs is still unfinished.
    pub fn begin(&self, owner: &str, kind: JobKind) -> Result<Arc<JobCell>> {
        let _guard = self.begin_lock.lock();
        let busy = self.jobs.iter().any(|entry| {
            let status = entry.value().status.lock();
            status.owner == owner && !status.is_finished()
        });
        if busy {
            return Err(Error::Busy(owner.to_string()));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let cell = Arc::new(JobCell::new(JobStatus::new(id.clone(), owner.to_string(), kind)));
        self.jobs.insert(id.clone(), cell.clone());
        info!("Job {} ({:?}) started for {}", id, kind, owner);
        Ok(cell)
    }

    pub fn get(&self, id: &str) -> Option<JobStatus> {
        self.jobs.get(id).map(|cell| cell.snapshot())
    }

    pub fn cell(&self, id: &str) -> Option<Arc<JobCell>> {
        self.jobs.get(id).map(|cell| cell.value().clone())
    }

    /// The owner's jobs, newest first.
    pub fn list_for(&self, owner: &str) -> Vec<JobStatus> {
        let mut jobs: Vec<JobStatus> = self
            .jobs
            .iter()
            .map(|entry| entry.value().snapshot())
            .filter(|status| status.owner == owner)
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs
    }

    /// Request cancellation. The run notices between steps and finishes as
    /// `cancelled`.
    pub fn cancel(&self, id: &str) -> Result<JobStatus> {
        let cell = self
            .cell(id)
            .ok_or_else(|| Error::NotFound(format!("job {}", id)))?;
        cell.cancel.cancel();
        info!("Cancellation requested for job {}", id);
        Ok(cell.snapshot())
    }

    /// Drop the oldest finished jobs beyond [`MAX_FINISHED_JOBS`]. Returns
    /// how many were removed.
    pub fn prune(&self) -> usize {
        let mut finished: Vec<(String, chrono::DateTime<Utc>)> = self
            .jobs
            .iter()
            .filter_map(|entry| {
                let status = entry.value().snapshot();
                status.finished_at.map(|t| (status.id, t))
            })
            .collect();
        if finished.len() <= MAX_FINISHED_JOBS {
            return 0;
        }

        finished.sort_by_key(|(_, t)| *t);
        let remove_count = finished.len() - MAX_FINISHED_JOBS;
        for (id, _) in finished.into_iter().take(remove_count) {
            self.jobs.remove(&id);
        }
        debug!("Pruned {} finished jobs", remove_count);
        remove_count
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
