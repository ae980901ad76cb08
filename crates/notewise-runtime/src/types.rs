//! Job status types.

use chrono::{DateTime, Utc};
use notewise_core::Artifacts;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Notes,
    Quiz,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn is_finished(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed | JobState::Cancelled)
    }
}

/// Snapshot of one job, as returned to pollers.
#[derive(Debug, Clone, Serialize)]
pub struct JobStatus {
    pub id: String,
    pub owner: String,
    pub kind: JobKind,
    pub state: JobState,
    #[serde(rename = "charsStreamed")]
    pub chars_streamed: usize,
    #[serde(rename = "lastChunk", skip_serializing_if = "Option::is_none")]
    pub last_chunk: Option<String>,
    pub current: usize,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub artifacts: Artifacts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// [`Error::code`](notewise_core::Error::code) of the failure.
    #[serde(rename = "errorCode", skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "finishedAt", skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl JobStatus {
    pub fn new(id: String, owner: String, kind: JobKind) -> Self {
        Self {
            id,
            owner,
            kind,
            state: JobState::Queued,
            chars_streamed: 0,
            last_chunk: None,
            current: 0,
            total: 0,
            message: None,
            artifacts: Artifacts::default(),
            error: None,
            error_code: None,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }
}
