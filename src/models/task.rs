use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;
use tokio::time::Instant;

use crate::models::api::{GenerationResponse, GenerationStatus};
use crate::models::generation::ImageResult;

/// Status of a generation task on the backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Display, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// Position in the `pending -> processing -> {completed|failed}` order.
    fn rank(self) -> u8 {
        match self {
            TaskStatus::Pending => 0,
            TaskStatus::Processing => 1,
            TaskStatus::Completed | TaskStatus::Failed => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("snapshot belongs to task {got}, not {expected}")]
    WrongTask { expected: String, got: String },

    #[error("task already {0}")]
    AlreadyTerminal(TaskStatus),

    #[error("cannot move backwards from {from} to {to}")]
    Backwards { from: TaskStatus, to: TaskStatus },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Unchanged,
    Advanced,
}

/// A submitted generation job, tracked by its server-issued id.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: String,
    pub status: TaskStatus,
    pub results: Option<Vec<ImageResult>>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Local monotonic submission time; the polling deadline counts from here.
    pub submitted_at: Instant,
}

impl Task {
    /// A freshly submitted task always starts out `pending`.
    pub fn submitted(response: &GenerationResponse) -> Self {
        Self {
            id: response.task_id.clone(),
            status: TaskStatus::Pending,
            results: None,
            error: None,
            created_at: response.created_at,
            submitted_at: Instant::now(),
        }
    }

    /// Apply a poll snapshot, enforcing forward-only transitions.
    pub fn apply(&mut self, snapshot: &GenerationStatus) -> Result<Transition, TransitionError> {
        if snapshot.task_id != self.id {
            return Err(TransitionError::WrongTask {
                expected: self.id.clone(),
                got: snapshot.task_id.clone(),
            });
        }
        if self.status.is_terminal() {
            return Err(TransitionError::AlreadyTerminal(self.status));
        }
        if snapshot.status == self.status {
            return Ok(Transition::Unchanged);
        }
        if snapshot.status.rank() < self.status.rank() {
            return Err(TransitionError::Backwards {
                from: self.status,
                to: snapshot.status,
            });
        }

        self.status = snapshot.status;
        self.results = snapshot.results.clone();
        self.error = snapshot.error.clone();
        Ok(Transition::Advanced)
    }
}
