use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::generation::ImageResult;
use crate::models::task::TaskStatus;

/// Response after submitting a generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub task_id: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Response for querying task status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationStatus {
    pub task_id: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<ImageResult>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerationStatus {
    pub fn new(task_id: impl Into<String>, status: TaskStatus) -> Self {
        Self {
            task_id: task_id.into(),
            status,
            results: None,
            error: None,
        }
    }

    pub fn completed(task_id: impl Into<String>, results: Vec<ImageResult>) -> Self {
        Self {
            results: Some(results),
            ..Self::new(task_id, TaskStatus::Completed)
        }
    }

    pub fn failed(task_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::new(task_id, TaskStatus::Failed)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsResponse {
    pub models: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Error body returned by the backend on rejected requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
