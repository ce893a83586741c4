//! Scripted [`GenerationApi`] used by the unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use crate::models::api::{GenerationResponse, GenerationStatus, HealthResponse};
use crate::models::generation::{GenerationRequest, ImageResult};
use crate::models::task::{Task, TaskStatus};
use crate::services::transport::{GenerationApi, TransportError};

pub(crate) const TASK_ID: &str = "task-1";

pub(crate) fn image(id: &str) -> ImageResult {
    ImageResult {
        id: id.to_string(),
        task_id: TASK_ID.to_string(),
        url: format!("https://cdn.test/{id}.png"),
        seed: 7,
        created_at: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
    }
}

pub(crate) fn pending_task() -> Task {
    Task::submitted(&GenerationResponse {
        task_id: TASK_ID.to_string(),
        status: "pending".to_string(),
        created_at: Utc::now(),
    })
}

pub(crate) fn server_error() -> TransportError {
    TransportError::Api {
        status: 503,
        body: "upstream unavailable".to_string(),
    }
}

/// Replays queued status responses in order, then repeats `fallback`.
pub(crate) struct ScriptedApi {
    submit_script: Mutex<VecDeque<Result<GenerationResponse, TransportError>>>,
    status_script: Mutex<VecDeque<Result<GenerationStatus, TransportError>>>,
    fallback: GenerationStatus,
    status_delay: Option<Duration>,
    submit_calls: AtomicUsize,
    status_calls: AtomicUsize,
}

impl ScriptedApi {
    pub(crate) fn new() -> Self {
        Self {
            submit_script: Mutex::new(VecDeque::new()),
            status_script: Mutex::new(VecDeque::new()),
            fallback: GenerationStatus::new(TASK_ID, TaskStatus::Pending),
            status_delay: None,
            submit_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn then(self, status: GenerationStatus) -> Self {
        self.status_script.lock().unwrap().push_back(Ok(status));
        self
    }

    pub(crate) fn then_status(self, status: TaskStatus) -> Self {
        self.then(GenerationStatus::new(TASK_ID, status))
    }

    pub(crate) fn then_error(self, error: TransportError) -> Self {
        self.status_script.lock().unwrap().push_back(Err(error));
        self
    }

    pub(crate) fn submit_fails(self, error: TransportError) -> Self {
        self.submit_script.lock().unwrap().push_back(Err(error));
        self
    }

    /// Every status call takes this long before answering.
    pub(crate) fn with_status_delay(mut self, delay: Duration) -> Self {
        self.status_delay = Some(delay);
        self
    }

    pub(crate) fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationApi for ScriptedApi {
    async fn submit(
        &self,
        _request: &GenerationRequest,
    ) -> Result<GenerationResponse, TransportError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.submit_script.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(GenerationResponse {
                task_id: TASK_ID.to_string(),
                status: "pending".to_string(),
                created_at: Utc::now(),
            })
        })
    }

    async fn status(&self, _task_id: &str) -> Result<GenerationStatus, TransportError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.status_delay {
            tokio::time::sleep(delay).await;
        }
        let scripted = self.status_script.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| Ok(self.fallback.clone()))
    }

    async fn models(&self) -> Result<Vec<String>, TransportError> {
        Ok(vec!["stable-diffusion-v2.1".to_string()])
    }

    async fn health(&self) -> Result<HealthResponse, TransportError> {
        Ok(HealthResponse {
            status: "ok".to_string(),
        })
    }
}
