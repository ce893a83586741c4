//! In-memory, time-driven stand-in for the generation backend.
//!
//! Tasks advance purely by elapsed time: `pending` until
//! [`StubConfig::processing_after`], `processing` until
//! [`StubConfig::complete_after`], then `completed`. No images are rendered;
//! result URLs point at a seeded placeholder service.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use garde::Validate;
use strum::IntoEnumIterator;
use tokio::sync::RwLock;
use tokio::time::Instant;
use uuid::Uuid;

use crate::models::api::{GenerationResponse, GenerationStatus};
use crate::models::generation::{AiModel, GenerationRequest, ImageResult};
use crate::models::task::TaskStatus;

/// Parameter defaults the backend applies before validating a request.
const DEFAULT_STEPS: u32 = 50;
const DEFAULT_CFG_SCALE: f32 = 7.5;
const DEFAULT_DIMENSION: u32 = 768;

#[derive(Debug, Clone)]
pub struct StubConfig {
    pub processing_after: Duration,
    pub complete_after: Duration,
    pub image_base_url: String,
}

impl Default for StubConfig {
    fn default() -> Self {
        Self {
            processing_after: Duration::from_millis(1500),
            complete_after: Duration::from_millis(4000),
            image_base_url: "https://picsum.photos/seed".to_string(),
        }
    }
}

struct StubTask {
    request: GenerationRequest,
    created_at: DateTime<Utc>,
    started: Instant,
    results: Option<Vec<ImageResult>>,
}

pub struct StubBackend {
    config: StubConfig,
    tasks: RwLock<HashMap<String, StubTask>>,
}

impl StubBackend {
    pub fn new(config: StubConfig) -> Self {
        Self {
            config,
            tasks: RwLock::new(HashMap::new()),
        }
    }

    /// Fill unset parameters with the backend defaults.
    pub fn apply_defaults(mut request: GenerationRequest) -> GenerationRequest {
        request.steps.get_or_insert(DEFAULT_STEPS);
        request.cfg_scale.get_or_insert(DEFAULT_CFG_SCALE);
        request.height.get_or_insert(DEFAULT_DIMENSION);
        request.width.get_or_insert(DEFAULT_DIMENSION);
        request
    }

    pub fn models(&self) -> Vec<String> {
        AiModel::iter().map(|model| model.to_string()).collect()
    }

    /// Accept a request and register a new pending task.
    pub async fn create(&self, request: GenerationRequest) -> Result<GenerationResponse, StubError> {
        let request = Self::apply_defaults(request);
        request.validate()?;

        let task_id = Uuid::new_v4().to_string();
        let created_at = Utc::now();
        tracing::info!(
            task_id = %task_id,
            model = %request.model,
            count = request.count,
            "Stub task created"
        );

        self.tasks.write().await.insert(
            task_id.clone(),
            StubTask {
                request,
                created_at,
                started: Instant::now(),
                results: None,
            },
        );
        metrics::counter!("stub_generation_requests_total").increment(1);

        Ok(GenerationResponse {
            task_id,
            status: TaskStatus::Pending.to_string(),
            created_at,
        })
    }

    /// Current status of `task_id`, materializing results on completion.
    pub async fn status(&self, task_id: &str) -> Result<GenerationStatus, StubError> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .get_mut(task_id)
            .ok_or_else(|| StubError::UnknownTask(task_id.to_string()))?;

        let elapsed = task.started.elapsed();
        if elapsed < self.config.processing_after {
            return Ok(GenerationStatus::new(task_id, TaskStatus::Pending));
        }
        if elapsed < self.config.complete_after {
            return Ok(GenerationStatus::new(task_id, TaskStatus::Processing));
        }

        let results = task
            .results
            .get_or_insert_with(|| {
                metrics::counter!("stub_generation_completed_total").increment(1);
                render_results(&self.config.image_base_url, task_id, &task.request, task.created_at)
            })
            .clone();
        Ok(GenerationStatus::completed(task_id, results))
    }
}

/// Per-image seeds: image `i` uses `base + i`.
pub fn derive_seeds(base: i64, count: u32) -> Vec<i64> {
    (0..i64::from(count)).map(|i| base.wrapping_add(i)).collect()
}

fn render_results(
    image_base_url: &str,
    task_id: &str,
    request: &GenerationRequest,
    created_at: DateTime<Utc>,
) -> Vec<ImageResult> {
    let base = request
        .seed
        .unwrap_or_else(|| rand::random::<u32>() as i64);
    let width = request.width.unwrap_or(DEFAULT_DIMENSION);
    let height = request.height.unwrap_or(DEFAULT_DIMENSION);

    derive_seeds(base, request.count)
        .into_iter()
        .map(|seed| ImageResult {
            id: Uuid::new_v4().to_string(),
            task_id: task_id.to_string(),
            url: format!("{image_base_url}/{seed}/{width}/{height}"),
            seed,
            created_at,
        })
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum StubError {
    #[error("invalid generation request: {0}")]
    Invalid(#[from] garde::Report),

    #[error("task {0} not found")]
    UnknownTask(String),
}
