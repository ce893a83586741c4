use std::sync::Arc;

use garde::Validate;

use crate::models::generation::GenerationRequest;
use crate::models::task::Task;
use crate::services::transport::{GenerationApi, TransportError};

/// Validates generation requests and hands them to the backend.
///
/// Submission is not idempotent, so a failed send is never retried here.
#[derive(Clone)]
pub struct JobSubmitter {
    api: Arc<dyn GenerationApi>,
}

impl JobSubmitter {
    pub fn new(api: Arc<dyn GenerationApi>) -> Self {
        Self { api }
    }

    /// Check a request without touching the network.
    pub fn validate(request: &GenerationRequest) -> Result<(), garde::Report> {
        request.validate()
    }

    /// Validate, then submit. Returns the new task in `pending` state.
    pub async fn submit(&self, request: &GenerationRequest) -> Result<Task, SubmitError> {
        Self::validate(request)?;
        Ok(self.send(request).await?)
    }

    /// Submit a request that has already passed [`JobSubmitter::validate`].
    pub(crate) async fn send(&self, request: &GenerationRequest) -> Result<Task, TransportError> {
        let response = self.api.submit(request).await.inspect_err(|e| {
            tracing::warn!(model = %request.model, error = %e, "Generation submission failed");
        })?;
        metrics::counter!("gacha_tasks_submitted_total").increment(1);

        let task = Task::submitted(&response);
        tracing::info!(
            task_id = %task.id,
            model = %request.model,
            count = request.count,
            reported_status = %response.status,
            "Generation task submitted"
        );
        Ok(task)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("invalid generation request: {0}")]
    Validation(#[from] garde::Report),

    #[error("generation submission failed: {0}")]
    Submission(#[from] TransportError),
}
