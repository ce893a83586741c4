use std::time::Duration;

use futures::{Stream, StreamExt};

use crate::models::api::GenerationStatus;
use crate::models::generation::ImageResult;
use crate::models::task::{Task, TaskStatus};
use crate::services::poller::PollError;
use crate::services::transport::TransportError;

/// Final result of one generation task.
pub type TaskOutcome = Result<Vec<ImageResult>, GenerationError>;

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("could not submit generation request: {0}")]
    Submission(#[source] TransportError),

    /// Backend reported `failed`; the message is passed through verbatim.
    #[error("{0}")]
    Failed(String),

    #[error("lost contact with the generation service: {0}")]
    Polling(#[source] PollError),

    #[error("generation timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

impl From<PollError> for GenerationError {
    fn from(e: PollError) -> Self {
        match e {
            PollError::Timeout(deadline) => GenerationError::Timeout(deadline),
            other => GenerationError::Polling(other),
        }
    }
}

/// Turns a task's poll sequence into exactly one outcome.
pub struct ResultAggregator;

impl ResultAggregator {
    /// Drain `snapshots` for `task`.
    ///
    /// Returns `None` only when the sequence ended without a terminal
    /// snapshot or error, i.e. polling was cancelled.
    pub async fn collect<S>(task: &Task, snapshots: S) -> Option<TaskOutcome>
    where
        S: Stream<Item = Result<GenerationStatus, PollError>>,
    {
        futures::pin_mut!(snapshots);

        while let Some(event) = snapshots.next().await {
            let snapshot = match event {
                Ok(snapshot) => snapshot,
                Err(e) => return Some(Err(e.into())),
            };

            match snapshot.status {
                TaskStatus::Completed => {
                    let results = snapshot.results.unwrap_or_default();
                    return Some(Ok(Self::accept_results(task, results)));
                }
                TaskStatus::Failed => {
                    let message = snapshot
                        .error
                        .unwrap_or_else(|| "generation failed".to_string());
                    return Some(Err(GenerationError::Failed(message)));
                }
                TaskStatus::Pending | TaskStatus::Processing => {}
            }
        }

        None
    }

    /// Keep only results with a usable URL that belong to `task`.
    fn accept_results(task: &Task, results: Vec<ImageResult>) -> Vec<ImageResult> {
        let total = results.len();
        let accepted: Vec<ImageResult> = results
            .into_iter()
            .filter(|image| {
                if image.url.trim().is_empty() {
                    tracing::warn!(task_id = %task.id, image_id = %image.id, "Dropping image without URL");
                    return false;
                }
                if image.task_id != task.id {
                    tracing::warn!(
                        task_id = %task.id,
                        image_id = %image.id,
                        owner = %image.task_id,
                        "Dropping image owned by another task"
                    );
                    return false;
                }
                true
            })
            .collect();

        tracing::info!(
            task_id = %task.id,
            images = accepted.len(),
            dropped = total - accepted.len(),
            "Generation results collected"
        );
        accepted
    }
}
