//! Client façade tying submission, polling and aggregation together.
//!
//! [`GachaClient::start`] validates a request on the caller's stack and then
//! drives the rest of the task lifecycle on its own tokio task. Every
//! started request settles into exactly one terminal [`TaskPhase`], reported
//! through [`TaskHandle::progress`] and resolved once via
//! [`TaskHandle::wait`], unless it is cancelled first.

use std::sync::Arc;

use futures::StreamExt;
use strum::Display;
use tokio::sync::{oneshot, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::models::api::HealthResponse;
use crate::models::generation::GenerationRequest;
use crate::models::task::TaskStatus;
use crate::services::aggregator::{GenerationError, ResultAggregator, TaskOutcome};
use crate::services::gallery::Gallery;
use crate::services::poller::{PollConfig, StatusPoller};
use crate::services::submitter::JobSubmitter;
use crate::services::transport::{GenerationApi, HttpTransport, TransportConfig, TransportError};

/// Lifecycle of one started request.
#[derive(Debug, Clone, Copy, Display, PartialEq, Eq)]
#[strum(serialize_all = "snake_case")]
pub enum TaskPhase {
    Submitting,
    Polling,
    Completed,
    Failed,
    PollErrored,
    TimedOut,
    /// The backend or transport refused the submission.
    Rejected,
}

impl TaskPhase {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TaskPhase::Submitting | TaskPhase::Polling)
    }

    fn of(outcome: &TaskOutcome) -> Self {
        match outcome {
            Ok(_) => TaskPhase::Completed,
            Err(GenerationError::Failed(_)) => TaskPhase::Failed,
            Err(GenerationError::Polling(_)) => TaskPhase::PollErrored,
            Err(GenerationError::Timeout(_)) => TaskPhase::TimedOut,
            Err(GenerationError::Submission(_)) => TaskPhase::Rejected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskProgress {
    pub phase: TaskPhase,
    /// Server-issued id, known once submission succeeds.
    pub task_id: Option<String>,
    /// Last status reported by the backend.
    pub status: Option<TaskStatus>,
    /// Status snapshots received so far.
    pub polls: u32,
}

impl TaskProgress {
    fn submitting() -> Self {
        Self {
            phase: TaskPhase::Submitting,
            task_id: None,
            status: None,
            polls: 0,
        }
    }
}

/// Caller's view of a started request.
pub struct TaskHandle {
    request_id: Uuid,
    progress: watch::Receiver<TaskProgress>,
    outcome: oneshot::Receiver<TaskOutcome>,
    cancel: CancellationToken,
}

impl TaskHandle {
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn progress(&self) -> watch::Receiver<TaskProgress> {
        self.progress.clone()
    }

    /// Stop polling at the next scheduling point. Work already running on
    /// the backend is not cancelled.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token that cancels this request, usable after [`TaskHandle::wait`] takes the handle.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Resolves with the outcome, or `None` if the request was cancelled.
    pub async fn wait(self) -> Option<TaskOutcome> {
        self.outcome.await.ok()
    }
}

#[derive(Clone)]
pub struct GachaClient {
    api: Arc<dyn GenerationApi>,
    submitter: JobSubmitter,
    poller: StatusPoller,
    gallery: Gallery,
}

impl GachaClient {
    /// Client over HTTP.
    pub fn new(transport: &TransportConfig, polling: PollConfig) -> Result<Self, TransportError> {
        let api: Arc<dyn GenerationApi> = Arc::new(HttpTransport::new(transport)?);
        Ok(Self::with_api(api, polling))
    }

    /// Client over any [`GenerationApi`] implementation.
    pub fn with_api(api: Arc<dyn GenerationApi>, polling: PollConfig) -> Self {
        Self {
            submitter: JobSubmitter::new(api.clone()),
            poller: StatusPoller::new(api.clone(), polling),
            gallery: Gallery::new(),
            api,
        }
    }

    pub async fn health(&self) -> Result<HealthResponse, TransportError> {
        self.api.health().await
    }

    pub async fn models(&self) -> Result<Vec<String>, TransportError> {
        self.api.models().await
    }

    pub fn gallery(&self) -> &Gallery {
        &self.gallery
    }

    /// Validate `request`, then submit and track it in the background.
    ///
    /// Validation failures are returned here before any network activity;
    /// every later failure arrives through the returned handle. Must be
    /// called from within a tokio runtime.
    pub fn start(&self, request: GenerationRequest) -> Result<TaskHandle, garde::Report> {
        JobSubmitter::validate(&request)?;

        let request_id = Uuid::new_v4();
        let (progress_tx, progress_rx) = watch::channel(TaskProgress::submitting());
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let cancel = CancellationToken::new();

        self.gallery.begin(request_id);
        metrics::counter!("gacha_tasks_started_total").increment(1);

        let job = TrackedJob {
            request_id,
            request,
            submitter: self.submitter.clone(),
            poller: self.poller.clone(),
            gallery: self.gallery.clone(),
            progress: progress_tx,
            cancel: cancel.clone(),
        };
        tokio::spawn(async move {
            if let Some(outcome) = job.run().await {
                // The caller may have dropped the handle; nothing to do then.
                let _ = outcome_tx.send(outcome);
            }
        });

        Ok(TaskHandle {
            request_id,
            progress: progress_rx,
            outcome: outcome_rx,
            cancel,
        })
    }
}

/// Everything one background task needs; owns no state shared with others
/// apart from the gallery.
struct TrackedJob {
    request_id: Uuid,
    request: GenerationRequest,
    submitter: JobSubmitter,
    poller: StatusPoller,
    gallery: Gallery,
    progress: watch::Sender<TaskProgress>,
    cancel: CancellationToken,
}

impl TrackedJob {
    async fn run(self) -> Option<TaskOutcome> {
        let started = Instant::now();
        let submitted = self.submitter.send(&self.request).await;
        if self.cancel.is_cancelled() {
            return self.abandon();
        }

        let task = match submitted {
            Ok(task) => task,
            Err(e) => return Some(self.settle(Err(GenerationError::Submission(e)), started)),
        };

        self.progress.send_modify(|p| {
            p.phase = TaskPhase::Polling;
            p.task_id = Some(task.id.clone());
            p.status = Some(task.status);
        });

        let progress = &self.progress;
        let snapshots = self
            .poller
            .watch(task.clone(), self.cancel.clone())
            .inspect(move |event| {
                if let Ok(snapshot) = event {
                    progress.send_modify(|p| {
                        p.status = Some(snapshot.status);
                        p.polls += 1;
                    });
                }
            });

        match ResultAggregator::collect(&task, snapshots).await {
            Some(outcome) => Some(self.settle(outcome, started)),
            None => self.abandon(),
        }
    }

    fn settle(&self, outcome: TaskOutcome, started: Instant) -> TaskOutcome {
        let phase = TaskPhase::of(&outcome);
        match &outcome {
            Ok(images) => tracing::info!(
                request_id = %self.request_id,
                images = images.len(),
                "Generation request completed"
            ),
            Err(e) => tracing::warn!(
                request_id = %self.request_id,
                phase = %phase,
                error = %e,
                "Generation request did not complete"
            ),
        }
        metrics::counter!("gacha_tasks_finished_total", "phase" => phase.to_string()).increment(1);
        metrics::histogram!("gacha_task_duration_seconds").record(started.elapsed().as_secs_f64());

        self.gallery.finish(self.request_id, &outcome);
        self.progress.send_modify(|p| p.phase = phase);
        outcome
    }

    fn abandon(&self) -> Option<TaskOutcome> {
        tracing::info!(request_id = %self.request_id, "Generation request cancelled");
        self.gallery.forget(self.request_id);
        None
    }
}
