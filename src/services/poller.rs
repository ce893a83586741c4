//! Interval-driven status polling for a single generation task.
//!
//! [`StatusPoller::watch`] turns a submitted [`Task`] into a lazy stream of
//! status snapshots. The stream ends right after a terminal snapshot, or
//! with a [`PollError`] once the backend keeps failing or the deadline
//! passes. Triggering the [`CancellationToken`] ends it silently. At most
//! one status request per task is in flight at any time.

use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use crate::models::api::GenerationStatus;
use crate::models::task::Task;
use crate::services::transport::{GenerationApi, TransportError};

/// Tunable polling parameters.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Wait between the end of one poll and the start of the next.
    pub interval: Duration,
    /// Consecutive transient failures after which polling gives up.
    pub max_consecutive_failures: u32,
    /// Overall budget, measured from [`Task::submitted_at`].
    pub deadline: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_consecutive_failures: 5,
            deadline: Duration::from_secs(5 * 60),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("status polling gave up after {attempts} consecutive failures: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: TransportError,
    },

    #[error("status request rejected: {0}")]
    Rejected(#[source] TransportError),

    #[error("task did not finish within {}s", .0.as_secs())]
    Timeout(Duration),
}

#[derive(Clone)]
pub struct StatusPoller {
    api: Arc<dyn GenerationApi>,
    config: PollConfig,
}

impl StatusPoller {
    pub fn new(api: Arc<dyn GenerationApi>, config: PollConfig) -> Self {
        Self { api, config }
    }

    /// Poll `task` until it settles, fails, times out, or `cancel` fires.
    pub fn watch(
        &self,
        task: Task,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Result<GenerationStatus, PollError>> + Send + 'static {
        let state = PollState {
            api: self.api.clone(),
            deadline: task.submitted_at + self.config.deadline,
            config: self.config.clone(),
            task,
            cancel,
            failures: 0,
            polled_once: false,
            finished: false,
        };

        futures::stream::unfold(state, |mut state| async move {
            let event = state.next_event().await?;
            Some((event, state))
        })
    }
}

struct PollState {
    api: Arc<dyn GenerationApi>,
    config: PollConfig,
    task: Task,
    deadline: Instant,
    cancel: CancellationToken,
    failures: u32,
    polled_once: bool,
    finished: bool,
}

impl PollState {
    /// Next item for the stream; `None` ends it.
    async fn next_event(&mut self) -> Option<Result<GenerationStatus, PollError>> {
        loop {
            if self.finished || self.cancel.is_cancelled() {
                return None;
            }

            if self.polled_once {
                let wake = (Instant::now() + self.config.interval).min(self.deadline);
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => {
                        tracing::debug!(task_id = %self.task.id, "Polling cancelled");
                        return None;
                    }
                    _ = sleep_until(wake) => {}
                }
            }
            self.polled_once = true;

            if Instant::now() >= self.deadline {
                return Some(Err(self.timed_out()));
            }

            metrics::counter!("gacha_status_polls_total").increment(1);
            let task_id = self.task.id.clone();
            let api = self.api.clone();
            let response = tokio::select! {
                result = api.status(&task_id) => Some(result),
                _ = sleep_until(self.deadline) => None,
            };

            // A response that lands after cancellation is dropped unseen.
            if self.cancel.is_cancelled() {
                tracing::debug!(task_id = %self.task.id, "Polling cancelled");
                return None;
            }

            let Some(response) = response else {
                return Some(Err(self.timed_out()));
            };

            match response {
                Ok(snapshot) => {
                    self.failures = 0;
                    match self.task.apply(&snapshot) {
                        Ok(_) => {
                            tracing::debug!(
                                task_id = %self.task.id,
                                status = %snapshot.status,
                                "Task status polled"
                            );
                            if snapshot.status.is_terminal() {
                                self.finished = true;
                            }
                            return Some(Ok(snapshot));
                        }
                        Err(e) => {
                            tracing::warn!(task_id = %self.task.id, error = %e, "Ignoring stale status snapshot");
                        }
                    }
                }
                Err(e) if e.is_transient() => {
                    self.failures += 1;
                    metrics::counter!("gacha_status_poll_failures_total").increment(1);
                    tracing::warn!(
                        task_id = %self.task.id,
                        attempt = self.failures,
                        max_attempts = self.config.max_consecutive_failures,
                        error = %e,
                        "Status poll failed"
                    );
                    if self.failures >= self.config.max_consecutive_failures {
                        self.finished = true;
                        return Some(Err(PollError::Exhausted {
                            attempts: self.failures,
                            source: e,
                        }));
                    }
                }
                Err(e) => {
                    tracing::error!(task_id = %self.task.id, error = %e, "Status poll rejected");
                    self.finished = true;
                    return Some(Err(PollError::Rejected(e)));
                }
            }
        }
    }

    fn timed_out(&mut self) -> PollError {
        tracing::warn!(
            task_id = %self.task.id,
            deadline_secs = self.config.deadline.as_secs(),
            "Task polling deadline exceeded"
        );
        self.finished = true;
        PollError::Timeout(self.config.deadline)
    }
}
