use std::sync::Arc;

use tokio::sync::watch;
use uuid::Uuid;

use crate::models::generation::ImageResult;
use crate::services::aggregator::TaskOutcome;

/// One consistent snapshot of the gallery, as a UI would render it.
#[derive(Debug, Clone, Default)]
pub struct GalleryView {
    /// Requests submitted but not yet settled.
    pub in_flight: Vec<Uuid>,
    /// Images from every completed task, oldest first.
    pub images: Vec<ImageResult>,
    /// Message of the most recent failed, errored or timed-out request.
    pub last_error: Option<String>,
}

impl GalleryView {
    pub fn is_loading(&self) -> bool {
        !self.in_flight.is_empty()
    }

    pub fn images_for<'a>(&'a self, task_id: &'a str) -> impl Iterator<Item = &'a ImageResult> + 'a {
        self.images.iter().filter(move |image| image.task_id == task_id)
    }
}

/// Shared display list fed by every tracked task.
///
/// Each update swaps in a whole new [`GalleryView`] through a watch
/// channel, so readers never observe a partially applied merge.
#[derive(Clone)]
pub struct Gallery {
    view: Arc<watch::Sender<GalleryView>>,
}

impl Default for Gallery {
    fn default() -> Self {
        Self::new()
    }
}

impl Gallery {
    pub fn new() -> Self {
        let (view, _) = watch::channel(GalleryView::default());
        Self {
            view: Arc::new(view),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<GalleryView> {
        self.view.subscribe()
    }

    pub fn snapshot(&self) -> GalleryView {
        self.view.borrow().clone()
    }

    pub(crate) fn begin(&self, request_id: Uuid) {
        self.view.send_modify(|view| view.in_flight.push(request_id));
    }

    /// Merge a settled request: images on success, `last_error` otherwise.
    pub(crate) fn finish(&self, request_id: Uuid, outcome: &TaskOutcome) {
        self.view.send_modify(|view| {
            view.in_flight.retain(|id| *id != request_id);
            match outcome {
                Ok(images) => view.images.extend(images.iter().cloned()),
                Err(e) => view.last_error = Some(e.to_string()),
            }
        });
    }

    /// Drop a cancelled request without touching images or errors.
    pub(crate) fn forget(&self, request_id: Uuid) {
        self.view.send_if_modified(|view| {
            let before = view.in_flight.len();
            view.in_flight.retain(|id| *id != request_id);
            view.in_flight.len() != before
        });
    }

    pub fn clear(&self) {
        self.view.send_modify(|view| {
            view.images.clear();
            view.last_error = None;
        });
    }
}
