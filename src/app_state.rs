use std::sync::Arc;

use crate::services::stub::{StubBackend, StubConfig};

/// Shared stub-server state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<StubBackend>,
}

impl AppState {
    pub fn new(config: StubConfig) -> Self {
        Self {
            backend: Arc::new(StubBackend::new(config)),
        }
    }
}
