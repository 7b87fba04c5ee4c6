use std::sync::Arc;

use crate::service::PipelineService;

/// Gateway application state (shared)
#[derive(Debug, Clone)]
pub struct AppState {
    /// Both pipeline modes, built once at startup
    pub service: Arc<PipelineService>,
}

impl AppState {
    pub fn new(service: Arc<PipelineService>) -> Self {
        Self { service }
    }
}
