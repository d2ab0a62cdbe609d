use std::sync::Arc;

use crate::domain::SearchOrchestrator;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<SearchOrchestrator>,
}

impl AppState {
    pub fn new(orchestrator: SearchOrchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
        }
    }
}
