use std::sync::Arc;

use crate::config::Config;
use crate::pipeline::Orchestrator;

/// Shared, read-only state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    pub fn new(config: Config, orchestrator: Orchestrator) -> Self {
        AppState {
            config: Arc::new(config),
            orchestrator: Arc::new(orchestrator),
        }
    }
}
