use std::sync::Arc;

use crate::config::Config;
use crate::orchestrator::SignupOrchestrator;

/// Shared application state injected into every handler.
///
/// Built once in `main` (or by tests with fakes) and cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<SignupOrchestrator>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(orchestrator: Arc<SignupOrchestrator>, config: Arc<Config>) -> Self {
        Self {
            orchestrator,
            config,
        }
    }
}
