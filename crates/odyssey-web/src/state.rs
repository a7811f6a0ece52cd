//! Shared application state.

use std::sync::Arc;

use odyssey_core::clock::Clock;
use odyssey_core::repository::SessionRepository;
use odyssey_outline::application::orchestrator::Orchestrator;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Time source for stage and session timestamps.
    pub clock: Arc<dyn Clock>,
    /// Drives the provider through the generation stages.
    pub orchestrator: Arc<Orchestrator>,
    /// Session-scoped campaign state.
    pub session_repository: Arc<dyn SessionRepository>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        orchestrator: Orchestrator,
        session_repository: Arc<dyn SessionRepository>,
    ) -> Self {
        Self {
            clock,
            orchestrator: Arc::new(orchestrator),
            session_repository,
        }
    }
}
