//! Test repositories: mock `SessionRepository` implementations for tests.

use async_trait::async_trait;
use odyssey_core::error::DomainError;
use odyssey_core::repository::{SessionRepository, StoredSession};
use uuid::Uuid;

/// A session repository that never holds anything and silently accepts
/// writes. Useful for "session not found" scenarios.
#[derive(Debug)]
pub struct EmptySessionRepository;

#[async_trait]
impl SessionRepository for EmptySessionRepository {
    async fn load_session(&self, _session_id: Uuid) -> Result<Option<StoredSession>, DomainError> {
        Ok(None)
    }

    async fn save_session(&self, _session: StoredSession) -> Result<(), DomainError> {
        Ok(())
    }

    async fn delete_session(&self, _session_id: Uuid) -> Result<bool, DomainError> {
        Ok(false)
    }
}

/// A session repository that always returns an infrastructure error. Useful
/// for testing error-handling paths.
#[derive(Debug)]
pub struct FailingSessionRepository;

#[async_trait]
impl SessionRepository for FailingSessionRepository {
    async fn load_session(&self, _session_id: Uuid) -> Result<Option<StoredSession>, DomainError> {
        Err(DomainError::Infrastructure("session store unavailable".into()))
    }

    async fn save_session(&self, _session: StoredSession) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("session store unavailable".into()))
    }

    async fn delete_session(&self, _session_id: Uuid) -> Result<bool, DomainError> {
        Err(DomainError::Infrastructure("session store unavailable".into()))
    }
}
