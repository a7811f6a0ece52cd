//! Session repository abstraction.
//!
//! Sessions are stored as opaque JSON snapshots so that storage adapters
//! stay independent of the outline context's types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DomainError;

/// Stored representation of a campaign session.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSession {
    /// Session identifier.
    pub session_id: Uuid,
    /// Serialized session state.
    pub payload: serde_json::Value,
    /// When the snapshot was taken.
    pub updated_at: DateTime<Utc>,
}

/// Repository trait for session-scoped state.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Loads the latest snapshot for a session, if one exists.
    async fn load_session(&self, session_id: Uuid) -> Result<Option<StoredSession>, DomainError>;

    /// Replaces the snapshot for `session.session_id`.
    async fn save_session(&self, session: StoredSession) -> Result<(), DomainError>;

    /// Removes a session. Returns `false` if it did not exist.
    async fn delete_session(&self, session_id: Uuid) -> Result<bool, DomainError>;
}
