//! In-memory implementation of the `SessionRepository` trait.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use odyssey_core::clock::Clock;
use odyssey_core::error::DomainError;
use odyssey_core::repository::{SessionRepository, StoredSession};

/// Drops sessions that have not been saved for longer than `idle`.
#[derive(Clone)]
struct IdleExpiry {
    clock: Arc<dyn Clock>,
    idle: TimeDelta,
}

impl fmt::Debug for IdleExpiry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdleExpiry").field("idle", &self.idle).finish()
    }
}

impl IdleExpiry {
    /// Snapshots last saved before this instant are expired.
    fn cutoff(&self) -> Option<DateTime<Utc>> {
        self.clock.now().checked_sub_signed(self.idle)
    }
}

/// Process-local session repository. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionRepository {
    sessions: Arc<RwLock<HashMap<Uuid, StoredSession>>>,
    expiry: Option<IdleExpiry>,
}

impl InMemorySessionRepository {
    /// Creates an empty repository that keeps sessions until deleted.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty repository that forgets a session once it has gone
    /// `idle` without being saved. Expired sessions load as missing and are
    /// swept on every save.
    #[must_use]
    pub fn with_idle_timeout(clock: Arc<dyn Clock>, idle: Duration) -> Self {
        Self {
            sessions: Arc::default(),
            expiry: Some(IdleExpiry {
                clock,
                idle: TimeDelta::from_std(idle).unwrap_or(TimeDelta::MAX),
            }),
        }
    }

    /// Number of stored sessions, including expired ones not yet swept.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Returns `true` if no sessions are held.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    fn cutoff(&self) -> Option<DateTime<Utc>> {
        self.expiry.as_ref().and_then(IdleExpiry::cutoff)
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn load_session(&self, session_id: Uuid) -> Result<Option<StoredSession>, DomainError> {
        let cutoff = self.cutoff();
        {
            let sessions = self.sessions.read().await;
            match sessions.get(&session_id) {
                None => return Ok(None),
                Some(session) if cutoff.is_none_or(|at| session.updated_at >= at) => {
                    return Ok(Some(session.clone()));
                }
                Some(_) => {}
            }
        }

        let mut sessions = self.sessions.write().await;
        // A save may have refreshed the entry since the read lock was released.
        if let Some(session) = sessions
            .get(&session_id)
            .filter(|session| cutoff.is_none_or(|at| session.updated_at >= at))
        {
            return Ok(Some(session.clone()));
        }
        debug!(%session_id, "session expired");
        sessions.remove(&session_id);
        Ok(None)
    }

    async fn save_session(&self, session: StoredSession) -> Result<(), DomainError> {
        debug!(session_id = %session.session_id, "saving session snapshot");
        let mut sessions = self.sessions.write().await;
        if let Some(cutoff) = self.cutoff() {
            let before = sessions.len();
            sessions.retain(|_, stored| stored.updated_at >= cutoff);
            let swept = before - sessions.len();
            if swept > 0 {
                debug!(swept, "expired sessions removed");
            }
        }
        sessions.insert(session.session_id, session);
        Ok(())
    }

    async fn delete_session(&self, session_id: Uuid) -> Result<bool, DomainError> {
        Ok(self.sessions.write().await.remove(&session_id).is_some())
    }
}
