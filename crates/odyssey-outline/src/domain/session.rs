//! Session-scoped campaign state.

use chrono::{DateTime, Utc};
use odyssey_core::error::DomainError;
use odyssey_core::repository::StoredSession;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::parameters::CampaignParameters;
use super::stages::{FailureNotice, GenerationStage, StageKind};

/// Everything one user session has submitted and generated.
///
/// `stages` is always a prefix of `StageKind::ALL`: a stage is only ever
/// recorded once every stage before it exists, and recording a stage drops
/// every stage after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignSession {
    /// Session identifier.
    pub id: Uuid,
    parameters: Option<CampaignParameters>,
    fingerprint: Option<String>,
    stages: Vec<GenerationStage>,
    failure: Option<FailureNotice>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CampaignSession {
    /// Creates an empty session.
    #[must_use]
    pub fn new(id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id,
            parameters: None,
            fingerprint: None,
            stages: Vec::new(),
            failure: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The submitted parameters, if any.
    #[must_use]
    pub fn parameters(&self) -> Option<&CampaignParameters> {
        self.parameters.as_ref()
    }

    /// Fingerprint of the submitted parameters.
    #[must_use]
    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }

    /// Completed stages, in execution order.
    #[must_use]
    pub fn stages(&self) -> &[GenerationStage] {
        &self.stages
    }

    /// A completed stage, if present.
    #[must_use]
    pub fn stage(&self, kind: StageKind) -> Option<&GenerationStage> {
        self.stages.get(kind.position())
    }

    /// The stages `kind` draws its context from.
    #[must_use]
    pub fn prior_stages(&self, kind: StageKind) -> &[GenerationStage] {
        &self.stages[..kind.position().min(self.stages.len())]
    }

    /// The last failure, until dismissed or superseded.
    #[must_use]
    pub fn failure(&self) -> Option<&FailureNotice> {
        self.failure.as_ref()
    }

    /// When the session was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When the session last changed.
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// The first stage that has not completed yet.
    #[must_use]
    pub fn next_pending_stage(&self) -> Option<StageKind> {
        StageKind::ALL.get(self.stages.len()).copied()
    }

    /// Returns `true` once all three stages exist.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.next_pending_stage().is_none()
    }

    /// Stores `parameters`. When they differ from the current ones every
    /// generated stage is discarded and `true` is returned; identical
    /// parameters keep completed stages.
    pub fn submit_parameters(&mut self, parameters: CampaignParameters, now: DateTime<Utc>) -> bool {
        let fingerprint = parameters.fingerprint();
        if self.fingerprint.as_deref() == Some(fingerprint.as_str()) {
            return false;
        }
        self.parameters = Some(parameters);
        self.fingerprint = Some(fingerprint);
        self.stages.clear();
        self.failure = None;
        self.updated_at = now;
        true
    }

    /// Checks that `kind` can run now: parameters are present and every
    /// earlier stage has completed.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` without parameters and
    /// `DomainError::MissingPriorStage` when an earlier stage is missing.
    pub fn ensure_ready_for(&self, kind: StageKind) -> Result<&CampaignParameters, DomainError> {
        let parameters = self.parameters.as_ref().ok_or_else(|| {
            DomainError::invalid("parameters", "no campaign parameters have been submitted")
        })?;
        if kind.position() > self.stages.len() {
            return Err(DomainError::MissingPriorStage {
                stage: kind.label(),
                requires: StageKind::ALL[self.stages.len()].label(),
            });
        }
        Ok(parameters)
    }

    /// Records a completed stage, replacing it and dropping every later
    /// stage if it already existed. Clears any failure notice.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::MissingPriorStage` if an earlier stage is
    /// missing.
    pub fn record_stage(
        &mut self,
        stage: GenerationStage,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let position = stage.kind.position();
        if position > self.stages.len() {
            return Err(DomainError::MissingPriorStage {
                stage: stage.kind.label(),
                requires: StageKind::ALL[self.stages.len()].label(),
            });
        }
        self.stages.truncate(position);
        self.stages.push(stage);
        self.failure = None;
        self.updated_at = now;
        Ok(())
    }

    /// Records a failure. Completed stages are left untouched.
    pub fn record_failure(&mut self, notice: FailureNotice) {
        self.updated_at = notice.occurred_at;
        self.failure = Some(notice);
    }

    /// Dismisses the failure notice.
    pub fn dismiss_failure(&mut self, now: DateTime<Utc>) {
        if self.failure.take().is_some() {
            self.updated_at = now;
        }
    }

    /// Serializes the session for storage.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if serialization fails.
    pub fn to_snapshot(&self) -> Result<StoredSession, DomainError> {
        let payload = serde_json::to_value(self).map_err(|e| {
            DomainError::Infrastructure(format!("session serialization failed: {e}"))
        })?;
        Ok(StoredSession {
            session_id: self.id,
            payload,
            updated_at: self.updated_at,
        })
    }

    /// Rebuilds a session from storage.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if deserialization fails.
    pub fn from_snapshot(stored: &StoredSession) -> Result<Self, DomainError> {
        serde_json::from_value(stored.payload.clone()).map_err(|e| {
            DomainError::Infrastructure(format!("session deserialization failed: {e}"))
        })
    }
}
