//! Query handlers for the Outline Orchestration context.
//!
//! This module contains query handlers that load sessions and return
//! read-only view and export DTOs.

use chrono::{DateTime, Utc};
use odyssey_core::error::DomainError;
use odyssey_core::repository::SessionRepository;
use serde::Serialize;
use uuid::Uuid;

use crate::application::command_handlers;
use crate::domain::parameters::CampaignParameters;
use crate::domain::progression::LevelMilestone;
use crate::domain::session::CampaignSession;
use crate::domain::stages::{FailureNotice, GenerationStage, StageKind, StageOutput};

/// Read-only view of one completed stage.
#[derive(Debug, Clone, Serialize)]
pub struct StageView {
    /// Which stage.
    pub stage: StageKind,
    /// Display heading.
    pub title: &'static str,
    /// Provider text (Markdown).
    pub content: String,
    /// Parsed leveling table; `None` for text stages and parse fallbacks.
    pub milestones: Option<Vec<LevelMilestone>>,
    /// When the stage completed.
    pub generated_at: DateTime<Utc>,
}

impl From<&GenerationStage> for StageView {
    fn from(stage: &GenerationStage) -> Self {
        let milestones = match &stage.output {
            StageOutput::Progression(progression) => progression.milestones().map(<[_]>::to_vec),
            StageOutput::Text(_) => None,
        };
        Self {
            stage: stage.kind,
            title: stage.kind.title(),
            content: stage.text().to_owned(),
            milestones,
            generated_at: stage.generated_at,
        }
    }
}

/// Read-only view of a campaign session.
#[derive(Debug, Clone, Serialize)]
pub struct CampaignSessionView {
    /// The session identifier.
    pub session_id: Uuid,
    /// Submitted parameters, if any.
    pub parameters: Option<CampaignParameters>,
    /// Completed stages in order Story, Scenes, Levels.
    pub stages: Vec<StageView>,
    /// The next stage to run; `None` once complete.
    pub next_stage: Option<StageKind>,
    /// The last stage failure, until dismissed.
    pub failure: Option<FailureNotice>,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the session last changed.
    pub updated_at: DateTime<Utc>,
}

impl From<&CampaignSession> for CampaignSessionView {
    fn from(session: &CampaignSession) -> Self {
        Self {
            session_id: session.id,
            parameters: session.parameters().cloned(),
            stages: session.stages().iter().map(StageView::from).collect(),
            next_stage: session.next_pending_stage(),
            failure: session.failure().cloned(),
            created_at: session.created_at(),
            updated_at: session.updated_at(),
        }
    }
}

/// Full session download: parameters plus every stage with its prompt.
#[derive(Debug, Clone, Serialize)]
pub struct SessionExport {
    /// The session identifier.
    pub session_id: Uuid,
    /// Parameter fingerprint.
    pub fingerprint: Option<String>,
    /// Submitted parameters.
    pub parameters: Option<CampaignParameters>,
    /// Completed stages, in order.
    pub stages: Vec<GenerationStage>,
}

/// Outline-only download.
#[derive(Debug, Clone, Serialize)]
pub struct StoryOutlineExport {
    /// The session identifier.
    pub session_id: Uuid,
    /// Submitted parameters.
    pub parameters: CampaignParameters,
    /// The story outline text.
    pub story_outline: String,
    /// When the outline was generated.
    pub generated_at: DateTime<Utc>,
}

/// Retrieves a campaign session by its ID.
///
/// # Errors
///
/// Returns `DomainError::SessionNotFound` if no session exists for the ID.
/// Returns `DomainError::Infrastructure` if loading fails.
pub async fn get_session_by_id(
    session_id: Uuid,
    repo: &dyn SessionRepository,
) -> Result<CampaignSessionView, DomainError> {
    let session = command_handlers::load_session(repo, session_id).await?;
    Ok(CampaignSessionView::from(&session))
}

/// Exports everything a session holds.
///
/// # Errors
///
/// Same as [`get_session_by_id`].
pub async fn export_session(
    session_id: Uuid,
    repo: &dyn SessionRepository,
) -> Result<SessionExport, DomainError> {
    let session = command_handlers::load_session(repo, session_id).await?;
    Ok(SessionExport {
        session_id,
        fingerprint: session.fingerprint().map(str::to_owned),
        parameters: session.parameters().cloned(),
        stages: session.stages().to_vec(),
    })
}

/// Exports the story outline alone.
///
/// # Errors
///
/// Same as [`get_session_by_id`], plus `DomainError::MissingPriorStage` if the
/// story outline has not been generated.
pub async fn export_story_outline(
    session_id: Uuid,
    repo: &dyn SessionRepository,
) -> Result<StoryOutlineExport, DomainError> {
    let session = command_handlers::load_session(repo, session_id).await?;
    let missing = || DomainError::MissingPriorStage {
        stage: "outline export",
        requires: StageKind::StoryOutline.label(),
    };
    let parameters = session.parameters().cloned().ok_or_else(missing)?;
    let story = session.stage(StageKind::StoryOutline).ok_or_else(missing)?;
    Ok(StoryOutlineExport {
        session_id,
        parameters,
        story_outline: story.text().to_owned(),
        generated_at: story.generated_at,
    })
}
