//! Stateless single-stage endpoints. Each call takes the parameters plus the
//! prior stage outputs and runs exactly one stage.

use axum::extract::State;
use axum::{Json, Router, routing::post};
use odyssey_core::error::DomainError;
use odyssey_outline::domain::parameters::{CampaignParameters, CampaignRequest};
use odyssey_outline::domain::progression::LevelProgression;
use odyssey_outline::domain::stages::{StageFailure, StageKind};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /outline/scenes.
#[derive(Debug, Deserialize)]
pub struct SceneOutlineRequest {
    /// Campaign fields.
    #[serde(flatten)]
    pub campaign: CampaignRequest,
    /// Output of the story outline stage.
    pub story_outline: String,
}

/// Request body for POST /outline/levels.
#[derive(Debug, Deserialize)]
pub struct LevelProgressionRequest {
    /// Campaign fields.
    #[serde(flatten)]
    pub campaign: CampaignRequest,
    /// Output of the story outline stage.
    pub story_outline: String,
    /// Output of the scene outline stage.
    pub scene_outline: String,
}

/// Response body for the text stages.
#[derive(Debug, Serialize)]
pub struct TextStageResponse {
    /// Which stage ran.
    pub stage: StageKind,
    /// The generated Markdown.
    pub content: String,
}

/// Response body for POST /outline/levels.
#[derive(Debug, Serialize)]
pub struct LevelProgressionResponse {
    /// Always `level_progression`.
    pub stage: StageKind,
    /// Parsed table or raw-text fallback.
    pub progression: LevelProgression,
}

fn stage_error(stage: StageKind) -> impl FnOnce(DomainError) -> ApiError {
    move |error| ApiError::from(StageFailure { stage, error })
}

fn require_context(text: &str, stage: StageKind, requires: StageKind) -> Result<(), ApiError> {
    if text.trim().is_empty() {
        return Err(DomainError::MissingPriorStage {
            stage: stage.label(),
            requires: requires.label(),
        }
        .into());
    }
    Ok(())
}

/// POST /outline/story
#[instrument(skip(state, request))]
async fn story_outline(
    State(state): State<AppState>,
    Json(request): Json<CampaignRequest>,
) -> Result<Json<TextStageResponse>, ApiError> {
    let params = CampaignParameters::try_from(request)?;
    info!("generating story outline");

    let content = state
        .orchestrator
        .generate_story_outline(&params)
        .await
        .map_err(stage_error(StageKind::StoryOutline))?;

    Ok(Json(TextStageResponse {
        stage: StageKind::StoryOutline,
        content,
    }))
}

/// POST /outline/scenes
#[instrument(skip(state, request))]
async fn scene_outline(
    State(state): State<AppState>,
    Json(request): Json<SceneOutlineRequest>,
) -> Result<Json<TextStageResponse>, ApiError> {
    let params = CampaignParameters::try_from(request.campaign)?;
    require_context(
        &request.story_outline,
        StageKind::SceneOutline,
        StageKind::StoryOutline,
    )?;
    info!("generating scene outline");

    let content = state
        .orchestrator
        .generate_scene_outline(&params, &request.story_outline)
        .await
        .map_err(stage_error(StageKind::SceneOutline))?;

    Ok(Json(TextStageResponse {
        stage: StageKind::SceneOutline,
        content,
    }))
}

/// POST /outline/levels
#[instrument(skip(state, request))]
async fn level_progression(
    State(state): State<AppState>,
    Json(request): Json<LevelProgressionRequest>,
) -> Result<Json<LevelProgressionResponse>, ApiError> {
    let params = CampaignParameters::try_from(request.campaign)?;
    require_context(
        &request.story_outline,
        StageKind::LevelProgression,
        StageKind::StoryOutline,
    )?;
    require_context(
        &request.scene_outline,
        StageKind::LevelProgression,
        StageKind::SceneOutline,
    )?;
    info!("generating level progression");

    let progression = state
        .orchestrator
        .generate_level_progression(&params, &request.story_outline, &request.scene_outline)
        .await
        .map_err(stage_error(StageKind::LevelProgression))?;

    Ok(Json(LevelProgressionResponse {
        stage: StageKind::LevelProgression,
        progression,
    }))
}

/// Returns the router for the single-stage endpoints.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/outline/story", post(story_outline))
        .route("/outline/scenes", post(scene_outline))
        .route("/outline/levels", post(level_progression))
}
