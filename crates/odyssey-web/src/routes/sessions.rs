//! JSON routes for session-scoped campaign generation.

use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use odyssey_outline::application::command_handlers::{self, PipelineOutcome};
use odyssey_outline::application::query_handlers::{self, CampaignSessionView};
use odyssey_outline::domain::commands;
use odyssey_outline::domain::parameters::CampaignRequest;
use odyssey_outline::domain::stages::StageKind;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /sessions.
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    /// Session to continue; omitted to start a new one.
    #[serde(default)]
    pub session_id: Option<Uuid>,
    /// Campaign fields.
    #[serde(flatten)]
    pub campaign: CampaignRequest,
}

/// Response body after the pipeline ran. A stage failure is reported in
/// `session.failure`, next to the stages that did complete.
#[derive(Debug, Serialize)]
pub struct PipelineResponse {
    /// The session after the run.
    pub session: CampaignSessionView,
    /// Stages that called the provider during this request.
    pub generated: Vec<StageKind>,
}

impl From<PipelineOutcome> for PipelineResponse {
    fn from(outcome: PipelineOutcome) -> Self {
        Self {
            session: CampaignSessionView::from(&outcome.session),
            generated: outcome.generated,
        }
    }
}

fn attachment(filename: &str) -> [(header::HeaderName, String); 1] {
    [(
        header::CONTENT_DISPOSITION,
        format!("attachment; filename=\"{filename}\""),
    )]
}

/// POST /sessions
#[instrument(skip(state, request), fields(session_id = ?request.session_id))]
async fn generate(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<PipelineResponse>, ApiError> {
    let command = commands::GenerateCampaign {
        correlation_id: Uuid::new_v4(),
        session_id: request.session_id,
        request: request.campaign,
    };

    info!(correlation_id = %command.correlation_id, "handling generate_campaign command");

    let outcome = command_handlers::handle_generate_campaign(
        &command,
        &state.orchestrator,
        state.clock.as_ref(),
        &*state.session_repository,
    )
    .await?;

    Ok(Json(outcome.into()))
}

/// GET /sessions/{id}
async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<CampaignSessionView>, ApiError> {
    let view = query_handlers::get_session_by_id(session_id, &*state.session_repository).await?;
    Ok(Json(view))
}

/// POST /sessions/{id}/retry/{stage}
#[instrument(skip(state))]
async fn retry_stage(
    State(state): State<AppState>,
    Path((session_id, stage)): Path<(Uuid, String)>,
) -> Result<Json<PipelineResponse>, ApiError> {
    let command = commands::RetryStage {
        correlation_id: Uuid::new_v4(),
        session_id,
        stage: stage.parse()?,
    };

    info!(correlation_id = %command.correlation_id, "handling retry_stage command");

    let outcome = command_handlers::handle_retry_stage(
        &command,
        &state.orchestrator,
        state.clock.as_ref(),
        &*state.session_repository,
    )
    .await?;

    Ok(Json(outcome.into()))
}

/// POST /sessions/{id}/dismiss
#[instrument(skip(state))]
async fn dismiss_failure(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<CampaignSessionView>, ApiError> {
    let command = commands::DismissFailure {
        correlation_id: Uuid::new_v4(),
        session_id,
    };

    let session = command_handlers::handle_dismiss_failure(
        &command,
        state.clock.as_ref(),
        &*state.session_repository,
    )
    .await?;

    Ok(Json(CampaignSessionView::from(&session)))
}

/// DELETE /sessions/{id}
#[instrument(skip(state))]
async fn clear_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let command = commands::ClearSession {
        correlation_id: Uuid::new_v4(),
        session_id,
    };

    command_handlers::handle_clear_session(&command, &*state.session_repository).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /sessions/{id}/export
async fn export_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let export = query_handlers::export_session(session_id, &*state.session_repository).await?;
    Ok((attachment(&format!("campaign-{session_id}.json")), Json(export)))
}

/// GET /sessions/{id}/export/story
async fn export_story_outline(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let export =
        query_handlers::export_story_outline(session_id, &*state.session_repository).await?;
    Ok((
        attachment(&format!("story-outline-{session_id}.json")),
        Json(export),
    ))
}

/// Returns the router for the session endpoints.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sessions", post(generate))
        .route("/sessions/{id}", get(get_session).delete(clear_session))
        .route("/sessions/{id}/retry/{stage}", post(retry_stage))
        .route("/sessions/{id}/dismiss", post(dismiss_failure))
        .route("/sessions/{id}/export", get(export_session))
        .route("/sessions/{id}/export/story", get(export_story_outline))
}
