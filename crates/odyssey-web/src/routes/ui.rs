//! Server-rendered HTML UI: the campaign form and the generated sections.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use odyssey_core::error::DomainError;
use odyssey_outline::application::command_handlers;
use odyssey_outline::application::query_handlers::{self, CampaignSessionView};
use odyssey_outline::domain::commands;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::status_for;
use crate::form::CampaignForm;
use crate::render::{self, PageModel};
use crate::state::AppState;

fn html_page(status: StatusCode, model: &PageModel<'_>) -> Response {
    (status, Html(render::page(model))).into_response()
}

fn session_page(view: &CampaignSessionView) -> Response {
    let form = view.parameters.as_ref().map_or_else(
        || CampaignForm {
            session_id: view.session_id.to_string(),
            ..CampaignForm::default()
        },
        |params| CampaignForm::from_parameters(view.session_id, params),
    );
    html_page(
        StatusCode::OK,
        &PageModel {
            form: &form,
            violations: &[],
            session: Some(view),
            notice: None,
        },
    )
}

fn error_page(
    err: &DomainError,
    form: &CampaignForm,
    session: Option<&CampaignSessionView>,
) -> Response {
    let status = status_for(err);
    match err {
        DomainError::Validation(violations) => html_page(
            status,
            &PageModel {
                form,
                violations,
                session,
                notice: None,
            },
        ),
        other => {
            warn!(error = %other, "request failed");
            let message = other.to_string();
            html_page(
                status,
                &PageModel {
                    form,
                    violations: &[],
                    session,
                    notice: Some(&message),
                },
            )
        }
    }
}

/// GET /
async fn index() -> Html<String> {
    Html(render::page(&PageModel {
        form: &CampaignForm::default(),
        violations: &[],
        session: None,
        notice: None,
    }))
}

/// The session named by the form, if it still exists, so a rejected
/// resubmission keeps showing its earlier output.
async fn submitted_session(state: &AppState, form: &CampaignForm) -> Option<CampaignSessionView> {
    let session_id = form.session_id()?;
    query_handlers::get_session_by_id(session_id, &*state.session_repository)
        .await
        .ok()
}

/// POST /generate
#[instrument(skip(state, form))]
async fn generate(State(state): State<AppState>, Form(form): Form<CampaignForm>) -> Response {
    let request = match form.to_request() {
        Ok(request) => request,
        Err(violations) => {
            let session = submitted_session(&state, &form).await;
            return error_page(
                &DomainError::Validation(violations),
                &form,
                session.as_ref(),
            );
        }
    };
    let command = commands::GenerateCampaign {
        correlation_id: Uuid::new_v4(),
        session_id: form.session_id(),
        request,
    };

    info!(correlation_id = %command.correlation_id, "handling generate_campaign form");

    match command_handlers::handle_generate_campaign(
        &command,
        &state.orchestrator,
        state.clock.as_ref(),
        &*state.session_repository,
    )
    .await
    {
        Ok(outcome) => session_page(&CampaignSessionView::from(&outcome.session)),
        Err(err) => {
            let session = submitted_session(&state, &form).await;
            error_page(&err, &form, session.as_ref())
        }
    }
}

/// GET /sessions/{id}
async fn show_session(State(state): State<AppState>, Path(session_id): Path<Uuid>) -> Response {
    match query_handlers::get_session_by_id(session_id, &*state.session_repository).await {
        Ok(view) => session_page(&view),
        Err(err) => error_page(&err, &CampaignForm::default(), None),
    }
}

/// POST /sessions/{id}/retry/{stage}
#[instrument(skip(state))]
async fn retry_stage(
    State(state): State<AppState>,
    Path((session_id, stage)): Path<(Uuid, String)>,
) -> Response {
    let stage = match stage.parse() {
        Ok(stage) => stage,
        Err(err) => return error_page(&err, &CampaignForm::default(), None),
    };
    let command = commands::RetryStage {
        correlation_id: Uuid::new_v4(),
        session_id,
        stage,
    };

    info!(correlation_id = %command.correlation_id, "handling retry_stage form");

    match command_handlers::handle_retry_stage(
        &command,
        &state.orchestrator,
        state.clock.as_ref(),
        &*state.session_repository,
    )
    .await
    {
        Ok(outcome) => session_page(&CampaignSessionView::from(&outcome.session)),
        Err(err) => error_page(&err, &CampaignForm::default(), None),
    }
}

/// POST /sessions/{id}/dismiss
async fn dismiss_failure(State(state): State<AppState>, Path(session_id): Path<Uuid>) -> Response {
    let command = commands::DismissFailure {
        correlation_id: Uuid::new_v4(),
        session_id,
    };

    match command_handlers::handle_dismiss_failure(
        &command,
        state.clock.as_ref(),
        &*state.session_repository,
    )
    .await
    {
        Ok(_) => Redirect::to(&format!("/sessions/{session_id}")).into_response(),
        Err(err) => error_page(&err, &CampaignForm::default(), None),
    }
}

/// POST /sessions/{id}/clear
async fn clear_session(State(state): State<AppState>, Path(session_id): Path<Uuid>) -> Response {
    let command = commands::ClearSession {
        correlation_id: Uuid::new_v4(),
        session_id,
    };

    match command_handlers::handle_clear_session(&command, &*state.session_repository).await {
        Ok(()) | Err(DomainError::SessionNotFound(_)) => Redirect::to("/").into_response(),
        Err(err) => error_page(&err, &CampaignForm::default(), None),
    }
}

/// Returns the router for the HTML UI.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/generate", post(generate))
        .route("/sessions/{id}", get(show_session))
        .route("/sessions/{id}/retry/{stage}", post(retry_stage))
        .route("/sessions/{id}/dismiss", post(dismiss_failure))
        .route("/sessions/{id}/clear", post(clear_session))
}
