//! Shared test helpers for web integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use odyssey_core::provider::CompletionProvider;
use odyssey_core::repository::SessionRepository;
use odyssey_outline::application::orchestrator::{Orchestrator, StageSettings};
use odyssey_test_support::FixedClock;
use tower::ServiceExt;

use odyssey_web::state::AppState;

/// Build the full app router over the given provider and session store with
/// a fixed clock. Uses the same router as `main.rs`.
pub fn build_test_app(
    provider: Arc<dyn CompletionProvider>,
    session_repository: Arc<dyn SessionRepository>,
) -> Router {
    let app_state = AppState::new(
        Arc::new(FixedClock::default()),
        Orchestrator::new(provider, StageSettings::default()),
        session_repository,
    );
    odyssey_web::app(app_state)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, body_bytes.to_vec())
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    let (status, bytes) = send(app, request).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// Send a POST request without a body and return the response.
pub async fn post_empty(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let (status, bytes) = send(app, request).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let (status, bytes) = send(app, request).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// Send a DELETE request and return the status.
pub async fn delete(app: Router, uri: &str) -> StatusCode {
    let request = Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(app, request).await.0
}

/// Send a form POST and return the HTML body.
pub async fn post_form(app: Router, uri: &str, body: &str) -> (StatusCode, String) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body.to_owned()))
        .unwrap();

    let (status, bytes) = send(app, request).await;
    (status, String::from_utf8(bytes).unwrap())
}

/// Send a GET request and return the HTML body.
pub async fn get_html(app: Router, uri: &str) -> (StatusCode, String) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let (status, bytes) = send(app, request).await;
    (status, String::from_utf8(bytes).unwrap())
}
