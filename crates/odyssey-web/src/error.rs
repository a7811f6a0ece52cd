//! OdysseyMaker: web error types.

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use odyssey_core::error::{DomainError, FieldViolation};
use odyssey_core::provider::ProviderErrorKind;
use odyssey_openai::OpenAiError;
use odyssey_outline::domain::stages::{StageFailure, StageKind};
use serde::Serialize;
use thiserror::Error;

/// Startup errors for the server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// The completion provider could not be constructed.
    #[error("provider setup error: {0}")]
    Provider(#[from] OpenAiError),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// HTTP status for a domain error. Shared by the JSON API and the HTML UI.
#[must_use]
pub fn status_for(err: &DomainError) -> StatusCode {
    match err {
        DomainError::Validation(_) => StatusCode::BAD_REQUEST,
        DomainError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        DomainError::MissingPriorStage { .. } => StatusCode::CONFLICT,
        DomainError::Provider(provider) => match provider.kind {
            ProviderErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ProviderErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ProviderErrorKind::Authentication
            | ProviderErrorKind::Network
            | ProviderErrorKind::Api
            | ProviderErrorKind::MalformedResponse => StatusCode::BAD_GATEWAY,
        },
        DomainError::EmptyResponse => StatusCode::BAD_GATEWAY,
        DomainError::Parse(_) | DomainError::Infrastructure(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
    /// The stage that failed, for stage errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<StageKind>,
    /// Provider failure classification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_error: Option<ProviderErrorKind>,
    /// Per-field problems, for validation errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violations: Option<Vec<FieldViolation>>,
}

/// HTTP-layer wrapper around `DomainError` that implements `IntoResponse`.
#[derive(Debug)]
pub struct ApiError {
    /// The underlying error.
    pub error: DomainError,
    /// The stage it came from, if any.
    pub stage: Option<StageKind>,
}

impl From<DomainError> for ApiError {
    fn from(error: DomainError) -> Self {
        Self { error, stage: None }
    }
}

impl From<StageFailure> for ApiError {
    fn from(failure: StageFailure) -> Self {
        Self {
            error: failure.error,
            stage: Some(failure.stage),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.error);
        let retry_after = match &self.error {
            DomainError::Provider(provider) => provider.retry_after_secs,
            _ => None,
        };
        let message = match self.stage {
            Some(stage) => format!("{stage} stage failed: {}", self.error),
            None => self.error.to_string(),
        };

        let body = ErrorBody {
            error: self.error.code(),
            message,
            stage: self.stage,
            provider_error: match &self.error {
                DomainError::Provider(provider) => Some(provider.kind),
                _ => None,
            },
            violations: match self.error {
                DomainError::Validation(violations) => Some(violations),
                _ => None,
            },
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use odyssey_core::provider::ProviderError;
    use uuid::Uuid;

    fn status_of(err: DomainError) -> StatusCode {
        let response = ApiError::from(err).into_response();
        response.status()
    }

    fn provider(kind: ProviderErrorKind) -> DomainError {
        ProviderError::new(kind, "detail").into()
    }

    async fn body_of(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_session_not_found_maps_to_404() {
        assert_eq!(
            status_of(DomainError::SessionNotFound(Uuid::new_v4())),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_missing_prior_stage_maps_to_409() {
        assert_eq!(
            status_of(DomainError::MissingPriorStage {
                stage: "scene outline",
                requires: "story outline",
            }),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_validation_maps_to_400() {
        assert_eq!(
            status_of(DomainError::invalid("party_size", "must be at least 1")),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_provider_errors_map_by_kind() {
        assert_eq!(
            status_of(provider(ProviderErrorKind::RateLimited)),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            status_of(provider(ProviderErrorKind::Timeout)),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_of(provider(ProviderErrorKind::Authentication)),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(status_of(DomainError::EmptyResponse), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_infrastructure_maps_to_500() {
        assert_eq!(
            status_of(DomainError::Infrastructure("store down".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_validation_body_lists_violations() {
        // Arrange
        let err = DomainError::Validation(vec![
            FieldViolation::new("party_size", "must be at least 1"),
            FieldViolation::new("level_range", "starting level 5 is above ending level 2"),
        ]);

        // Act
        let json = body_of(ApiError::from(err).into_response()).await;

        // Assert
        assert_eq!(json["error"], "validation_error");
        assert_eq!(json["violations"].as_array().unwrap().len(), 2);
        assert_eq!(json["violations"][0]["field"], "party_size");
        assert!(json.get("stage").is_none());
    }

    #[tokio::test]
    async fn test_stage_failure_body_names_stage_and_sets_retry_after() {
        // Arrange
        let failure = StageFailure {
            stage: StageKind::SceneOutline,
            error: ProviderError::new(ProviderErrorKind::RateLimited, "slow down")
                .with_retry_after(20)
                .into(),
        };

        // Act
        let response = ApiError::from(failure).into_response();

        // Assert
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "20");
        let json = body_of(response).await;
        assert_eq!(json["stage"], "scene_outline");
        assert_eq!(json["provider_error"], "rate_limited");
        assert!(
            json["message"]
                .as_str()
                .unwrap()
                .starts_with("scene outline stage failed")
        );
    }
}
