//! Domain error types.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::provider::ProviderError;

/// A single rejected input field, reported inline next to the form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    /// Name of the offending field as it appears on the form.
    pub field: String,
    /// Human-readable reason.
    pub message: String,
}

impl FieldViolation {
    /// Creates a new violation for `field`.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn join_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// User input was malformed or missing. Blocks every provider call.
    #[error("validation error: {}", join_violations(.0))]
    Validation(Vec<FieldViolation>),

    /// The LLM provider call failed.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The provider call succeeded but returned no usable content.
    #[error("provider returned an empty response")]
    EmptyResponse,

    /// Provider output could not be structured.
    #[error("parse error: {0}")]
    Parse(String),

    /// A stage was requested before the stages it draws context from.
    #[error("{stage} requires a completed {requires}")]
    MissingPriorStage {
        /// The stage that was requested.
        stage: &'static str,
        /// The earlier stage that is missing.
        requires: &'static str,
    },

    /// No session exists with the given ID.
    #[error("session not found: {0}")]
    SessionNotFound(Uuid),

    /// A storage or serialization failure.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl DomainError {
    /// Shorthand for a validation error with a single violation.
    #[must_use]
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldViolation::new(field, message)])
    }

    /// Machine-readable error code, shared by the JSON API and the UI.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Provider(_) => "provider_error",
            Self::EmptyResponse => "empty_response",
            Self::Parse(_) => "parse_error",
            Self::MissingPriorStage { .. } => "missing_prior_stage",
            Self::SessionNotFound(_) => "session_not_found",
            Self::Infrastructure(_) => "infrastructure_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderErrorKind;

    #[test]
    fn test_validation_message_lists_every_violation() {
        // Arrange
        let err = DomainError::Validation(vec![
            FieldViolation::new("party_size", "must be at least 1"),
            FieldViolation::new("level_range", "minimum level exceeds maximum level"),
        ]);

        // Act
        let message = err.to_string();

        // Assert
        assert_eq!(
            message,
            "validation error: party_size: must be at least 1; \
             level_range: minimum level exceeds maximum level"
        );
        assert_eq!(err.code(), "validation_error");
    }

    #[test]
    fn test_provider_error_converts_and_keeps_kind() {
        let err: DomainError =
            ProviderError::new(ProviderErrorKind::RateLimited, "slow down").into();

        assert_eq!(err.code(), "provider_error");
        assert_eq!(err.to_string(), "provider error: rate limited: slow down");
    }

    #[test]
    fn test_missing_prior_stage_names_both_stages() {
        let err = DomainError::MissingPriorStage {
            stage: "scene outline",
            requires: "story outline",
        };

        assert_eq!(err.to_string(), "scene outline requires a completed story outline");
    }
}
