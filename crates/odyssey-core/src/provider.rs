//! LLM completion provider port.
//!
//! The provider is a black box: it takes a prompt plus generation options
//! and returns generated text, or fails with a classified [`ProviderError`].

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification of a provider failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    /// Missing or rejected credentials.
    Authentication,
    /// The provider throttled the request.
    RateLimited,
    /// Transport-level failure (DNS, connect, reset).
    Network,
    /// The bounded wait elapsed before the provider answered.
    Timeout,
    /// Any other non-success status from the provider.
    Api,
    /// The provider answered with a body that could not be decoded.
    MalformedResponse,
}

impl ProviderErrorKind {
    /// Stable snake_case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::RateLimited => "rate_limited",
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::Api => "api",
            Self::MalformedResponse => "malformed_response",
        }
    }
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().replace('_', " "))
    }
}

/// A failed provider call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ProviderError {
    /// What went wrong.
    pub kind: ProviderErrorKind,
    /// Provider- or transport-supplied detail.
    pub message: String,
    /// Seconds the provider asked us to wait, for rate limits.
    pub retry_after_secs: Option<u64>,
}

impl ProviderError {
    /// Creates a new provider error.
    #[must_use]
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retry_after_secs: None,
        }
    }

    /// The error reported when the bounded wait elapses.
    #[must_use]
    pub fn timed_out(after: Duration) -> Self {
        Self::new(
            ProviderErrorKind::Timeout,
            format!("no response within {after:?}"),
        )
    }

    /// Attaches a retry-after hint.
    #[must_use]
    pub fn with_retry_after(mut self, secs: u64) -> Self {
        self.retry_after_secs = Some(secs);
        self
    }
}

/// Generation bounds for a single completion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompletionOptions {
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

/// Everything the provider needs for one completion.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Standing instructions sent ahead of the prompt.
    pub system: String,
    /// The rendered stage prompt.
    pub prompt: String,
    /// Generation bounds.
    pub options: CompletionOptions,
}

/// An LLM completion backend.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Generates text for `request`.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timed_out_reports_whole_seconds() {
        // Arrange / Act
        let err = ProviderError::timed_out(Duration::from_secs(120));

        // Assert
        assert_eq!(err.kind, ProviderErrorKind::Timeout);
        assert_eq!(err.message, "no response within 120s");
    }

    #[test]
    fn test_timed_out_reports_sub_second_waits() {
        // Arrange / Act
        let err = ProviderError::timed_out(Duration::from_millis(50));

        // Assert
        assert_eq!(err.message, "no response within 50ms");
    }
}
