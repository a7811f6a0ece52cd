//! `CompletionProvider` backed by an OpenAI-compatible `/chat/completions`
//! endpoint.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use odyssey_core::provider::{
    CompletionProvider, CompletionRequest, ProviderError, ProviderErrorKind,
};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Default endpoint root.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
/// Default model.
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_ERROR_DETAIL_CHARS: usize = 300;

/// Errors raised while constructing the provider.
#[derive(Debug, Error)]
pub enum OpenAiError {
    /// The API key is empty.
    #[error("OpenAI API key not configured")]
    MissingApiKey,

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Connection settings for the provider.
#[derive(Clone)]
pub struct OpenAiConfig {
    /// Bearer credential.
    pub api_key: String,
    /// Model name sent with every request.
    pub model: String,
    /// Endpoint root, without the trailing `/chat/completions`.
    pub base_url: String,
    /// Client-side request timeout.
    pub request_timeout: Duration,
}

impl OpenAiConfig {
    /// Settings for the public endpoint with the default model.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_owned(),
            base_url: DEFAULT_BASE_URL.to_owned(),
            request_timeout: Duration::from_secs(120),
        }
    }
}

impl fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Chat-completions client implementing [`CompletionProvider`].
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: Client,
    config: OpenAiConfig,
    endpoint: String,
}

impl OpenAiProvider {
    /// Builds the provider.
    ///
    /// # Errors
    ///
    /// Returns `OpenAiError::MissingApiKey` for a blank key and
    /// `OpenAiError::Client` if the HTTP client cannot be built.
    pub fn new(config: OpenAiConfig) -> Result<Self, OpenAiError> {
        if config.api_key.trim().is_empty() {
            return Err(OpenAiError::MissingApiKey);
        }
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        let endpoint = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
        Ok(Self {
            client,
            config,
            endpoint,
        })
    }

    /// The model requests are sent to.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

fn transport_error(err: &reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::new(ProviderErrorKind::Timeout, "request timed out")
    } else {
        ProviderError::new(ProviderErrorKind::Network, err.to_string())
    }
}

/// Prefers the `error.message` of an OpenAI error body, falling back to a
/// truncated copy of the raw body.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body).map_or_else(
        |_| body.chars().take(MAX_ERROR_DETAIL_CHARS).collect(),
        |envelope| envelope.error.message,
    )
}

fn status_error(status: StatusCode, retry_after: Option<u64>, body: &str) -> ProviderError {
    let detail = error_detail(body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ProviderError::new(ProviderErrorKind::Authentication, detail)
        }
        StatusCode::TOO_MANY_REQUESTS => {
            let err = ProviderError::new(ProviderErrorKind::RateLimited, detail);
            match retry_after {
                Some(secs) => err.with_retry_after(secs),
                None => err,
            }
        }
        _ => ProviderError::new(
            ProviderErrorKind::Api,
            format!("status {}: {detail}", status.as_u16()),
        ),
    }
}

fn extract_content(body: &str) -> Result<String, ProviderError> {
    let response: ChatCompletionResponse = serde_json::from_str(body).map_err(|e| {
        ProviderError::new(
            ProviderErrorKind::MalformedResponse,
            format!("undecodable response body: {e}"),
        )
    })?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| {
            ProviderError::new(
                ProviderErrorKind::MalformedResponse,
                "response has no choices[0].message.content",
            )
        })
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let body = ChatCompletionRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            max_tokens: request.options.max_tokens,
            temperature: request.options.temperature,
        };

        debug!(model = %self.config.model, max_tokens = body.max_tokens, "sending chat completion");
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok());
        let text = response.text().await.map_err(|e| transport_error(&e))?;

        if !status.is_success() {
            let err = status_error(status, retry_after, &text);
            warn!(status = status.as_u16(), kind = err.kind.as_str(), "chat completion rejected");
            return Err(err);
        }
        extract_content(&text)
    }
}
