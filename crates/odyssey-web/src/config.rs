//! Server configuration read from environment variables.

use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use odyssey_openai::{DEFAULT_BASE_URL, DEFAULT_MODEL, OpenAiConfig};
use odyssey_outline::application::orchestrator::StageSettings;

use crate::error::AppError;

/// Idle sessions are forgotten after this many seconds by default.
pub const DEFAULT_SESSION_TTL_SECS: u32 = 60 * 60;

/// Typed server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Provider connection settings.
    pub openai: OpenAiConfig,
    /// Per-stage generation options and the bounded wait.
    pub stages: StageSettings,
    /// How long an idle session is kept before it is forgotten.
    pub session_ttl: Duration,
}

fn parsed<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{key} is invalid: {e}"))),
        None => Ok(default),
    }
}

fn positive(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: u32,
) -> Result<u32, AppError> {
    let value = parsed(lookup, key, default)?;
    if value == 0 {
        return Err(AppError::Config(format!("{key} must be greater than zero")));
    }
    Ok(value)
}

impl ServerConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable is missing or invalid.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name
    /// to its value.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `OPENAI_API_KEY` is missing or any value
    /// fails to parse or is out of range.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_owned());
        let port: u16 = parsed(&lookup, "PORT", 3000)?;

        let api_key = lookup("OPENAI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                AppError::Config("OPENAI_API_KEY environment variable must be set".to_owned())
            })?;

        let timeout_secs: u64 = parsed(&lookup, "ODYSSEY_STAGE_TIMEOUT_SECS", 120)?;
        if timeout_secs == 0 {
            return Err(AppError::Config(
                "ODYSSEY_STAGE_TIMEOUT_SECS must be greater than zero".to_owned(),
            ));
        }
        let timeout = Duration::from_secs(timeout_secs);

        let temperature: f32 = parsed(&lookup, "ODYSSEY_TEMPERATURE", 0.8)?;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(AppError::Config(format!(
                "ODYSSEY_TEMPERATURE must be between 0.0 and 2.0, got {temperature}"
            )));
        }

        let mut stages = StageSettings {
            timeout,
            ..StageSettings::default()
        };
        stages.story.max_tokens =
            positive(&lookup, "ODYSSEY_STORY_MAX_TOKENS", stages.story.max_tokens)?;
        stages.scenes.max_tokens =
            positive(&lookup, "ODYSSEY_SCENE_MAX_TOKENS", stages.scenes.max_tokens)?;
        stages.levels.max_tokens =
            positive(&lookup, "ODYSSEY_LEVEL_MAX_TOKENS", stages.levels.max_tokens)?;
        stages.story.temperature = temperature;
        stages.scenes.temperature = temperature;
        stages.levels.temperature = temperature;

        let session_ttl = Duration::from_secs(u64::from(positive(
            &lookup,
            "ODYSSEY_SESSION_TTL_SECS",
            DEFAULT_SESSION_TTL_SECS,
        )?));

        let openai = OpenAiConfig {
            api_key,
            model: lookup("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
            base_url: lookup("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()),
            request_timeout: timeout,
        };

        Ok(Self {
            host,
            port,
            openai,
            stages,
            session_ttl,
        })
    }

    /// The socket address to bind.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `HOST:PORT` is not a valid address.
    pub fn bind_address(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<ServerConfig, AppError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_apply_when_only_api_key_is_set() {
        // Act
        let config = config_from(&[("OPENAI_API_KEY", "sk-test")]).unwrap();

        // Assert
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.openai.model, DEFAULT_MODEL);
        assert_eq!(config.openai.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.stages, StageSettings::default());
        assert_eq!(
            config.session_ttl,
            Duration::from_secs(u64::from(DEFAULT_SESSION_TTL_SECS))
        );
        assert_eq!(
            config.bind_address().unwrap(),
            "0.0.0.0:3000".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn test_missing_api_key_is_a_config_error() {
        let err = config_from(&[("PORT", "8080")]).unwrap_err();

        assert!(matches!(err, AppError::Config(message) if message.contains("OPENAI_API_KEY")));
    }

    #[test]
    fn test_overrides_are_applied() {
        let config = config_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("OPENAI_MODEL", "gpt-4o"),
            ("OPENAI_BASE_URL", "http://localhost:11434/v1"),
            ("ODYSSEY_STAGE_TIMEOUT_SECS", "30"),
            ("ODYSSEY_TEMPERATURE", "1.1"),
            ("ODYSSEY_SCENE_MAX_TOKENS", "4000"),
            ("ODYSSEY_SESSION_TTL_SECS", "900"),
        ])
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.openai.model, "gpt-4o");
        assert_eq!(config.stages.timeout, Duration::from_secs(30));
        assert_eq!(config.openai.request_timeout, Duration::from_secs(30));
        assert_eq!(config.stages.scenes.max_tokens, 4000);
        assert_eq!(config.session_ttl, Duration::from_secs(900));
        assert_eq!(config.stages.story.max_tokens, 1500);
        assert!((config.stages.levels.temperature - 1.1).abs() < f32::EPSILON);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        for vars in [
            [("OPENAI_API_KEY", "sk-test"), ("PORT", "not-a-port")],
            [("OPENAI_API_KEY", "sk-test"), ("ODYSSEY_TEMPERATURE", "3.5")],
            [("OPENAI_API_KEY", "sk-test"), ("ODYSSEY_STAGE_TIMEOUT_SECS", "0")],
            [("OPENAI_API_KEY", "sk-test"), ("ODYSSEY_LEVEL_MAX_TOKENS", "0")],
            [("OPENAI_API_KEY", "sk-test"), ("ODYSSEY_SESSION_TTL_SECS", "0")],
        ] {
            assert!(
                matches!(config_from(&vars), Err(AppError::Config(_))),
                "expected {vars:?} to be rejected"
            );
        }
    }
}
