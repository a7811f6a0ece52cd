//! The Outline Orchestrator.
//!
//! Each operation is a pure function of the campaign parameters and the
//! prior stage outputs: it renders the stage prompt, makes one bounded
//! provider call, and returns the trimmed text. Session bookkeeping lives in
//! the command handlers.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use odyssey_core::clock::Clock;
use odyssey_core::error::DomainError;
use odyssey_core::provider::{
    CompletionOptions, CompletionProvider, CompletionRequest, ProviderError,
};
use tracing::{info, instrument, warn};

use crate::domain::parameters::CampaignParameters;
use crate::domain::progression::LevelProgression;
use crate::domain::prompts::{self, SYSTEM_INSTRUCTIONS};
use crate::domain::stages::{GenerationStage, StageFailure, StageKind, StageOutput};

/// Default bounded wait for a single provider call.
pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(120);

/// Generation options per stage plus the bounded wait.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageSettings {
    /// Options for the story outline.
    pub story: CompletionOptions,
    /// Options for the scene outline.
    pub scenes: CompletionOptions,
    /// Options for the level progression.
    pub levels: CompletionOptions,
    /// How long to wait for the provider before giving up.
    pub timeout: Duration,
}

impl Default for StageSettings {
    fn default() -> Self {
        Self {
            story: CompletionOptions {
                max_tokens: 1500,
                temperature: 0.8,
            },
            scenes: CompletionOptions {
                max_tokens: 3000,
                temperature: 0.8,
            },
            levels: CompletionOptions {
                max_tokens: 800,
                temperature: 0.8,
            },
            timeout: DEFAULT_STAGE_TIMEOUT,
        }
    }
}

impl StageSettings {
    /// The options used for `kind`.
    #[must_use]
    pub fn options_for(&self, kind: StageKind) -> CompletionOptions {
        match kind {
            StageKind::StoryOutline => self.story,
            StageKind::SceneOutline => self.scenes,
            StageKind::LevelProgression => self.levels,
        }
    }
}

/// Runs generation stages against a completion provider.
#[derive(Clone)]
pub struct Orchestrator {
    provider: Arc<dyn CompletionProvider>,
    settings: StageSettings,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("provider", &self.provider.name())
            .field("settings", &self.settings)
            .finish()
    }
}

impl Orchestrator {
    /// Creates an orchestrator over `provider`.
    #[must_use]
    pub fn new(provider: Arc<dyn CompletionProvider>, settings: StageSettings) -> Self {
        Self { provider, settings }
    }

    /// Name of the backing provider.
    #[must_use]
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Generates the high-level story outline.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Provider` if the call fails or times out and
    /// `DomainError::EmptyResponse` if the output is blank.
    pub async fn generate_story_outline(
        &self,
        params: &CampaignParameters,
    ) -> Result<String, DomainError> {
        let prompt = prompts::story_outline_prompt(params);
        self.complete(StageKind::StoryOutline, &prompt).await
    }

    /// Generates the scene-by-scene breakdown, embedding `story_outline` in
    /// the prompt.
    ///
    /// # Errors
    ///
    /// Same as [`Orchestrator::generate_story_outline`].
    pub async fn generate_scene_outline(
        &self,
        params: &CampaignParameters,
        story_outline: &str,
    ) -> Result<String, DomainError> {
        let prompt = prompts::scene_outline_prompt(params, story_outline);
        self.complete(StageKind::SceneOutline, &prompt).await
    }

    /// Generates the leveling schedule, embedding both earlier outputs in the
    /// prompt. Output that cannot be structured comes back as
    /// [`LevelProgression::RawText`], never as an error.
    ///
    /// # Errors
    ///
    /// Same as [`Orchestrator::generate_story_outline`].
    pub async fn generate_level_progression(
        &self,
        params: &CampaignParameters,
        story_outline: &str,
        scene_outline: &str,
    ) -> Result<LevelProgression, DomainError> {
        let prompt = prompts::level_progression_prompt(params, story_outline, scene_outline);
        let text = self.complete(StageKind::LevelProgression, &prompt).await?;
        Ok(LevelProgression::from_response(&text))
    }

    /// Runs one stage using `prior` as context and stamps the result with
    /// `clock`.
    ///
    /// # Errors
    ///
    /// Returns a `StageFailure` naming `kind`. A missing prior stage fails
    /// with `DomainError::MissingPriorStage` before any provider call.
    #[instrument(skip(self, params, prior, clock), fields(stage = %kind))]
    pub async fn run_stage(
        &self,
        kind: StageKind,
        params: &CampaignParameters,
        prior: &[GenerationStage],
        clock: &dyn Clock,
    ) -> Result<GenerationStage, StageFailure> {
        let fail = |error| StageFailure { stage: kind, error };

        let prompt = stage_prompt(kind, params, prior).map_err(fail)?;
        let text = self.complete(kind, &prompt).await.map_err(fail)?;
        let output = match kind {
            StageKind::LevelProgression => {
                StageOutput::Progression(LevelProgression::from_response(&text))
            }
            StageKind::StoryOutline | StageKind::SceneOutline => StageOutput::Text(text),
        };

        Ok(GenerationStage {
            kind,
            prompt,
            output,
            generated_at: clock.now(),
        })
    }

    async fn complete(&self, kind: StageKind, prompt: &str) -> Result<String, DomainError> {
        let request = CompletionRequest {
            system: SYSTEM_INSTRUCTIONS.to_owned(),
            prompt: prompt.to_owned(),
            options: self.settings.options_for(kind),
        };
        info!(
            stage = %kind,
            provider = self.provider.name(),
            max_tokens = request.options.max_tokens,
            "requesting stage"
        );

        let outcome = tokio::time::timeout(self.settings.timeout, self.provider.complete(&request))
            .await
            .unwrap_or_else(|_| Err(ProviderError::timed_out(self.settings.timeout)));
        let text = outcome.map_err(|err| {
            warn!(stage = %kind, kind = err.kind.as_str(), error = %err, "provider call failed");
            DomainError::from(err)
        })?;

        let text = text.trim();
        if text.is_empty() {
            warn!(stage = %kind, "provider returned blank output");
            return Err(DomainError::EmptyResponse);
        }
        info!(stage = %kind, chars = text.len(), "stage completed");
        Ok(text.to_owned())
    }
}

/// Renders the prompt for `kind`, pulling context from `prior`.
fn stage_prompt(
    kind: StageKind,
    params: &CampaignParameters,
    prior: &[GenerationStage],
) -> Result<String, DomainError> {
    let context = |needed: StageKind| {
        prior
            .iter()
            .find(|stage| stage.kind == needed)
            .map(GenerationStage::text)
            .ok_or(DomainError::MissingPriorStage {
                stage: kind.label(),
                requires: needed.label(),
            })
    };

    Ok(match kind {
        StageKind::StoryOutline => prompts::story_outline_prompt(params),
        StageKind::SceneOutline => {
            prompts::scene_outline_prompt(params, context(StageKind::StoryOutline)?)
        }
        StageKind::LevelProgression => prompts::level_progression_prompt(
            params,
            context(StageKind::StoryOutline)?,
            context(StageKind::SceneOutline)?,
        ),
    })
}
