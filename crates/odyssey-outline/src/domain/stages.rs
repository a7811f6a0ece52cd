//! Generation stages and stage failures.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use odyssey_core::error::DomainError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::progression::LevelProgression;
use super::prompts;

/// One of the three sequential generation steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// High-level story arc.
    StoryOutline,
    /// Scene-by-scene breakdown with encounters.
    SceneOutline,
    /// Leveling schedule.
    LevelProgression,
}

impl StageKind {
    /// Every stage, in execution order.
    pub const ALL: [StageKind; 3] = [
        StageKind::StoryOutline,
        StageKind::SceneOutline,
        StageKind::LevelProgression,
    ];

    /// Zero-based position in execution order.
    #[must_use]
    pub fn position(self) -> usize {
        match self {
            StageKind::StoryOutline => 0,
            StageKind::SceneOutline => 1,
            StageKind::LevelProgression => 2,
        }
    }

    /// Wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StageKind::StoryOutline => "story_outline",
            StageKind::SceneOutline => "scene_outline",
            StageKind::LevelProgression => "level_progression",
        }
    }

    /// Section heading.
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            StageKind::StoryOutline => "Story Outline",
            StageKind::SceneOutline => "Scene Outline",
            StageKind::LevelProgression => "Level Progression",
        }
    }

    /// Lowercase name for messages.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            StageKind::StoryOutline => "story outline",
            StageKind::SceneOutline => "scene outline",
            StageKind::LevelProgression => "level progression",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for StageKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| DomainError::invalid("stage", format!("unknown stage `{s}`")))
    }
}

/// What a stage produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "content", rename_all = "snake_case")]
pub enum StageOutput {
    /// Formatted text (Markdown).
    Text(String),
    /// A leveling table, or its raw-text fallback.
    Progression(LevelProgression),
}

impl StageOutput {
    /// The provider text behind this output.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            StageOutput::Text(text) => text,
            StageOutput::Progression(progression) => progression.source_text(),
        }
    }
}

/// A completed stage. Never mutated once its provider call has returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationStage {
    /// Which stage this is.
    pub kind: StageKind,
    /// The rendered prompt that was sent.
    pub prompt: String,
    /// The result.
    pub output: StageOutput,
    /// When the provider answered.
    pub generated_at: DateTime<Utc>,
}

impl GenerationStage {
    /// The template the prompt was rendered from.
    #[must_use]
    pub fn template(&self) -> &'static str {
        prompts::template_for(self.kind)
    }

    /// The provider text, used as context by later stages.
    #[must_use]
    pub fn text(&self) -> &str {
        self.output.text()
    }
}

/// A stage that could not complete.
#[derive(Debug, Error)]
#[error("{stage} stage failed: {error}")]
pub struct StageFailure {
    /// The stage that failed.
    pub stage: StageKind,
    /// Why.
    #[source]
    pub error: DomainError,
}

/// A dismissable record of the last stage failure, kept on the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureNotice {
    /// The stage that failed.
    pub stage: StageKind,
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable message naming the stage and the cause.
    pub message: String,
    /// When it happened.
    pub occurred_at: DateTime<Utc>,
}

impl FailureNotice {
    /// Captures `failure` for display.
    #[must_use]
    pub fn new(failure: &StageFailure, occurred_at: DateTime<Utc>) -> Self {
        Self {
            stage: failure.stage,
            code: failure.error.code().to_owned(),
            message: failure.to_string(),
            occurred_at,
        }
    }
}
