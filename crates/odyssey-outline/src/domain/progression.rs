//! Level progression: structured milestone table or raw text fallback.

use std::sync::LazyLock;

use odyssey_core::error::DomainError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::parameters::MAX_LEVEL;

/// Matches `Level <N> at <milestone>`, tolerating list bullets, numbering,
/// bold markers, and "after"/"upon" in place of "at".
static LEVEL_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:[-*+•]\s+|\d+[.)]\s+)?[*_]*level\s+(\d+)[*_]*\s+(?:at|after|upon)\s+(.+?)\s*$",
    )
    .expect("level line pattern is valid")
});

/// One row of the leveling schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelMilestone {
    /// Where in the adventure the level is reached.
    pub milestone: String,
    /// Character level reached at the milestone.
    pub level: u8,
}

/// The level-progression stage output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum LevelProgression {
    /// Milestones extracted in source order, with the text they came from.
    Table {
        /// Parsed rows.
        milestones: Vec<LevelMilestone>,
        /// Provider text, unmodified.
        source: String,
    },
    /// The provider text could not be structured.
    RawText {
        /// Provider text, unmodified.
        text: String,
    },
}

impl LevelProgression {
    /// Structures `text` when possible and falls back to raw text otherwise.
    /// A parse failure is never an error for the caller.
    #[must_use]
    pub fn from_response(text: &str) -> Self {
        match parse_level_progression(text) {
            Ok(milestones) => Self::Table {
                milestones,
                source: text.to_owned(),
            },
            Err(err) => {
                warn!(error = %err, "level progression kept as raw text");
                Self::RawText {
                    text: text.to_owned(),
                }
            }
        }
    }

    /// Parsed rows, if the text was structured.
    #[must_use]
    pub fn milestones(&self) -> Option<&[LevelMilestone]> {
        match self {
            Self::Table { milestones, .. } => Some(milestones),
            Self::RawText { .. } => None,
        }
    }

    /// The provider text this progression was built from.
    #[must_use]
    pub fn source_text(&self) -> &str {
        match self {
            Self::Table { source, .. } => source,
            Self::RawText { text } => text,
        }
    }
}

/// Splits a milestone line into its level digits and milestone text.
fn level_line(line: &str) -> Option<(&str, &str)> {
    let caps = LEVEL_LINE.captures(line)?;
    let level = caps.get(1)?.as_str();
    let milestone = caps
        .get(2)?
        .as_str()
        .trim_matches(|c| c == '*' || c == '_')
        .trim();
    (!milestone.is_empty()).then_some((level, milestone))
}

/// The provider text with the milestone lines removed: headings, the
/// rationale paragraph, and any other prose around the list.
#[must_use]
pub fn commentary(text: &str) -> String {
    text.lines()
        .filter(|line| level_line(line).is_none())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_owned()
}

/// Extracts `(milestone, level)` pairs from lines shaped like
/// `Level <N> at <milestone>`, in input order. Lines that do not match are
/// skipped, so a heading or rationale paragraph around the list is fine.
///
/// # Errors
///
/// Returns `DomainError::Parse` if no line matches or a level falls outside
/// `1..=20`.
pub fn parse_level_progression(text: &str) -> Result<Vec<LevelMilestone>, DomainError> {
    let mut milestones = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let Some((raw_level, milestone)) = level_line(line) else {
            continue;
        };
        let level = raw_level
            .parse::<u8>()
            .ok()
            .filter(|level| (1..=MAX_LEVEL).contains(level))
            .ok_or_else(|| {
                DomainError::Parse(format!(
                    "line {}: level {raw_level} is outside 1-{MAX_LEVEL}",
                    index + 1,
                ))
            })?;
        milestones.push(LevelMilestone {
            milestone: milestone.to_owned(),
            level,
        });
    }

    if milestones.is_empty() {
        return Err(DomainError::Parse(
            "no \"Level N at <milestone>\" lines found".to_owned(),
        ));
    }
    Ok(milestones)
}
