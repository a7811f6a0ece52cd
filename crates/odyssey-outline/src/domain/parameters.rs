//! Campaign parameters: raw input and its validated form.

use std::fmt;

use odyssey_core::error::{DomainError, FieldViolation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Largest party the prompts are tuned for.
pub const MAX_PARTY_SIZE: u8 = 10;
/// Highest character level in the supported rulesets.
pub const MAX_LEVEL: u8 = 20;
/// Upper bound on the target session count.
pub const MAX_SESSION_COUNT: u8 = 20;
/// Maximum theme length, in characters.
pub const MAX_THEME_CHARS: usize = 500;
/// Maximum number of hard constraints.
pub const MAX_CONSTRAINTS: usize = 12;
/// Maximum length of one constraint, in characters.
pub const MAX_CONSTRAINT_CHARS: usize = 200;

/// Overall mood of the adventure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    /// Investigation and secrets.
    #[default]
    Mystery,
    /// Bright heroics.
    Heroic,
    /// Bleak and violent.
    Grimdark,
    /// Light and playful.
    Whimsical,
    /// Dread and terror.
    Horror,
    /// World-shaking stakes.
    Epic,
}

impl Tone {
    /// Every tone, in form order.
    pub const ALL: [Tone; 6] = [
        Tone::Mystery,
        Tone::Heroic,
        Tone::Grimdark,
        Tone::Whimsical,
        Tone::Horror,
        Tone::Epic,
    ];

    /// Wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Tone::Mystery => "mystery",
            Tone::Heroic => "heroic",
            Tone::Grimdark => "grimdark",
            Tone::Whimsical => "whimsical",
            Tone::Horror => "horror",
            Tone::Epic => "epic",
        }
    }

    /// Parses a wire name.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == value)
    }
}

/// Game system the content targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Ruleset {
    /// Fifth edition rules.
    #[default]
    #[serde(rename = "5e")]
    FifthEdition,
    /// No particular system; avoid edition-specific jargon.
    #[serde(rename = "system_agnostic")]
    SystemAgnostic,
}

impl Ruleset {
    /// Every ruleset, in form order.
    pub const ALL: [Ruleset; 2] = [Ruleset::FifthEdition, Ruleset::SystemAgnostic];

    /// Wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Ruleset::FifthEdition => "5e",
            Ruleset::SystemAgnostic => "system_agnostic",
        }
    }

    /// Parses a wire name.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == value)
    }
}

/// How the party gains levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelingMode {
    /// Level up after story milestones.
    #[default]
    Milestone,
    /// Level up on experience point totals.
    Xp,
}

impl LevelingMode {
    /// Every leveling mode, in form order.
    pub const ALL: [LevelingMode; 2] = [LevelingMode::Milestone, LevelingMode::Xp];

    /// Wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LevelingMode::Milestone => "milestone",
            LevelingMode::Xp => "xp",
        }
    }

    /// Parses a wire name.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == value)
    }
}

fn default_session_count() -> i64 {
    3
}

fn default_include_travel() -> bool {
    true
}

/// Unvalidated campaign input as submitted by the form or the JSON API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignRequest {
    /// Campaign theme or setting pitch.
    pub theme: String,
    /// Number of player characters.
    pub party_size: i64,
    /// Starting and ending character level.
    pub level_range: (i64, i64),
    /// Overall mood.
    #[serde(default)]
    pub tone: Tone,
    /// Target game system.
    #[serde(default)]
    pub ruleset: Ruleset,
    /// Milestone or XP leveling.
    #[serde(default)]
    pub leveling_mode: LevelingMode,
    /// Target number of play sessions.
    #[serde(default = "default_session_count")]
    pub session_count: i64,
    /// Hard constraints the content must honor.
    #[serde(default)]
    pub constraints: Vec<String>,
    /// Whether to include travel scenes.
    #[serde(default = "default_include_travel")]
    pub include_travel: bool,
}

impl CampaignRequest {
    /// A request with the given core fields and defaults for the rest.
    #[must_use]
    pub fn new(theme: impl Into<String>, party_size: i64, level_range: (i64, i64)) -> Self {
        Self {
            theme: theme.into(),
            party_size,
            level_range,
            tone: Tone::default(),
            ruleset: Ruleset::default(),
            leveling_mode: LevelingMode::default(),
            session_count: default_session_count(),
            constraints: Vec::new(),
            include_travel: default_include_travel(),
        }
    }
}

/// Inclusive character level range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LevelRange {
    /// Starting level.
    pub min: u8,
    /// Final level.
    pub max: u8,
}

impl fmt::Display for LevelRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min == self.max {
            write!(f, "level {}", self.min)
        } else {
            write!(f, "levels {} to {}", self.min, self.max)
        }
    }
}

/// Validated, immutable campaign parameters.
///
/// Only obtainable through `TryFrom<CampaignRequest>`, which checks every
/// field once at the submission boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignParameters {
    theme: String,
    party_size: u8,
    level_range: LevelRange,
    tone: Tone,
    ruleset: Ruleset,
    leveling_mode: LevelingMode,
    session_count: u8,
    constraints: Vec<String>,
    include_travel: bool,
}

impl CampaignParameters {
    /// Campaign theme or setting pitch, trimmed.
    #[must_use]
    pub fn theme(&self) -> &str {
        &self.theme
    }

    /// Number of player characters.
    #[must_use]
    pub fn party_size(&self) -> u8 {
        self.party_size
    }

    /// Starting and ending level.
    #[must_use]
    pub fn level_range(&self) -> LevelRange {
        self.level_range
    }

    /// Overall mood.
    #[must_use]
    pub fn tone(&self) -> Tone {
        self.tone
    }

    /// Target game system.
    #[must_use]
    pub fn ruleset(&self) -> Ruleset {
        self.ruleset
    }

    /// Milestone or XP leveling.
    #[must_use]
    pub fn leveling_mode(&self) -> LevelingMode {
        self.leveling_mode
    }

    /// Target number of play sessions.
    #[must_use]
    pub fn session_count(&self) -> u8 {
        self.session_count
    }

    /// Hard constraints, trimmed, blanks removed.
    #[must_use]
    pub fn constraints(&self) -> &[String] {
        &self.constraints
    }

    /// Whether travel scenes are wanted.
    #[must_use]
    pub fn include_travel(&self) -> bool {
        self.include_travel
    }

    /// SHA-256 over the canonical JSON form, hex encoded.
    ///
    /// Two sessions with equal fingerprints would send identical prompts.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        // Serialization of derived Serialize types to JSON is infallible.
        let canonical =
            serde_json::to_vec(self).expect("CampaignParameters serialization is infallible");
        format!("{:x}", Sha256::digest(&canonical))
    }
}

/// Checks `value` against `[min, max]`, recording a violation for `field`
/// when it falls outside. The returned value is only meaningful when no
/// violation was recorded.
fn bounded(
    value: i64,
    min: u8,
    max: u8,
    field: &str,
    violations: &mut Vec<FieldViolation>,
) -> Option<u8> {
    if value < i64::from(min) {
        violations.push(FieldViolation::new(field, format!("must be at least {min}")));
        return None;
    }
    if value > i64::from(max) {
        violations.push(FieldViolation::new(field, format!("must be at most {max}")));
        return None;
    }
    u8::try_from(value).ok()
}

impl TryFrom<CampaignRequest> for CampaignParameters {
    type Error = DomainError;

    fn try_from(request: CampaignRequest) -> Result<Self, Self::Error> {
        let mut violations = Vec::new();

        let theme = request.theme.trim().to_owned();
        if theme.is_empty() {
            violations.push(FieldViolation::new("theme", "must not be blank"));
        } else if theme.chars().count() > MAX_THEME_CHARS {
            violations.push(FieldViolation::new(
                "theme",
                format!("must be at most {MAX_THEME_CHARS} characters"),
            ));
        }

        let party_size = bounded(
            request.party_size,
            1,
            MAX_PARTY_SIZE,
            "party_size",
            &mut violations,
        );
        let (min, max) = request.level_range;
        let level_min = bounded(min, 1, MAX_LEVEL, "level_min", &mut violations);
        let level_max = bounded(max, 1, MAX_LEVEL, "level_max", &mut violations);
        if let (Some(lo), Some(hi)) = (level_min, level_max) {
            if lo > hi {
                violations.push(FieldViolation::new(
                    "level_range",
                    format!("starting level {lo} is above ending level {hi}"),
                ));
            }
        }
        let session_count = bounded(
            request.session_count,
            1,
            MAX_SESSION_COUNT,
            "session_count",
            &mut violations,
        );

        let constraints: Vec<String> = request
            .constraints
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .map(str::to_owned)
            .collect();
        if constraints.len() > MAX_CONSTRAINTS {
            violations.push(FieldViolation::new(
                "constraints",
                format!("at most {MAX_CONSTRAINTS} constraints are allowed"),
            ));
        }
        if constraints
            .iter()
            .any(|c| c.chars().count() > MAX_CONSTRAINT_CHARS)
        {
            violations.push(FieldViolation::new(
                "constraints",
                format!("each constraint must be at most {MAX_CONSTRAINT_CHARS} characters"),
            ));
        }

        match (party_size, level_min, level_max, session_count) {
            (Some(party_size), Some(min), Some(max), Some(session_count))
                if violations.is_empty() =>
            {
                Ok(Self {
                    theme,
                    party_size,
                    level_range: LevelRange { min, max },
                    tone: request.tone,
                    ruleset: request.ruleset,
                    leveling_mode: request.leveling_mode,
                    session_count,
                    constraints,
                    include_travel: request.include_travel,
                })
            }
            _ => Err(DomainError::Validation(violations)),
        }
    }
}
