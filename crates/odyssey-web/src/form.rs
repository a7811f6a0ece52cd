//! The campaign form as submitted by the browser.

use odyssey_core::error::FieldViolation;
use odyssey_outline::domain::parameters::{
    CampaignParameters, CampaignRequest, LevelingMode, Ruleset, Tone,
};
use serde::Deserialize;
use uuid::Uuid;

/// Raw urlencoded form fields. Everything arrives as text so a bad number
/// becomes an inline error instead of a rejected request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CampaignForm {
    /// Session to continue, carried in a hidden field.
    pub session_id: String,
    /// Campaign theme or setting pitch.
    pub theme: String,
    /// Number of player characters.
    pub party_size: String,
    /// Starting level.
    pub level_min: String,
    /// Ending level.
    pub level_max: String,
    /// Tone wire name.
    pub tone: String,
    /// Ruleset wire name.
    pub ruleset: String,
    /// Leveling mode wire name.
    pub leveling_mode: String,
    /// Target number of sessions.
    pub session_count: String,
    /// One constraint per line.
    pub constraints: String,
    /// Checkbox; present when checked. Browsers omit unchecked boxes, so a
    /// missing field means `None` rather than the form default.
    #[serde(default)]
    pub include_travel: Option<String>,
}

impl Default for CampaignForm {
    fn default() -> Self {
        Self {
            session_id: String::new(),
            theme: String::new(),
            party_size: "4".to_owned(),
            level_min: "1".to_owned(),
            level_max: "3".to_owned(),
            tone: Tone::default().as_str().to_owned(),
            ruleset: Ruleset::default().as_str().to_owned(),
            leveling_mode: LevelingMode::default().as_str().to_owned(),
            session_count: "3".to_owned(),
            constraints: String::new(),
            include_travel: Some("on".to_owned()),
        }
    }
}

fn whole_number(field: &str, raw: &str, violations: &mut Vec<FieldViolation>) -> i64 {
    raw.trim().parse().unwrap_or_else(|_| {
        violations.push(FieldViolation::new(field, "must be a whole number"));
        0
    })
}

fn choice<T>(
    field: &str,
    raw: &str,
    parse: fn(&str) -> Option<T>,
    violations: &mut Vec<FieldViolation>,
) -> Option<T> {
    let value = parse(raw.trim());
    if value.is_none() {
        violations.push(FieldViolation::new(field, format!("unknown option `{raw}`")));
    }
    value
}

impl CampaignForm {
    /// Refills the form from previously submitted parameters.
    #[must_use]
    pub fn from_parameters(session_id: Uuid, params: &CampaignParameters) -> Self {
        let range = params.level_range();
        Self {
            session_id: session_id.to_string(),
            theme: params.theme().to_owned(),
            party_size: params.party_size().to_string(),
            level_min: range.min.to_string(),
            level_max: range.max.to_string(),
            tone: params.tone().as_str().to_owned(),
            ruleset: params.ruleset().as_str().to_owned(),
            leveling_mode: params.leveling_mode().as_str().to_owned(),
            session_count: params.session_count().to_string(),
            constraints: params.constraints().join("\n"),
            include_travel: params.include_travel().then(|| "on".to_owned()),
        }
    }

    /// The session named in the hidden field, if it is a valid ID.
    #[must_use]
    pub fn session_id(&self) -> Option<Uuid> {
        Uuid::parse_str(self.session_id.trim()).ok()
    }

    /// Whether the travel checkbox is ticked.
    #[must_use]
    pub fn include_travel(&self) -> bool {
        self.include_travel.is_some()
    }

    /// Converts the text fields into a request. Domain rules (ranges,
    /// lengths) are checked later by `CampaignParameters`.
    ///
    /// # Errors
    ///
    /// Returns every field that is not a number or not a known option.
    pub fn to_request(&self) -> Result<CampaignRequest, Vec<FieldViolation>> {
        let mut violations = Vec::new();

        let party_size = whole_number("party_size", &self.party_size, &mut violations);
        let level_min = whole_number("level_min", &self.level_min, &mut violations);
        let level_max = whole_number("level_max", &self.level_max, &mut violations);
        let session_count = whole_number("session_count", &self.session_count, &mut violations);
        let tone = choice("tone", &self.tone, Tone::parse, &mut violations);
        let ruleset = choice("ruleset", &self.ruleset, Ruleset::parse, &mut violations);
        let leveling_mode = choice(
            "leveling_mode",
            &self.leveling_mode,
            LevelingMode::parse,
            &mut violations,
        );

        match (tone, ruleset, leveling_mode) {
            (Some(tone), Some(ruleset), Some(leveling_mode)) if violations.is_empty() => {
                Ok(CampaignRequest {
                    theme: self.theme.clone(),
                    party_size,
                    level_range: (level_min, level_max),
                    tone,
                    ruleset,
                    leveling_mode,
                    session_count,
                    constraints: self
                        .constraints
                        .lines()
                        .map(str::trim)
                        .filter(|line| !line.is_empty())
                        .map(str::to_owned)
                        .collect(),
                    include_travel: self.include_travel(),
                })
            }
            _ => Err(violations),
        }
    }
}
