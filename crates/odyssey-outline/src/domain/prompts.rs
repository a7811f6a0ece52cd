//! Prompt templates for the three generation stages.
//!
//! Templates use `{name}` placeholders filled in a single pass by
//! [`render`], so placeholder-like text inside substituted values (an
//! earlier stage's output, say) is copied through untouched.

use std::fmt::Write as _;

use super::parameters::{CampaignParameters, LevelingMode, Ruleset};
use super::stages::StageKind;

/// Standing instructions sent with every stage.
pub const SYSTEM_INSTRUCTIONS: &str = "\
You are a veteran tabletop RPG adventure designer.
Be concrete and playable: specific names, locations, motivations, and clear objectives.
Include both combat and non-combat encounters.
Create original material; never reproduce published setting text.
When the ruleset is system agnostic, avoid edition jargon such as challenge ratings and XP tables, but keep difficulty labels.
Answer in Markdown.";

/// Template for the high-level story outline.
pub const STORY_OUTLINE_TEMPLATE: &str = "\
Create a high-level story outline for a tabletop adventure.

Campaign brief:
{brief}

Include:
- a title and a one-line logline
- the central conflict and the antagonist
- at least two adventure hooks
- at least three key NPCs, each with a role, a public face, and a secret
- at least one faction with a goal, a method, and a complication
- {beat_count} story beats, each with its purpose, its stakes, and a twist or reveal
- a short list of continuity facts that must stay true in the detailed outline";

/// Template for the scene-by-scene breakdown.
pub const SCENE_OUTLINE_TEMPLATE: &str = "\
Expand the story outline below into a detailed scene-by-scene breakdown.

Campaign brief:
{brief}

Story outline:
<<<
{story_outline}
>>>

Requirements:
- Open with short structure notes covering pacing, continuity, and any changes the constraints forced.
- Create 5 to 9 scenes numbered S1, S2, and so on, and name the story beat each scene serves.
- For every scene give a title, estimated minutes (5 to 240), location, boxed read-aloud text, goal, obstacles, encounters, clues and info the players can learn, rewards, and consequences.
- Label every encounter as combat or non-combat (social, exploration, puzzle, or skill challenge) with a difficulty of easy, medium, hard, or deadly.
- Give every encounter its setup and scaling notes for stronger or weaker parties.
- Include at least one combat encounter and at least one non-combat encounter.
- Give every encounter a win condition and a fail-forward outcome so the adventure never dead-ends.
- Keep every name, faction, and continuity fact from the story outline unchanged.
- Size the scenes for roughly {session_count} play sessions of 30 to 75 minutes per scene.
- Close with optional side quests and a few recap questions the GM can ask at the start of each session.";

/// Template for the leveling schedule.
pub const LEVEL_PROGRESSION_TEMPLATE: &str = "\
Plan character level progression for the adventure below.

Campaign brief:
{brief}

Story outline:
<<<
{story_outline}
>>>

Scene outline:
<<<
{scene_outline}
>>>

The party starts at level {level_min} and must finish at level {level_max}. {leveling_rule}
Write one line per level, in scene order, formatted exactly as:
Level <number> at <milestone>
where the milestone names the scene, for example \"Level 2 at S3: the party escapes the drowned crypt\".
Begin with level {level_min} at the opening scene. You may add a short rationale paragraph after the list.";

/// Returns the template a stage is rendered from.
#[must_use]
pub fn template_for(kind: StageKind) -> &'static str {
    match kind {
        StageKind::StoryOutline => STORY_OUTLINE_TEMPLATE,
        StageKind::SceneOutline => SCENE_OUTLINE_TEMPLATE,
        StageKind::LevelProgression => LEVEL_PROGRESSION_TEMPLATE,
    }
}

/// Fills `{name}` placeholders from `vars` in one left-to-right pass.
/// Unknown placeholders and stray braces are kept literally.
#[must_use]
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after
            .find('}')
            .and_then(|close| {
                let name = &after[..close];
                vars.iter()
                    .find(|(key, _)| *key == name)
                    .map(|(_, value)| (*value, close))
            });
        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Bullet list describing the campaign parameters.
#[must_use]
pub fn campaign_brief(params: &CampaignParameters) -> String {
    let mut brief = String::new();
    let _ = writeln!(brief, "- Theme and setting: {}", params.theme());
    let _ = writeln!(
        brief,
        "- Party: {} characters, {}",
        params.party_size(),
        params.level_range()
    );
    let _ = writeln!(brief, "- Tone: {}", params.tone().as_str());
    let ruleset = match params.ruleset() {
        Ruleset::FifthEdition => "fifth edition",
        Ruleset::SystemAgnostic => "system agnostic",
    };
    let _ = writeln!(brief, "- Ruleset: {ruleset}");
    let leveling = match params.leveling_mode() {
        LevelingMode::Milestone => "milestone",
        LevelingMode::Xp => "experience points",
    };
    let _ = writeln!(brief, "- Leveling: {leveling}");
    let _ = writeln!(brief, "- Target sessions: {}", params.session_count());
    let travel = if params.include_travel() {
        "include travel scenes"
    } else {
        "skip travel scenes"
    };
    let _ = write!(brief, "- Travel: {travel}");
    if !params.constraints().is_empty() {
        brief.push_str("\n- Hard constraints:");
        for constraint in params.constraints() {
            let _ = write!(brief, "\n  - {constraint}");
        }
    }
    brief
}

/// Prompt for the story outline stage.
#[must_use]
pub fn story_outline_prompt(params: &CampaignParameters) -> String {
    let brief = campaign_brief(params);
    let beat_count = (params.session_count() + 4).clamp(5, 9).to_string();
    render(
        STORY_OUTLINE_TEMPLATE,
        &[("brief", brief.as_str()), ("beat_count", beat_count.as_str())],
    )
}

/// Prompt for the scene outline stage. Embeds `story_outline` verbatim.
#[must_use]
pub fn scene_outline_prompt(params: &CampaignParameters, story_outline: &str) -> String {
    let brief = campaign_brief(params);
    let session_count = params.session_count().to_string();
    render(
        SCENE_OUTLINE_TEMPLATE,
        &[
            ("brief", brief.as_str()),
            ("story_outline", story_outline),
            ("session_count", session_count.as_str()),
        ],
    )
}

/// Prompt for the level progression stage. Embeds both earlier outputs
/// verbatim.
#[must_use]
pub fn level_progression_prompt(
    params: &CampaignParameters,
    story_outline: &str,
    scene_outline: &str,
) -> String {
    let brief = campaign_brief(params);
    let range = params.level_range();
    let level_min = range.min.to_string();
    let level_max = range.max.to_string();
    let leveling_rule = match params.leveling_mode() {
        LevelingMode::Milestone => "Place each level-up after a key scene.",
        LevelingMode::Xp => {
            "Mention the XP total the party should have reached in each milestone."
        }
    };
    render(
        LEVEL_PROGRESSION_TEMPLATE,
        &[
            ("brief", brief.as_str()),
            ("story_outline", story_outline),
            ("scene_outline", scene_outline),
            ("level_min", level_min.as_str()),
            ("level_max", level_max.as_str()),
            ("leveling_rule", leveling_rule),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::parameters::CampaignRequest;

    fn params() -> CampaignParameters {
        let mut request = CampaignRequest::new("haunted lighthouse", 4, (1, 3));
        request.constraints = vec!["no undead dragons".to_owned()];
        CampaignParameters::try_from(request).unwrap()
    }

    #[test]
    fn test_render_fills_known_placeholders() {
        let out = render("Hello {who}, level {n}.", &[("who", "party"), ("n", "3")]);

        assert_eq!(out, "Hello party, level 3.");
    }

    #[test]
    fn test_render_keeps_unknown_placeholders_and_stray_braces() {
        let out = render("{missing} and { and }", &[("other", "x")]);

        assert_eq!(out, "{missing} and { and }");
    }

    #[test]
    fn test_render_does_not_expand_placeholders_inside_values() {
        let out = render(
            "A: {a} B: {b}",
            &[("a", "literal {b} text"), ("b", "second")],
        );

        assert_eq!(out, "A: literal {b} text B: second");
    }

    #[test]
    fn test_story_prompt_embeds_every_parameter() {
        let prompt = story_outline_prompt(&params());

        assert!(prompt.contains("- Theme and setting: haunted lighthouse"));
        assert!(prompt.contains("- Party: 4 characters, levels 1 to 3"));
        assert!(prompt.contains("- Tone: mystery"));
        assert!(prompt.contains("  - no undead dragons"));
        assert!(prompt.contains("7 story beats"));
        assert!(!prompt.contains('{'));
    }

    #[test]
    fn test_scene_prompt_contains_story_outline_verbatim() {
        // Arrange
        let story = "# The Drowned Lamp\n\nThe keeper {lies} about the storm.\n";

        // Act
        let prompt = scene_outline_prompt(&params(), story);

        // Assert
        assert!(prompt.contains(story));
        assert!(prompt.contains("combat encounter"));
        assert!(prompt.contains("non-combat"));
    }

    #[test]
    fn test_scene_prompt_asks_for_full_scene_detail() {
        // Arrange / Act
        let prompt = scene_outline_prompt(&params(), "STORY TEXT");

        // Assert
        for expected in [
            "structure notes",
            "estimated minutes (5 to 240)",
            "boxed read-aloud text",
            "clues and info",
            "rewards",
            "consequences",
            "setup and scaling notes",
            "win condition",
            "fail-forward",
            "optional side quests",
            "recap questions",
        ] {
            assert!(prompt.contains(expected), "missing {expected:?}");
        }
    }

    #[test]
    fn test_level_prompt_contains_both_outlines_and_the_line_format() {
        let prompt = level_progression_prompt(&params(), "STORY TEXT", "SCENE TEXT");

        assert!(prompt.contains("STORY TEXT"));
        assert!(prompt.contains("SCENE TEXT"));
        assert!(prompt.contains("Level <number> at <milestone>"));
        assert!(prompt.contains("starts at level 1 and must finish at level 3"));
    }

    #[test]
    fn test_every_stage_has_a_template() {
        for kind in StageKind::ALL {
            assert!(!template_for(kind).is_empty());
        }
    }
}
