//! Server-side HTML for the campaign form and the generated sections.

use std::fmt::Write as _;

use odyssey_core::error::FieldViolation;
use odyssey_outline::application::query_handlers::{CampaignSessionView, StageView};
use odyssey_outline::domain::parameters::{LevelingMode, Ruleset, Tone};
use odyssey_outline::domain::progression::{self, LevelMilestone};
use odyssey_outline::domain::stages::FailureNotice;
use pulldown_cmark::{Event, Options, Parser, html};

use crate::form::CampaignForm;

const STYLE: &str = "\
body{font-family:system-ui,sans-serif;max-width:56rem;margin:2rem auto;padding:0 1rem;line-height:1.5}
label{display:block;margin-top:.75rem;font-weight:600}
input,select,textarea{width:100%;padding:.35rem;font:inherit}
input[type=checkbox]{width:auto}
.field-error{color:#a40000;margin:.2rem 0 0}
.banner{border:1px solid #a40000;background:#fff0f0;padding:.75rem 1rem;margin:1rem 0}
.banner form{display:inline}
section.stage{border-top:1px solid #ccc;margin-top:2rem}
table{border-collapse:collapse}
td,th{border:1px solid #ccc;padding:.3rem .6rem;text-align:left}
.actions form{display:inline;margin-right:.5rem}";

/// Everything the page shows.
#[derive(Debug, Clone, Copy)]
pub struct PageModel<'a> {
    /// Values to refill the form with.
    pub form: &'a CampaignForm,
    /// Inline field errors.
    pub violations: &'a [FieldViolation],
    /// The session to show results for.
    pub session: Option<&'a CampaignSessionView>,
    /// A request-level error that is not tied to a session.
    pub notice: Option<&'a str>,
}

/// Escapes text for HTML element content and quoted attribute values.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Renders Markdown from the model. Raw HTML in the input is shown as text.
#[must_use]
pub fn markdown_to_html(markdown: &str) -> String {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
    let events = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, events);
    out
}

fn tone_label(tone: Tone) -> &'static str {
    match tone {
        Tone::Mystery => "Mystery",
        Tone::Heroic => "Heroic",
        Tone::Grimdark => "Grimdark",
        Tone::Whimsical => "Whimsical",
        Tone::Horror => "Horror",
        Tone::Epic => "Epic",
    }
}

fn ruleset_label(ruleset: Ruleset) -> &'static str {
    match ruleset {
        Ruleset::FifthEdition => "D&D 5e",
        Ruleset::SystemAgnostic => "System agnostic",
    }
}

fn leveling_label(mode: LevelingMode) -> &'static str {
    match mode {
        LevelingMode::Milestone => "Milestone",
        LevelingMode::Xp => "Experience points",
    }
}

fn field_errors(out: &mut String, violations: &[FieldViolation], fields: &[&str]) {
    for violation in violations
        .iter()
        .filter(|v| fields.contains(&v.field.as_str()))
    {
        let _ = write!(
            out,
            "<p class=\"field-error\" data-field=\"{}\">{}</p>",
            escape_html(&violation.field),
            escape_html(&violation.message)
        );
    }
}

fn text_input(out: &mut String, name: &str, label: &str, kind: &str, value: &str) {
    let _ = write!(
        out,
        "<label for=\"{name}\">{label}</label>\
         <input id=\"{name}\" name=\"{name}\" type=\"{kind}\" value=\"{}\">",
        escape_html(value)
    );
}

fn select<T: Copy>(
    out: &mut String,
    name: &str,
    label: &str,
    selected: &str,
    options: &[T],
    wire: fn(T) -> &'static str,
    display: fn(T) -> &'static str,
) {
    let _ = write!(out, "<label for=\"{name}\">{label}</label><select id=\"{name}\" name=\"{name}\">");
    for &option in options {
        let value = wire(option);
        let marker = if value == selected { " selected" } else { "" };
        let _ = write!(out, "<option value=\"{value}\"{marker}>{}</option>", display(option));
    }
    out.push_str("</select>");
}

fn render_form(out: &mut String, form: &CampaignForm, violations: &[FieldViolation]) {
    out.push_str("<form method=\"post\" action=\"/generate\" id=\"campaign-form\">");
    let _ = write!(
        out,
        "<input type=\"hidden\" name=\"session_id\" value=\"{}\">",
        escape_html(&form.session_id)
    );

    let _ = write!(
        out,
        "<label for=\"theme\">Campaign theme / setting</label>\
         <textarea id=\"theme\" name=\"theme\" rows=\"3\">{}</textarea>",
        escape_html(&form.theme)
    );
    field_errors(out, violations, &["theme"]);

    text_input(out, "party_size", "Party size", "number", &form.party_size);
    field_errors(out, violations, &["party_size"]);
    text_input(out, "level_min", "Starting level", "number", &form.level_min);
    field_errors(out, violations, &["level_min"]);
    text_input(out, "level_max", "Ending level", "number", &form.level_max);
    field_errors(out, violations, &["level_max", "level_range"]);

    select(out, "tone", "Tone", &form.tone, &Tone::ALL, Tone::as_str, tone_label);
    field_errors(out, violations, &["tone"]);
    select(
        out,
        "ruleset",
        "Ruleset",
        &form.ruleset,
        &Ruleset::ALL,
        Ruleset::as_str,
        ruleset_label,
    );
    field_errors(out, violations, &["ruleset"]);
    select(
        out,
        "leveling_mode",
        "Leveling",
        &form.leveling_mode,
        &LevelingMode::ALL,
        LevelingMode::as_str,
        leveling_label,
    );
    field_errors(out, violations, &["leveling_mode"]);

    text_input(out, "session_count", "Target sessions", "number", &form.session_count);
    field_errors(out, violations, &["session_count"]);

    let _ = write!(
        out,
        "<label for=\"constraints\">Hard constraints (one per line)</label>\
         <textarea id=\"constraints\" name=\"constraints\" rows=\"3\">{}</textarea>",
        escape_html(&form.constraints)
    );
    field_errors(out, violations, &["constraints"]);

    let checked = if form.include_travel() { " checked" } else { "" };
    let _ = write!(
        out,
        "<label><input type=\"checkbox\" name=\"include_travel\" value=\"on\"{checked}> \
         Include travel scenes</label>"
    );
    field_errors(out, violations, &["parameters"]);

    out.push_str("<p><button type=\"submit\">Generate campaign</button></p></form>");
}

fn render_failure(out: &mut String, session_id: &str, failure: &FailureNotice) {
    let _ = write!(
        out,
        "<div class=\"banner\" role=\"alert\" id=\"failure\">\
         <p>{message}</p>\
         <form method=\"post\" action=\"/sessions/{session_id}/retry/{stage}\">\
         <button type=\"submit\">Retry {title}</button></form> \
         <form method=\"post\" action=\"/sessions/{session_id}/dismiss\">\
         <button type=\"submit\">Dismiss</button></form></div>",
        message = escape_html(&failure.message),
        stage = failure.stage.as_str(),
        title = failure.stage.title(),
    );
}

fn render_milestones(out: &mut String, milestones: &[LevelMilestone]) {
    out.push_str("<table><thead><tr><th>Milestone</th><th>Level</th></tr></thead><tbody>");
    for row in milestones {
        let _ = write!(
            out,
            "<tr><td>{}</td><td>{}</td></tr>",
            escape_html(&row.milestone),
            row.level
        );
    }
    out.push_str("</tbody></table>");
}

fn render_stage(out: &mut String, session_id: &str, stage: &StageView) {
    let _ = write!(
        out,
        "<section class=\"stage\" id=\"{id}\"><h2>{title}</h2>",
        id = stage.stage.as_str(),
        title = stage.title,
    );
    match &stage.milestones {
        Some(milestones) => {
            render_milestones(out, milestones);
            let rest = progression::commentary(&stage.content);
            if !rest.is_empty() {
                out.push_str(&markdown_to_html(&rest));
            }
        }
        None => out.push_str(&markdown_to_html(&stage.content)),
    }
    let _ = write!(
        out,
        "<form method=\"post\" action=\"/sessions/{session_id}/retry/{stage}\">\
         <button type=\"submit\">Regenerate {title}</button></form></section>",
        stage = stage.stage.as_str(),
        title = stage.title,
    );
}

fn render_results(out: &mut String, session: &CampaignSessionView) {
    let id = session.session_id.to_string();
    for stage in &session.stages {
        render_stage(out, &id, stage);
    }
    if session.stages.is_empty() {
        return;
    }
    let _ = write!(
        out,
        "<div class=\"actions\">\
         <a href=\"/api/v1/sessions/{id}/export\" download=\"campaign.json\">Download full JSON</a> \
         <a href=\"/api/v1/sessions/{id}/export/story\" download=\"story_outline.json\">Download outline only</a> \
         <form method=\"post\" action=\"/sessions/{id}/clear\">\
         <button type=\"submit\">Clear results</button></form></div>"
    );
}

/// Renders the full page.
#[must_use]
pub fn page(model: &PageModel<'_>) -> String {
    let mut out = String::with_capacity(8 * 1024);
    let _ = write!(
        out,
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\">\
         <title>OdysseyMaker</title><style>{STYLE}</style></head><body>\
         <h1>OdysseyMaker</h1>\
         <p>Story outline, scene breakdown, and level progression for your next adventure.</p>"
    );

    if let Some(notice) = model.notice {
        let _ = write!(
            out,
            "<div class=\"banner\" role=\"alert\" id=\"notice\"><p>{}</p></div>",
            escape_html(notice)
        );
    }
    if let Some(session) = model.session {
        if let Some(failure) = &session.failure {
            render_failure(&mut out, &session.session_id.to_string(), failure);
        }
    }

    render_form(&mut out, model.form, model.violations);

    if let Some(session) = model.session {
        render_results(&mut out, session);
    }

    out.push_str("</body></html>");
    out
}
