//! Assembles collected material into prompt text by placeholder substitution.

use crate::box_score::{BoxScore, TeamLineScore};
use crate::comments::CommentRecord;

/// Neutral layout used when the operator supplies no template of their own.
/// Article instructions belong in an operator template.
pub const DEFAULT_TEMPLATE: &str = "Fan Quotes:
{fan_quotes}
Game Context:
{game_context}

Line Score:
{line_score}
Box Score:
{box_score}";

const PLACEHOLDERS: &[&str] = &["fan_quotes", "game_context", "line_score", "box_score"];

/// Material available to a template
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptSources<'a> {
    pub comments: &'a [CommentRecord],
    pub game_context: &'a str,
    pub box_score: Option<&'a BoxScore>,
}

/// One quote per line, attributed to its thread title
pub fn format_fan_quotes(comments: &[CommentRecord]) -> String {
    comments
        .iter()
        .map(|c| format!("\"{}\" (from \"{}\")\n", c.comment_text, c.thread_title))
        .collect()
}

pub fn format_line_score(rows: &[TeamLineScore]) -> String {
    rows.iter()
        .map(|r| format!("{}: {} (Q1-Q4: {})\n", r.team, r.total, r.quarters.join(", ")))
        .collect()
}

/// One line per player: `TEAM Player: PTS 31, TRB 11, ...`
pub fn format_box_score(box_score: &BoxScore) -> String {
    box_score
        .players
        .iter()
        .map(|row| {
            let stats: Vec<String> = row.stats.iter().map(|(k, v)| format!("{} {}", k, v)).collect();
            format!("{} {}: {}\n", row.team, row.player, stats.join(", "))
        })
        .collect()
}

/// Replaces `{fan_quotes}`, `{game_context}`, `{line_score}` and `{box_score}`.
/// Substitution is single-pass, so braces inside inserted text are left alone.
pub fn render_prompt(template: &str, sources: &PromptSources) -> String {
    let value_for = |name: &str| -> String {
        match name {
            "fan_quotes" => format_fan_quotes(sources.comments),
            "game_context" => sources.game_context.to_string(),
            "line_score" => sources.box_score.map(|b| format_line_score(&b.line_score)).unwrap_or_default(),
            "box_score" => sources.box_score.map(format_box_score).unwrap_or_default(),
            _ => String::new(),
        }
    };

    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];

        let matched = PLACEHOLDERS.iter().find(|name| {
            after.starts_with(*name) && after[name.len()..].starts_with('}')
        });

        match matched {
            Some(name) => {
                out.push_str(&value_for(name));
                rest = &after[name.len() + 1..];
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

// ============================================================================
// TESTS
// ============================================================================
