//! Canonical text for new blocks and rewritten head lines.

use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, UtcOffset};

use crate::status::StatusToken;
use crate::tags::format_tags;

/// Structured input for a new block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftEntry {
    /// Head text after the status and tags.
    pub description: String,
    /// Tag names rendered as `[[name]]` markup on the head line.
    pub tags: Vec<String>,
    /// Free text placed under the head, indented by two spaces.
    pub body: Option<String>,
    /// Present for tasks.
    pub status: Option<StatusToken>,
    /// Rendered as `DEADLINE: <..>` (tasks only).
    pub deadline: Option<String>,
    /// Rendered as `SCHEDULED: <..>` (tasks only).
    pub scheduled: Option<String>,
}

/// Reasons a draft cannot be rendered.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DraftError {
    /// Description was empty after trimming.
    #[error("description required")]
    MissingDescription,
    /// Deadline or scheduled date given without a status.
    #[error("deadline and scheduled require a status")]
    TimestampWithoutStatus,
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.trim().is_empty())
}

impl DraftEntry {
    /// Render the block text (no trailing newline).
    ///
    /// RFC 3339 timestamps are shown in `offset`.
    ///
    /// # Errors
    /// Returns [`DraftError`] when the draft is incomplete or contradictory.
    pub fn render(&self, offset: UtcOffset) -> Result<String, DraftError> {
        let description = self.description.trim();
        if description.is_empty() {
            return Err(DraftError::MissingDescription);
        }
        let deadline = non_blank(self.deadline.as_ref());
        let scheduled = non_blank(self.scheduled.as_ref());

        let mut head = String::from("- ");
        if let Some(status) = self.status {
            head.push_str(status.as_str());
            head.push(' ');
        } else if deadline.is_some() || scheduled.is_some() {
            return Err(DraftError::TimestampWithoutStatus);
        }
        let tag_text = format_tags(&self.tags);
        if !tag_text.is_empty() {
            head.push_str(&tag_text);
            head.push(' ');
        }
        head.push_str(description);

        let mut lines = vec![head];
        if let Some(deadline) = deadline {
            lines.push(format!("  DEADLINE: {}", format_timestamp(deadline, offset)));
        }
        if let Some(scheduled) = scheduled {
            lines.push(format!("  SCHEDULED: {}", format_timestamp(scheduled, offset)));
        }
        if let Some(body) = non_blank(self.body.as_ref()) {
            lines.extend(body.split('\n').map(|line| format!("  {line}")));
        }
        Ok(lines.join("\n"))
    }
}

/// Render a timestamp value as `<...>` markup.
///
/// Already bracketed values pass through; RFC 3339 date-times become
/// `YYYY-MM-DD Ddd HH:MM` in `offset`; ISO dates become `YYYY-MM-DD Ddd`;
/// anything else is wrapped verbatim.
#[must_use]
pub fn format_timestamp(value: &str, offset: UtcOffset) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.starts_with('<') && trimmed.ends_with('>') {
        return trimmed.to_owned();
    }
    let formatted = OffsetDateTime::parse(trimmed, &Rfc3339)
        .ok()
        .and_then(|ts| {
            ts.to_offset(offset)
                .format(format_description!(
                    "[year]-[month]-[day] [weekday repr:short] [hour]:[minute]"
                ))
                .ok()
        })
        .or_else(|| {
            Date::parse(trimmed, format_description!("[year]-[month]-[day]"))
                .ok()
                .and_then(|date| {
                    date.format(format_description!("[year]-[month]-[day] [weekday repr:short]"))
                        .ok()
                })
        });
    format!("<{}>", formatted.as_deref().unwrap_or(trimmed))
}

/// Head line for a status change: `- STATUS [[tags]] title`.
#[must_use]
pub fn status_head_line<S: AsRef<str>>(status: StatusToken, tags: &[S], title: &str) -> String {
    let tag_text = format_tags(tags);
    let mut line = format!("- {status} ");
    if !tag_text.is_empty() {
        line.push_str(&tag_text);
        line.push(' ');
    }
    line.push_str(title);
    line
}
