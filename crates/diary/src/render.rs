//! Message rendering.
//!
//! Everything here is pure: the current time is passed in, so rendering the
//! same snapshot twice yields identical output.

use chrono::{DateTime, Duration, FixedOffset, Offset, Utc};
use diary_notify::{Block, BlockElement, MessageContent};

use crate::model::{
    AckAction, AlertEvent, AlertSource, Incident, STATUS_ACKNOWLEDGED, STATUS_CLOSED, STATUS_OPEN,
};

/// Side-bar color of open incidents.
pub const COLOR_OPEN: &str = "#E01E5A";

/// Side-bar color of every other state.
pub const COLOR_RESOLVED: &str = "#2EB67D";

/// Incidents are displayed at a fixed UTC+7 offset.
const DISPLAY_OFFSET_SECS: i32 = 7 * 3600;

const TIMESTAMP_FORMAT: &str = "%a, %d %b %Y %H:%M:%S";

/// Rendered title, side-bar color and body of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub title: String,
    pub color: &'static str,
    pub body: String,
    /// Target of the title link
    pub url: String,
}

impl RenderedMessage {
    /// Title line followed by the body.
    #[must_use]
    pub fn text(&self) -> String {
        format!("{}\n{}", self.title, self.body)
    }
}

/// Message title: `"[<generated_by>:<tag>:] <name>"` followed by a line break.
#[must_use]
pub fn title(generated_by: &str, tag: &str, name: &str) -> String {
    format!("[{generated_by}:{tag}:] {name}\n")
}

/// Side-bar color for a status. Only "open" is red.
#[must_use]
pub fn color(status: &str) -> &'static str {
    if status == STATUS_OPEN {
        COLOR_OPEN
    } else {
        COLOR_RESOLVED
    }
}

/// Format an elapsed duration as `"1h 2m 5s"`, leaving out zero units.
#[must_use]
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.num_seconds().max(0);
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let remaining_secs = secs % 60;

    let parts: Vec<String> = [(hours, "h"), (mins, "m"), (remaining_secs, "s")]
        .into_iter()
        .filter(|(value, _)| *value > 0)
        .map(|(value, unit)| format!("{value}{unit}"))
        .collect();

    if parts.is_empty() {
        "0s".to_string()
    } else {
        parts.join(" ")
    }
}

fn display_offset() -> FixedOffset {
    FixedOffset::east_opt(DISPLAY_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Human-readable calendar timestamp in the display timezone.
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.with_timezone(&display_offset())
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

/// Time-to-resolve line between `start` and `resolved`.
#[must_use]
pub fn time_to_resolve(start: DateTime<Utc>, resolved: DateTime<Utc>) -> String {
    let offset = display_offset();
    let start = start.with_timezone(&offset);
    let resolved = resolved.with_timezone(&offset);

    format!(
        "*Time to Resolve :* {} (resolved at {})",
        format_elapsed(resolved - start),
        resolved.format(TIMESTAMP_FORMAT)
    )
}

fn join_sections(sections: &[&str]) -> String {
    sections
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Full summary shown in the root message of an incident.
///
/// The time to resolve is only shown once the incident is closed.
#[must_use]
pub fn incident_message(incident: &Incident, now: DateTime<Utc>) -> RenderedMessage {
    let ttr = if incident.status == STATUS_CLOSED {
        time_to_resolve(incident.start_time, incident.recover_time.unwrap_or(now))
    } else {
        String::new()
    };

    let status = format!("*Status :* {}", incident.status);
    let started = format!("*Incident Time :* {}", format_timestamp(incident.start_time));
    let body = join_sections(&[
        status.as_str(),
        started.as_str(),
        ttr.as_str(),
        incident.description.as_str(),
    ]);

    RenderedMessage {
        title: title(&incident.generated_by, &incident.severity, &incident.name)
            .trim_end()
            .to_string(),
        color: color(&incident.status),
        body,
        url: incident.url.clone(),
    }
}

/// Terse summary of a single event, posted as a threaded reply.
///
/// Unlike [`incident_message`], the time to resolve is shown for closed
/// events, and for acknowledged events whose start time is known.
#[must_use]
pub fn event_summary(
    event: &AlertEvent,
    incident: Option<&Incident>,
    now: DateTime<Utc>,
) -> RenderedMessage {
    let start = event.start_time.or_else(|| incident.map(|i| i.start_time));
    let resolved = incident.and_then(|i| i.recover_time).unwrap_or(now);

    let ttr = match start {
        Some(start) if event.state == STATUS_CLOSED || event.state == STATUS_ACKNOWLEDGED => {
            time_to_resolve(start, resolved)
        }
        _ => String::new(),
    };

    let status = format!("*Status :* {}", event.state);
    let body = join_sections(&[status.as_str(), ttr.as_str(), event.description.as_str()]);

    RenderedMessage {
        title: title(&event.generated_by, &event.severity, &event.name)
            .trim_end()
            .to_string(),
        color: color(&event.state),
        body,
        url: event.url.clone(),
    }
}

/// Acknowledgment note appended below an acknowledged message.
#[must_use]
pub fn ack_note(user: &str, value: &str) -> String {
    format!("*Action :* \nThe user `{user}` has *acknowledged* with `{value}`")
}

/// Root message content; New Relic incidents get the acknowledgment buttons.
#[must_use]
pub fn root_message(rendered: &RenderedMessage, source: AlertSource) -> MessageContent {
    let mut blocks = vec![Block::section(&rendered.body)];
    if source.offers_acknowledgment() {
        blocks.push(Block::Actions {
            elements: vec![
                BlockElement::button(AckAction::OpenReasonForm.action_id(), "Acknowledge", ""),
                BlockElement::button(
                    AckAction::Ignore.action_id(),
                    "Ignore",
                    AckAction::IGNORE_VALUE,
                ),
            ],
        });
    }

    MessageContent::new(&rendered.title, &rendered.url, rendered.color, blocks)
}

/// Threaded reply content.
#[must_use]
pub fn thread_reply(rendered: &RenderedMessage) -> MessageContent {
    MessageContent::new(
        &rendered.title,
        &rendered.url,
        rendered.color,
        vec![Block::section(&rendered.body)],
    )
}

/// Replacement content once a user acknowledged the incident.
#[must_use]
pub fn acknowledged_message(rendered: &RenderedMessage, user: &str, value: &str) -> MessageContent {
    MessageContent::new(
        &rendered.title,
        &rendered.url,
        rendered.color,
        vec![
            Block::section(&rendered.body),
            Block::section(ack_note(user, value)),
        ],
    )
    .replacing_original()
}
