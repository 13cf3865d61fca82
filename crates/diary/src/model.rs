//! Incident, thread record and inbound alert types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Root cause of an incident nobody has acknowledged with a reason yet.
pub const ROOT_CAUSE_UNSET: &str = "null";

pub const STATUS_OPEN: &str = "open";
pub const STATUS_ACKNOWLEDGED: &str = "acknowledged";
pub const STATUS_CLOSED: &str = "closed";

/// Serialized key/value labels attached to an alert.
///
/// The alerting source sends labels as a JSON object encoded in a string;
/// it is stored verbatim and only decoded on lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Labels(String);

impl Labels {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Look up a label by key.
    ///
    /// Returns `None` when the labels are not a JSON object or the key is
    /// absent. Non-string values come back as their JSON text.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        let serde_json::Value::Object(map) =
            serde_json::from_str::<serde_json::Value>(&self.0).ok()?
        else {
            return None;
        };
        map.get(key).map(|value| match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

/// Inbound alert event from the alerting source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertEvent {
    /// Source-assigned incident id
    pub incident_id: i64,
    /// Chat channel the incident is announced in
    pub channel: String,
    /// Originating vendor ("New Relic", "Google Cloud Platform", ...)
    #[serde(default)]
    pub generated_by: String,
    /// Alert name
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub owner: String,
    /// Incident state ("open", "acknowledged", "closed", ...)
    pub state: String,
    #[serde(default)]
    pub severity: String,
    /// Alert condition; selects the cause menu
    #[serde(default)]
    pub condition_id: i64,
    #[serde(default)]
    pub labels: Labels,
    /// When the incident started; defaults to the time of receipt
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
}

impl AlertEvent {
    /// Whether this event marks the incident as resolved.
    #[must_use]
    pub fn resolves(&self) -> bool {
        self.state == STATUS_CLOSED || self.state == STATUS_ACKNOWLEDGED
    }
}

/// A tracked incident, one per (`incident_id`, `channel`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incident {
    pub incident_id: i64,
    pub channel: String,
    pub name: String,
    pub url: String,
    pub description: String,
    pub owner: String,
    pub generated_by: String,
    pub status: String,
    pub severity: String,
    pub condition_id: i64,
    pub labels: Labels,
    /// [`ROOT_CAUSE_UNSET`] until an acknowledgment form sets it
    pub root_cause: String,
    pub start_time: DateTime<Utc>,
    /// `None` while unresolved
    pub recover_time: Option<DateTime<Utc>>,
    /// Root chat message, joined in from the thread record
    pub message_timestamp: Option<String>,
    /// Channel id the root message was posted to
    pub message_channel_id: Option<String>,
}

impl Incident {
    /// Fresh incident for the first event of a (`incident_id`, `channel`) pair.
    #[must_use]
    pub fn from_event(event: &AlertEvent, now: DateTime<Utc>) -> Self {
        Self {
            incident_id: event.incident_id,
            channel: event.channel.clone(),
            name: event.name.clone(),
            url: event.url.clone(),
            description: event.description.clone(),
            owner: event.owner.clone(),
            generated_by: event.generated_by.clone(),
            status: event.state.clone(),
            severity: event.severity.clone(),
            condition_id: event.condition_id,
            labels: event.labels.clone(),
            root_cause: ROOT_CAUSE_UNSET.to_string(),
            start_time: event.start_time.unwrap_or(now),
            recover_time: None,
            message_timestamp: None,
            message_channel_id: None,
        }
    }

    #[must_use]
    pub fn is_announced(&self) -> bool {
        self.message_timestamp.is_some()
    }

    /// Root message, if announced.
    ///
    /// Falls back to the incident channel for records written without a
    /// channel id.
    #[must_use]
    pub fn root_message(&self) -> Option<RootMessage> {
        let ts = self.message_timestamp.clone()?;
        let channel_id = self
            .message_channel_id
            .clone()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| self.channel.clone());
        Some(RootMessage { channel_id, ts })
    }
}

/// Link between a chat message and its incident, plus acknowledgment metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadRecord {
    pub trigger_id: String,
    pub workspace: String,
    /// Display name of the acknowledging user
    pub user_ack: String,
    pub message_timestamp: String,
    pub incident_id: i64,
    /// Channel of the incident, as named by the alert
    pub channel: String,
    /// Channel id the platform reported for the message; interaction
    /// callbacks address the message by this id
    pub channel_id: String,
}

impl ThreadRecord {
    /// Record for a freshly posted root message; ack fields start empty.
    #[must_use]
    pub fn for_root_message(
        message_timestamp: &str,
        incident_id: i64,
        channel: &str,
        channel_id: &str,
    ) -> Self {
        Self {
            message_timestamp: message_timestamp.to_string(),
            incident_id,
            channel: channel.to_string(),
            channel_id: channel_id.to_string(),
            ..Self::default()
        }
    }
}

/// Where a root message lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootMessage {
    pub channel_id: String,
    pub ts: String,
}

/// Acknowledgment fields written onto a thread record on button click.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AckMetadata {
    pub trigger_id: String,
    pub workspace: String,
    pub user_ack: String,
}

/// Alerting vendor, selecting how the root message is composed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertSource {
    /// Root messages carry the Acknowledge/Ignore buttons
    NewRelic,
    GoogleCloud,
    Other,
}

impl AlertSource {
    #[must_use]
    pub fn from_vendor(vendor: &str) -> Self {
        match vendor {
            "New Relic" => Self::NewRelic,
            "Google Cloud Platform" => Self::GoogleCloud,
            _ => Self::Other,
        }
    }

    /// Whether root messages from this source offer acknowledgment buttons.
    #[must_use]
    pub const fn offers_acknowledgment(self) -> bool {
        matches!(self, Self::NewRelic)
    }
}

/// Buttons a user can press on a root message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckAction {
    /// Open the reason form
    OpenReasonForm,
    /// Acknowledge without a reason
    Ignore,
}

impl AckAction {
    /// Value carried by the Ignore button and recorded in the ack note.
    pub const IGNORE_VALUE: &'static str = "ignored";

    #[must_use]
    pub const fn action_id(self) -> &'static str {
        match self {
            Self::OpenReasonForm => "reason_btn",
            Self::Ignore => "ignore_btn",
        }
    }

    #[must_use]
    pub fn from_action_id(action_id: &str) -> Option<Self> {
        match action_id {
            "reason_btn" => Some(Self::OpenReasonForm),
            "ignore_btn" => Some(Self::Ignore),
            _ => None,
        }
    }
}
