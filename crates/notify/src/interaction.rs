//! Inbound Slack interactivity payloads.
//!
//! Slack posts these as `application/x-www-form-urlencoded` bodies with a
//! single `payload` field holding JSON.
//!
//! Reference: <https://api.slack.com/reference/interaction-payloads>

use serde::Deserialize;
use std::collections::BTreeMap;

use crate::error::ChannelError;

/// Interaction payload, tagged by its `type` field.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InteractionPayload {
    /// A button (or other block element) was pressed
    BlockActions(BlockActionsPayload),
    /// A modal form was submitted
    ViewSubmission(ViewSubmissionPayload),
    /// Anything else (shortcuts, view_closed, ...)
    #[serde(other)]
    Unsupported,
}

impl InteractionPayload {
    /// Parse the JSON carried in the `payload` form field.
    pub fn parse(raw: &str) -> Result<Self, ChannelError> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlackUser {
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub name: String,
}

impl SlackUser {
    /// Best available display name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        [&self.name, &self.username, &self.id]
            .into_iter()
            .find(|s| !s.is_empty())
            .map_or("", String::as_str)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Team {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub domain: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelRef {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Container {
    #[serde(default)]
    pub message_ts: Option<String>,
    #[serde(default)]
    pub channel_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageRef {
    pub ts: String,
}

/// One triggered action of a `block_actions` payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TriggeredAction {
    pub action_id: String,
    #[serde(default)]
    pub block_id: String,
    #[serde(default)]
    pub value: String,
}

/// `block_actions` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockActionsPayload {
    #[serde(default)]
    pub user: SlackUser,
    #[serde(default)]
    pub team: Option<Team>,
    #[serde(default)]
    pub channel: Option<ChannelRef>,
    #[serde(default)]
    pub container: Option<Container>,
    #[serde(default)]
    pub message: Option<MessageRef>,
    #[serde(default)]
    pub trigger_id: String,
    #[serde(default)]
    pub actions: Vec<TriggeredAction>,
}

impl BlockActionsPayload {
    /// Timestamp of the message holding the pressed button.
    #[must_use]
    pub fn message_ts(&self) -> Option<&str> {
        self.container
            .as_ref()
            .and_then(|c| c.message_ts.as_deref())
            .or_else(|| self.message.as_ref().map(|m| m.ts.as_str()))
            .filter(|ts| !ts.is_empty())
    }

    /// Channel holding the message.
    #[must_use]
    pub fn channel_id(&self) -> Option<&str> {
        self.channel
            .as_ref()
            .map(|c| c.id.as_str())
            .or_else(|| self.container.as_ref().and_then(|c| c.channel_id.as_deref()))
            .filter(|id| !id.is_empty())
    }

    /// Workspace domain, falling back to the team id.
    #[must_use]
    pub fn workspace(&self) -> &str {
        self.team.as_ref().map_or("", |t| {
            if t.domain.is_empty() {
                t.id.as_str()
            } else {
                t.domain.as_str()
            }
        })
    }
}

/// `view_submission` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ViewSubmissionPayload {
    #[serde(default)]
    pub user: SlackUser,
    #[serde(default)]
    pub team: Option<Team>,
    pub view: SubmittedView,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmittedView {
    #[serde(default)]
    pub callback_id: String,
    #[serde(default)]
    pub private_metadata: String,
    #[serde(default)]
    pub state: ViewState,
}

impl SubmittedView {
    /// Split `private_metadata` of the form `"<channel>:<message_ts>"`.
    #[must_use]
    pub fn message_ref(&self) -> Option<(&str, &str)> {
        self.private_metadata
            .split_once(':')
            .filter(|(channel, ts)| !channel.is_empty() && !ts.is_empty())
    }
}

/// Submitted form values keyed by block id, then action id.
///
/// Both levels are ordered maps, so traversal order is the sorted key order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViewState {
    #[serde(default)]
    pub values: BTreeMap<String, BTreeMap<String, FieldValue>>,
}

/// Value of one submitted input element.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FieldValue {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub selected_option: Option<SelectedOption>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectedOption {
    pub value: String,
}
