//! Acknowledgment workflow.
//!
//! A click on a root message button either opens the reason form or
//! acknowledges the incident right away ("Ignore"). Submitting the form
//! stores the chosen root cause and replaces the message with the rendered
//! incident plus an acknowledgment note.

pub mod form;

use diary_notify::{BlockActionsPayload, ChatGateway, TriggeredAction, ViewState};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::causes::CauseMenu;
use crate::error::AckError;
use crate::model::{AckAction, AckMetadata, Incident};
use crate::render;
use crate::report::{Step, StepFailures};
use crate::store::IncidentStore;
use crate::{system_clock, Clock};

pub use form::{chosen_value, reason_form, ACK_FORM_CALLBACK_ID};

/// Shown in the note when no acknowledging user was recorded.
const UNKNOWN_USER: &str = "unknown";

/// A button click, reduced to what the workflow needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockActionCallback {
    pub message_ts: String,
    /// Channel id of the clicked message
    pub channel: String,
    pub trigger_id: String,
    pub user: String,
    pub workspace: String,
    /// First triggered action; later ones are ignored
    pub action: Option<TriggeredAction>,
}

impl TryFrom<&BlockActionsPayload> for BlockActionCallback {
    type Error = AckError;

    fn try_from(payload: &BlockActionsPayload) -> Result<Self, Self::Error> {
        let message_ts = payload
            .message_ts()
            .filter(|ts| !ts.is_empty())
            .ok_or_else(|| AckError::MalformedCallback("missing message timestamp".into()))?;
        let channel = payload
            .channel_id()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AckError::MalformedCallback("missing channel".into()))?;

        Ok(Self {
            message_ts: message_ts.to_string(),
            channel: channel.to_string(),
            trigger_id: payload.trigger_id.clone(),
            user: payload.user.display_name().to_string(),
            workspace: payload.workspace().to_string(),
            action: payload.actions.first().cloned(),
        })
    }
}

/// What an acknowledgment interaction did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "action_id")]
pub enum AckOutcome {
    /// Reason form opened
    ReasonForm,
    /// Acknowledged without a reason
    Ignored,
    /// Submitted form stored as root cause
    Acknowledged,
    /// Unrecognized button; nothing done
    UnknownAction(String),
    /// Callback carried no action
    NoAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AckReport {
    pub outcome: AckOutcome,
    /// Value recorded in the acknowledgment note
    pub value: Option<String>,
    pub failures: StepFailures,
}

/// Handles button clicks and reason-form submissions.
pub struct AckWorkflow {
    store: Arc<dyn IncidentStore>,
    gateway: Arc<dyn ChatGateway>,
    causes: CauseMenu,
    clock: Clock,
}

impl AckWorkflow {
    #[must_use]
    pub fn new(
        store: Arc<dyn IncidentStore>,
        gateway: Arc<dyn ChatGateway>,
        causes: CauseMenu,
    ) -> Self {
        Self {
            store,
            gateway,
            causes,
            clock: system_clock(),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Handle a click on a root message button.
    #[instrument(skip(self, callback), fields(gateway = self.gateway.name(), message_ts = %callback.message_ts, channel = %callback.channel))]
    pub async fn ack_message(&self, callback: &BlockActionCallback) -> Result<AckReport, AckError> {
        let mut failures = StepFailures::default();

        let ack = AckMetadata {
            trigger_id: callback.trigger_id.clone(),
            workspace: callback.workspace.clone(),
            user_ack: callback.user.clone(),
        };
        if let Err(e) = self
            .store
            .update_thread_ack(&callback.message_ts, &callback.channel, &ack)
            .await
        {
            failures.record(Step::UpdateThreadRecord, e);
        }

        let incident = self
            .incident_for_message(&callback.message_ts, &callback.channel, &mut failures)
            .await;

        let Some(action) = callback.action.as_ref() else {
            info!("Callback carried no action");
            return Ok(AckReport {
                outcome: AckOutcome::NoAction,
                value: None,
                failures,
            });
        };

        let report = match AckAction::from_action_id(&action.action_id) {
            Some(AckAction::OpenReasonForm) => {
                let options = incident
                    .as_ref()
                    .map(|i| self.causes.options_for(i.condition_id))
                    .unwrap_or_default();
                let view = reason_form(&options, &callback.channel, &callback.message_ts);
                match self.gateway.open_modal(&callback.trigger_id, &view).await {
                    Ok(()) => info!(options = options.len(), "Opened reason form"),
                    Err(e) => failures.record(Step::OpenModal, e),
                }
                AckReport {
                    outcome: AckOutcome::ReasonForm,
                    value: None,
                    failures,
                }
            }
            Some(AckAction::Ignore) => {
                let value = if action.value.is_empty() {
                    AckAction::IGNORE_VALUE.to_string()
                } else {
                    action.value.clone()
                };
                self.replace_message(
                    incident.as_ref(),
                    &callback.channel,
                    &callback.message_ts,
                    &callback.user,
                    &value,
                    &mut failures,
                )
                .await;
                AckReport {
                    outcome: AckOutcome::Ignored,
                    value: Some(value),
                    failures,
                }
            }
            None => {
                warn!(action_id = %action.action_id, "Unknown action, ignoring");
                AckReport {
                    outcome: AckOutcome::UnknownAction(action.action_id.clone()),
                    value: None,
                    failures,
                }
            }
        };

        Ok(report)
    }

    /// Handle a submitted reason form for the message at
    /// (`message_ts`, `channel_id`).
    #[instrument(skip(self, state), fields(gateway = self.gateway.name()))]
    pub async fn submit_ack_form(
        &self,
        state: &ViewState,
        message_ts: &str,
        channel_id: &str,
    ) -> Result<AckReport, AckError> {
        if message_ts.is_empty() || channel_id.is_empty() {
            return Err(AckError::MalformedCallback(
                "submission does not reference a message".into(),
            ));
        }
        let value = chosen_value(state).ok_or(AckError::EmptySubmission)?;

        let record = self
            .store
            .find_thread_record(message_ts, channel_id)
            .await?
            .ok_or_else(|| AckError::ThreadNotFound {
                message_ts: message_ts.to_string(),
                channel: channel_id.to_string(),
            })?;

        // Incidents are keyed by the channel the alert named
        let mut failures = StepFailures::default();
        if let Err(e) = self
            .store
            .update_root_cause(record.incident_id, &record.channel, &value)
            .await
        {
            failures.record(Step::UpdateRootCause, e);
        }

        let incident = match self
            .store
            .find_incident(record.incident_id, &record.channel)
            .await
        {
            Ok(Some(incident)) => Some(incident),
            Ok(None) => {
                failures.record(Step::ReloadIncident, "incident not found");
                None
            }
            Err(e) => {
                failures.record(Step::ReloadIncident, e);
                None
            }
        };

        let user = if record.user_ack.is_empty() {
            UNKNOWN_USER
        } else {
            record.user_ack.as_str()
        };
        self.replace_message(
            incident.as_ref(),
            channel_id,
            message_ts,
            user,
            &value,
            &mut failures,
        )
        .await;

        info!(incident_id = record.incident_id, root_cause = %value, "Incident acknowledged");
        Ok(AckReport {
            outcome: AckOutcome::Acknowledged,
            value: Some(value),
            failures,
        })
    }

    async fn incident_for_message(
        &self,
        message_ts: &str,
        channel_id: &str,
        failures: &mut StepFailures,
    ) -> Option<Incident> {
        let record = match self.store.find_thread_record(message_ts, channel_id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                failures.record(Step::LookupThreadRecord, "thread record not found");
                return None;
            }
            Err(e) => {
                failures.record(Step::LookupThreadRecord, e);
                return None;
            }
        };

        match self
            .store
            .find_incident_by_message(record.incident_id, message_ts)
            .await
        {
            Ok(Some(incident)) => Some(incident),
            Ok(None) => {
                failures.record(Step::LookupIncident, "incident not found");
                None
            }
            Err(e) => {
                failures.record(Step::LookupIncident, e);
                None
            }
        }
    }

    /// Replace the message with the rendered incident and the ack note.
    async fn replace_message(
        &self,
        incident: Option<&Incident>,
        channel_id: &str,
        message_ts: &str,
        user: &str,
        value: &str,
        failures: &mut StepFailures,
    ) {
        let Some(incident) = incident else {
            failures.record(Step::ReplaceMessage, "no incident to render");
            return;
        };

        let rendered = render::incident_message(incident, (self.clock)());
        let content = render::acknowledged_message(&rendered, user, value);
        match self
            .gateway
            .update_message(channel_id, message_ts, &content)
            .await
        {
            Ok(_) => info!(user = %user, value = %value, "Replaced acknowledged message"),
            Err(e) => failures.record(Step::ReplaceMessage, e),
        }
    }
}
