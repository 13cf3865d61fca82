//! Incident dispatch: one root message per incident, one threaded reply per
//! event.
//!
//! The first event of an (`incident_id`, `channel`) pair announces the
//! incident with a root message; later events edit that message in place.
//! Every event also gets a terse threaded reply under the root message.
//!
//! Sub-steps are best-effort: a failed store or chat call is recorded in the
//! [`DispatchReport`] and the remaining steps still run. An incident whose
//! announcement failed has no root message yet, so its next event takes the
//! announce path again.

use chrono::{DateTime, Utc};
use diary_notify::ChatGateway;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::error::DispatchError;
use crate::locks::KeyedLocks;
use crate::model::{AlertEvent, AlertSource, Incident, RootMessage, ThreadRecord};
use crate::render;
use crate::report::{Step, StepFailures};
use crate::store::{IncidentStore, InsertOutcome};
use crate::{system_clock, Clock};

/// Which path an event took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchPath {
    /// Root message posted for a new (or not yet announced) incident
    Announced,
    /// Existing root message edited
    Updated,
}

/// Outcome of processing one alert event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub path: DispatchPath,
    pub root_message_ts: Option<String>,
    pub reply_ts: Option<String>,
    pub failures: StepFailures,
}

impl DispatchReport {
    /// Whether every sub-step succeeded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Correlates alert events with incidents and their chat messages.
pub struct IncidentDispatcher {
    store: Arc<dyn IncidentStore>,
    gateway: Arc<dyn ChatGateway>,
    locks: KeyedLocks<(i64, String)>,
    clock: Clock,
}

impl IncidentDispatcher {
    #[must_use]
    pub fn new(store: Arc<dyn IncidentStore>, gateway: Arc<dyn ChatGateway>) -> Self {
        Self {
            store,
            gateway,
            locks: KeyedLocks::new(),
            clock: system_clock(),
        }
    }

    /// Replace the wall clock, e.g. with a fixed instant in tests.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Process one alert event.
    ///
    /// Events of the same (`incident_id`, `channel`) are processed one at a
    /// time, so two events for a new incident announce it only once.
    #[instrument(skip(self, event), fields(gateway = self.gateway.name(), incident_id = event.incident_id, channel = %event.channel, state = %event.state))]
    pub async fn process_incident(
        &self,
        event: &AlertEvent,
    ) -> Result<DispatchReport, DispatchError> {
        if event.channel.trim().is_empty() {
            return Err(DispatchError::MalformedEvent(format!(
                "incident {} has no channel",
                event.incident_id
            )));
        }

        let _guard = self
            .locks
            .lock((event.incident_id, event.channel.clone()))
            .await;
        let now = (self.clock)();
        let mut failures = StepFailures::default();

        let existing = match self
            .store
            .find_incident(event.incident_id, &event.channel)
            .await
        {
            Ok(found) => found,
            Err(e) => {
                failures.record(Step::LookupIncident, e);
                None
            }
        };

        let (path, root) = match existing {
            Some(incident) if incident.is_announced() => {
                let root = self.update(event, incident, now, &mut failures).await;
                (DispatchPath::Updated, root)
            }
            _ => self.announce(event, now, &mut failures).await,
        };

        let (root_message_ts, reply_ts) = self.reply(event, root, now, &mut failures).await;

        info!(
            path = ?path,
            root_message_ts = root_message_ts.as_deref().unwrap_or(""),
            failures = failures.len(),
            "Processed alert event"
        );

        Ok(DispatchReport {
            path,
            root_message_ts,
            reply_ts,
            failures,
        })
    }

    /// New-incident path. Returns the root message when posted.
    ///
    /// An incident that turns out to be announced already (its first lookup
    /// failed) has its root message edited instead of posted twice.
    async fn announce(
        &self,
        event: &AlertEvent,
        now: DateTime<Utc>,
        failures: &mut StepFailures,
    ) -> (DispatchPath, Option<RootMessage>) {
        let fresh = Incident::from_event(event, now);
        match self.store.insert_incident(&fresh).await {
            Ok(InsertOutcome::Inserted) => debug!("Inserted incident"),
            Ok(InsertOutcome::AlreadyExists) => {
                debug!("Incident exists without a root message, retrying announcement");
            }
            Err(e) => failures.record(Step::InsertIncident, e),
        }

        let incident = match self.reload(event, failures).await {
            Some(incident) if incident.is_announced() => {
                debug!("Incident already announced, updating its root message");
                let root = self.update(event, incident, now, failures).await;
                return (DispatchPath::Updated, root);
            }
            Some(incident) => incident,
            None => fresh,
        };

        let rendered = render::incident_message(&incident, now);
        let content = render::root_message(
            &rendered,
            AlertSource::from_vendor(&incident.generated_by),
        );

        let posted = match self
            .gateway
            .post_message(&event.channel, &content, None)
            .await
        {
            Ok(posted) => posted,
            Err(e) => {
                failures.record(Step::PostRootMessage, e);
                return (DispatchPath::Announced, None);
            }
        };
        // Interaction callbacks and edits address the message by channel id
        let channel_id = if posted.channel.is_empty() {
            event.channel.clone()
        } else {
            posted.channel
        };
        info!(message_ts = %posted.ts, channel_id = %channel_id, "Posted root message");

        let record = ThreadRecord::for_root_message(
            &posted.ts,
            event.incident_id,
            &event.channel,
            &channel_id,
        );
        if let Err(e) = self.store.insert_thread_record(&record).await {
            failures.record(Step::InsertThreadRecord, e);
        }

        (
            DispatchPath::Announced,
            Some(RootMessage {
                channel_id,
                ts: posted.ts,
            }),
        )
    }

    /// Update path. Returns the root message.
    async fn update(
        &self,
        event: &AlertEvent,
        existing: Incident,
        now: DateTime<Utc>,
        failures: &mut StepFailures,
    ) -> Option<RootMessage> {
        let recover_time = event.resolves().then_some(now);
        if let Err(e) = self
            .store
            .update_incident_status(event.incident_id, &event.channel, &event.state, recover_time)
            .await
        {
            failures.record(Step::UpdateIncidentStatus, e);
        }

        let incident = self.reload(event, failures).await.unwrap_or_else(|| Incident {
            status: event.state.clone(),
            recover_time,
            ..existing
        });
        let root = incident.root_message()?;

        let rendered = render::incident_message(&incident, now);
        let content = render::root_message(
            &rendered,
            AlertSource::from_vendor(&incident.generated_by),
        );
        match self
            .gateway
            .update_message(&root.channel_id, &root.ts, &content)
            .await
        {
            Ok(_) => info!(message_ts = %root.ts, "Updated root message"),
            Err(e) => failures.record(Step::UpdateRootMessage, e),
        }

        Some(root)
    }

    /// Post the event summary under the root message.
    ///
    /// Returns the canonical root ts and the reply ts.
    async fn reply(
        &self,
        event: &AlertEvent,
        fallback_root: Option<RootMessage>,
        now: DateTime<Utc>,
        failures: &mut StepFailures,
    ) -> (Option<String>, Option<String>) {
        let incident = self.reload(event, failures).await;
        let root = incident
            .as_ref()
            .and_then(Incident::root_message)
            .or(fallback_root);

        let Some(root) = root else {
            failures.record(Step::PostThreadReply, "no root message to reply to");
            return (None, None);
        };

        let rendered = render::event_summary(event, incident.as_ref(), now);
        let content = render::thread_reply(&rendered);
        match self
            .gateway
            .post_message(&root.channel_id, &content, Some(&root.ts))
            .await
        {
            Ok(posted) => {
                debug!(message_ts = %posted.ts, "Posted threaded reply");
                (Some(root.ts), Some(posted.ts))
            }
            Err(e) => {
                failures.record(Step::PostThreadReply, e);
                (Some(root.ts), None)
            }
        }
    }

    async fn reload(&self, event: &AlertEvent, failures: &mut StepFailures) -> Option<Incident> {
        match self
            .store
            .find_incident(event.incident_id, &event.channel)
            .await
        {
            Ok(Some(incident)) => Some(incident),
            Ok(None) => {
                failures.record(Step::ReloadIncident, "incident not found after write");
                None
            }
            Err(e) => {
                failures.record(Step::ReloadIncident, e);
                None
            }
        }
    }
}
