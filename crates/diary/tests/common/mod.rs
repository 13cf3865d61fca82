//! Shared fixtures for the diary integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use diary::{
    AckMetadata, AlertEvent, Incident, IncidentStore, InsertOutcome, Labels, MemoryStore,
    StoreError, ThreadRecord,
};
use diary_notify::{ChannelError, ChatGateway, MessageContent, ModalView, PostedMessage};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// A chat call seen by [`RecordingGateway`].
#[derive(Debug, Clone)]
pub enum Call {
    Post {
        channel: String,
        thread_ts: Option<String>,
        content: MessageContent,
        ts: String,
    },
    Update {
        channel: String,
        ts: String,
        content: MessageContent,
    },
    OpenModal {
        trigger_id: String,
        view: ModalView,
    },
}

/// Gateway that records every call and hands out increasing timestamps.
///
/// Like Slack, posts report the channel id of the channel they landed in.
#[derive(Default)]
pub struct RecordingGateway {
    calls: Mutex<Vec<Call>>,
    next_ts: AtomicU64,
    fail_posts: AtomicBool,
    channel_ids: HashMap<String, String>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report posts to channel `name` as living in channel `id`.
    pub fn with_channel_id(mut self, name: &str, id: &str) -> Self {
        self.channel_ids.insert(name.to_string(), id.to_string());
        self
    }

    fn channel_id(&self, channel: &str) -> String {
        self.channel_ids
            .get(channel)
            .cloned()
            .unwrap_or_else(|| channel.to_string())
    }

    /// Make every `post_message` fail until switched back.
    pub fn fail_posts(&self, fail: bool) {
        self.fail_posts.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn root_posts(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Post { thread_ts: None, .. }))
            .collect()
    }

    pub fn replies(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Post { thread_ts: Some(_), .. }))
            .collect()
    }

    pub fn updates(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Update { .. }))
            .collect()
    }

    pub fn modals(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::OpenModal { .. }))
            .collect()
    }
}

#[async_trait]
impl ChatGateway for RecordingGateway {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn post_message(
        &self,
        channel: &str,
        content: &MessageContent,
        thread_ts: Option<&str>,
    ) -> Result<PostedMessage, ChannelError> {
        if self.fail_posts.load(Ordering::SeqCst) {
            return Err(ChannelError::Other("post rejected".to_string()));
        }

        let ts = format!("1700000000.{:06}", self.next_ts.fetch_add(1, Ordering::SeqCst) + 1);
        self.calls.lock().unwrap().push(Call::Post {
            channel: channel.to_string(),
            thread_ts: thread_ts.map(str::to_string),
            content: content.clone(),
            ts: ts.clone(),
        });
        Ok(PostedMessage {
            channel: self.channel_id(channel),
            ts,
        })
    }

    async fn update_message(
        &self,
        channel: &str,
        ts: &str,
        content: &MessageContent,
    ) -> Result<PostedMessage, ChannelError> {
        self.calls.lock().unwrap().push(Call::Update {
            channel: channel.to_string(),
            ts: ts.to_string(),
            content: content.clone(),
        });
        Ok(PostedMessage {
            channel: self.channel_id(channel),
            ts: ts.to_string(),
        })
    }

    async fn open_modal(&self, trigger_id: &str, view: &ModalView) -> Result<(), ChannelError> {
        self.calls.lock().unwrap().push(Call::OpenModal {
            trigger_id: trigger_id.to_string(),
            view: view.clone(),
        });
        Ok(())
    }
}

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 18, 10, 0, 0).unwrap()
}

pub fn event(incident_id: i64, channel: &str, state: &str) -> AlertEvent {
    AlertEvent {
        incident_id,
        channel: channel.to_string(),
        generated_by: "New Relic".to_string(),
        name: "CPU high".to_string(),
        url: "https://alerts.example/42".to_string(),
        description: "CPU above 90% on web-1".to_string(),
        owner: "sre".to_string(),
        state: state.to_string(),
        severity: "critical".to_string(),
        condition_id: 7,
        labels: Labels::new(r#"{"env": "prod"}"#),
        start_time: Some(Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap()),
    }
}

/// Store operations [`FailingStore`] can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    FindIncident,
    InsertIncident,
    UpdateIncidentStatus,
    UpdateRootCause,
    InsertThreadRecord,
    UpdateThreadAck,
    FindThreadRecord,
}

/// [`MemoryStore`] wrapper that fails chosen operations a set number of times.
pub struct FailingStore {
    inner: Arc<MemoryStore>,
    failures: Mutex<HashMap<StoreOp, usize>>,
}

impl FailingStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Fail the next `times` calls of `op`.
    pub fn fail(&self, op: StoreOp, times: usize) {
        self.failures.lock().unwrap().insert(op, times);
    }

    fn check(&self, op: StoreOp) -> Result<(), StoreError> {
        let mut failures = self.failures.lock().unwrap();
        match failures.get_mut(&op) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Err(StoreError::Backend(format!("{op:?} unavailable")))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl IncidentStore for FailingStore {
    async fn find_incident(
        &self,
        incident_id: i64,
        channel: &str,
    ) -> Result<Option<Incident>, StoreError> {
        self.check(StoreOp::FindIncident)?;
        self.inner.find_incident(incident_id, channel).await
    }

    async fn find_incident_by_message(
        &self,
        incident_id: i64,
        message_ts: &str,
    ) -> Result<Option<Incident>, StoreError> {
        self.inner.find_incident_by_message(incident_id, message_ts).await
    }

    async fn insert_incident(&self, incident: &Incident) -> Result<InsertOutcome, StoreError> {
        self.check(StoreOp::InsertIncident)?;
        self.inner.insert_incident(incident).await
    }

    async fn update_incident_status(
        &self,
        incident_id: i64,
        channel: &str,
        status: &str,
        recover_time: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        self.check(StoreOp::UpdateIncidentStatus)?;
        self.inner
            .update_incident_status(incident_id, channel, status, recover_time)
            .await
    }

    async fn update_root_cause(
        &self,
        incident_id: i64,
        channel: &str,
        root_cause: &str,
    ) -> Result<(), StoreError> {
        self.check(StoreOp::UpdateRootCause)?;
        self.inner
            .update_root_cause(incident_id, channel, root_cause)
            .await
    }

    async fn insert_thread_record(&self, record: &ThreadRecord) -> Result<(), StoreError> {
        self.check(StoreOp::InsertThreadRecord)?;
        self.inner.insert_thread_record(record).await
    }

    async fn update_thread_ack(
        &self,
        message_ts: &str,
        channel_id: &str,
        ack: &AckMetadata,
    ) -> Result<(), StoreError> {
        self.check(StoreOp::UpdateThreadAck)?;
        self.inner.update_thread_ack(message_ts, channel_id, ack).await
    }

    async fn find_thread_record(
        &self,
        message_ts: &str,
        channel_id: &str,
    ) -> Result<Option<ThreadRecord>, StoreError> {
        self.check(StoreOp::FindThreadRecord)?;
        self.inner.find_thread_record(message_ts, channel_id).await
    }
}
