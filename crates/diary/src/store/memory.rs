//! In-process store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{IncidentStore, InsertOutcome};
use crate::error::StoreError;
use crate::model::{AckMetadata, Incident, ThreadRecord};

#[derive(Default)]
struct Tables {
    incidents: HashMap<(i64, String), Incident>,
    /// Insertion order; the first record of an incident is its root message
    threads: Vec<ThreadRecord>,
}

impl Tables {
    fn root_record(&self, incident_id: i64, channel: &str) -> Option<&ThreadRecord> {
        self.threads
            .iter()
            .find(|t| t.incident_id == incident_id && t.channel == channel)
    }

    fn with_root_message(&self, incident: &Incident) -> Incident {
        let mut incident = incident.clone();
        let root = self.root_record(incident.incident_id, &incident.channel);
        incident.message_timestamp = root.map(|t| t.message_timestamp.clone());
        incident.message_channel_id = root.map(|t| t.channel_id.clone());
        incident
    }

    fn thread_mut(&mut self, message_ts: &str, channel_id: &str) -> Option<&mut ThreadRecord> {
        self.threads
            .iter_mut()
            .find(|t| t.message_timestamp == message_ts && t.channel_id == channel_id)
    }
}

/// Store keeping everything in memory behind a single lock.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn incident_count(&self) -> usize {
        self.tables.read().await.incidents.len()
    }

    /// All thread records in insertion order.
    pub async fn thread_records(&self) -> Vec<ThreadRecord> {
        self.tables.read().await.threads.clone()
    }
}

#[async_trait]
impl IncidentStore for MemoryStore {
    async fn find_incident(
        &self,
        incident_id: i64,
        channel: &str,
    ) -> Result<Option<Incident>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .incidents
            .get(&(incident_id, channel.to_string()))
            .map(|incident| tables.with_root_message(incident)))
    }

    async fn find_incident_by_message(
        &self,
        incident_id: i64,
        message_ts: &str,
    ) -> Result<Option<Incident>, StoreError> {
        let tables = self.tables.read().await;
        let Some(record) = tables
            .threads
            .iter()
            .find(|t| t.incident_id == incident_id && t.message_timestamp == message_ts)
        else {
            return Ok(None);
        };

        Ok(tables
            .incidents
            .get(&(incident_id, record.channel.clone()))
            .map(|incident| tables.with_root_message(incident)))
    }

    async fn insert_incident(&self, incident: &Incident) -> Result<InsertOutcome, StoreError> {
        let mut tables = self.tables.write().await;
        let key = (incident.incident_id, incident.channel.clone());
        if tables.incidents.contains_key(&key) {
            return Ok(InsertOutcome::AlreadyExists);
        }

        let mut stored = incident.clone();
        stored.message_timestamp = None;
        stored.message_channel_id = None;
        tables.incidents.insert(key, stored);
        Ok(InsertOutcome::Inserted)
    }

    async fn update_incident_status(
        &self,
        incident_id: i64,
        channel: &str,
        status: &str,
        recover_time: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let incident = tables
            .incidents
            .get_mut(&(incident_id, channel.to_string()))
            .ok_or_else(|| StoreError::NotFound(format!("incident {incident_id} in {channel}")))?;

        incident.status = status.to_string();
        incident.recover_time = recover_time;
        Ok(())
    }

    async fn update_root_cause(
        &self,
        incident_id: i64,
        channel: &str,
        root_cause: &str,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let incident = tables
            .incidents
            .get_mut(&(incident_id, channel.to_string()))
            .ok_or_else(|| StoreError::NotFound(format!("incident {incident_id} in {channel}")))?;

        incident.root_cause = root_cause.to_string();
        Ok(())
    }

    async fn insert_thread_record(&self, record: &ThreadRecord) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables
            .thread_mut(&record.message_timestamp, &record.channel_id)
            .is_some()
        {
            return Err(StoreError::Conflict(format!(
                "message {} in {}",
                record.message_timestamp, record.channel_id
            )));
        }

        tables.threads.push(record.clone());
        Ok(())
    }

    async fn update_thread_ack(
        &self,
        message_ts: &str,
        channel_id: &str,
        ack: &AckMetadata,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let record = tables.thread_mut(message_ts, channel_id).ok_or_else(|| {
            StoreError::NotFound(format!("message {message_ts} in {channel_id}"))
        })?;

        record.trigger_id.clone_from(&ack.trigger_id);
        record.workspace.clone_from(&ack.workspace);
        record.user_ack.clone_from(&ack.user_ack);
        Ok(())
    }

    async fn find_thread_record(
        &self,
        message_ts: &str,
        channel_id: &str,
    ) -> Result<Option<ThreadRecord>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .threads
            .iter()
            .find(|t| t.message_timestamp == message_ts && t.channel_id == channel_id)
            .cloned())
    }
}
