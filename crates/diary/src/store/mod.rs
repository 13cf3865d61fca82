//! Incident and thread-record persistence.
//!
//! The [`IncidentStore`] trait is the only seam dispatch and acknowledgment
//! use to reach storage. [`MemoryStore`] backs tests and single-process
//! deployments; the `postgres` feature adds [`PgStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::model::{AckMetadata, Incident, ThreadRecord};

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PgStore;

/// Result of an insert-if-absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A record with the same key was already present and was left untouched
    AlreadyExists,
}

/// Storage for incidents and the chat messages linked to them.
#[async_trait]
pub trait IncidentStore: Send + Sync {
    /// Incident for (`incident_id`, `channel`), with the root message
    /// timestamp and channel id joined in from its first thread record.
    async fn find_incident(
        &self,
        incident_id: i64,
        channel: &str,
    ) -> Result<Option<Incident>, StoreError>;

    /// Incident whose thread record has the given message timestamp.
    async fn find_incident_by_message(
        &self,
        incident_id: i64,
        message_ts: &str,
    ) -> Result<Option<Incident>, StoreError>;

    /// Insert unless (`incident_id`, `channel`) is already taken.
    async fn insert_incident(&self, incident: &Incident) -> Result<InsertOutcome, StoreError>;

    /// Update status and recover time of an incident.
    ///
    /// Returns [`StoreError::NotFound`] when no incident matches.
    async fn update_incident_status(
        &self,
        incident_id: i64,
        channel: &str,
        status: &str,
        recover_time: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError>;

    async fn update_root_cause(
        &self,
        incident_id: i64,
        channel: &str,
        root_cause: &str,
    ) -> Result<(), StoreError>;

    /// Returns [`StoreError::Conflict`] when (`message_timestamp`,
    /// `channel_id`) is already recorded.
    async fn insert_thread_record(&self, record: &ThreadRecord) -> Result<(), StoreError>;

    /// Write acknowledgment metadata onto the thread record of the message
    /// at (`message_ts`, `channel_id`).
    async fn update_thread_ack(
        &self,
        message_ts: &str,
        channel_id: &str,
        ack: &AckMetadata,
    ) -> Result<(), StoreError>;

    async fn find_thread_record(
        &self,
        message_ts: &str,
        channel_id: &str,
    ) -> Result<Option<ThreadRecord>, StoreError>;
}
