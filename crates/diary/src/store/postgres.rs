//! Postgres store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use super::{IncidentStore, InsertOutcome};
use crate::error::StoreError;
use crate::model::{AckMetadata, Incident, Labels, ThreadRecord};

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS incident (
    incident_id   BIGINT      NOT NULL,
    channel       TEXT        NOT NULL,
    name          TEXT        NOT NULL,
    url           TEXT        NOT NULL DEFAULT '',
    description   TEXT        NOT NULL DEFAULT '',
    owner         TEXT        NOT NULL DEFAULT '',
    generated_by  TEXT        NOT NULL DEFAULT '',
    status        TEXT        NOT NULL,
    severity      TEXT        NOT NULL DEFAULT '',
    condition_id  BIGINT      NOT NULL DEFAULT 0,
    labels        TEXT        NOT NULL DEFAULT '',
    root_cause    TEXT        NOT NULL DEFAULT 'null',
    start_time    TIMESTAMPTZ NOT NULL,
    recover_time  TIMESTAMPTZ,
    UNIQUE (incident_id, channel)
);

CREATE TABLE IF NOT EXISTS slack_message (
    id                BIGSERIAL PRIMARY KEY,
    trigger_id        TEXT   NOT NULL DEFAULT '',
    workspace         TEXT   NOT NULL DEFAULT '',
    user_ack          TEXT   NOT NULL DEFAULT '',
    message_timestamp TEXT   NOT NULL,
    incident_id       BIGINT NOT NULL,
    channel           TEXT   NOT NULL,
    channel_id        TEXT   NOT NULL,
    UNIQUE (message_timestamp, channel_id)
);
";

/// Incident columns plus the joined root message.
const SELECT_INCIDENT: &str = r"
SELECT i.incident_id, i.channel, i.name, i.url, i.description, i.owner, i.generated_by,
       i.status, i.severity, i.condition_id, i.labels, i.root_cause, i.start_time,
       i.recover_time,
       root.message_timestamp, root.channel_id AS message_channel_id
FROM incident i
LEFT JOIN LATERAL (
    SELECT m.message_timestamp, m.channel_id FROM slack_message m
     WHERE m.incident_id = i.incident_id AND m.channel = i.channel
     ORDER BY m.id LIMIT 1
) root ON TRUE";

#[derive(sqlx::FromRow)]
struct IncidentRow {
    incident_id: i64,
    channel: String,
    name: String,
    url: String,
    description: String,
    owner: String,
    generated_by: String,
    status: String,
    severity: String,
    condition_id: i64,
    labels: String,
    root_cause: String,
    start_time: DateTime<Utc>,
    recover_time: Option<DateTime<Utc>>,
    message_timestamp: Option<String>,
    message_channel_id: Option<String>,
}

impl From<IncidentRow> for Incident {
    fn from(row: IncidentRow) -> Self {
        Self {
            incident_id: row.incident_id,
            channel: row.channel,
            name: row.name,
            url: row.url,
            description: row.description,
            owner: row.owner,
            generated_by: row.generated_by,
            status: row.status,
            severity: row.severity,
            condition_id: row.condition_id,
            labels: Labels::new(row.labels),
            root_cause: row.root_cause,
            start_time: row.start_time,
            recover_time: row.recover_time,
            message_timestamp: row.message_timestamp,
            message_channel_id: row.message_channel_id,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ThreadRow {
    trigger_id: String,
    workspace: String,
    user_ack: String,
    message_timestamp: String,
    incident_id: i64,
    channel: String,
    channel_id: String,
}

impl From<ThreadRow> for ThreadRecord {
    fn from(row: ThreadRow) -> Self {
        Self {
            trigger_id: row.trigger_id,
            workspace: row.workspace,
            user_ack: row.user_ack,
            message_timestamp: row.message_timestamp,
            incident_id: row.incident_id,
            channel: row.channel,
            channel_id: row.channel_id,
        }
    }
}

/// Store backed by a Postgres connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect and make sure the schema exists.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        let store = Self::from_pool(pool);
        store.migrate().await?;
        Ok(store)
    }

    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        info!("Incident schema ready");
        Ok(())
    }
}

fn ensure_updated(rows: u64, what: impl FnOnce() -> String) -> Result<(), StoreError> {
    if rows == 0 {
        Err(StoreError::NotFound(what()))
    } else {
        Ok(())
    }
}

#[async_trait]
impl IncidentStore for PgStore {
    async fn find_incident(
        &self,
        incident_id: i64,
        channel: &str,
    ) -> Result<Option<Incident>, StoreError> {
        let query = format!("{SELECT_INCIDENT} WHERE i.incident_id = $1 AND i.channel = $2");
        let row = sqlx::query_as::<_, IncidentRow>(&query)
            .bind(incident_id)
            .bind(channel)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Incident::from))
    }

    async fn find_incident_by_message(
        &self,
        incident_id: i64,
        message_ts: &str,
    ) -> Result<Option<Incident>, StoreError> {
        let query = format!(
            "{SELECT_INCIDENT} JOIN slack_message s \
             ON s.incident_id = i.incident_id AND s.channel = i.channel \
             WHERE i.incident_id = $1 AND s.message_timestamp = $2 LIMIT 1"
        );
        let row = sqlx::query_as::<_, IncidentRow>(&query)
            .bind(incident_id)
            .bind(message_ts)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Incident::from))
    }

    async fn insert_incident(&self, incident: &Incident) -> Result<InsertOutcome, StoreError> {
        let result = sqlx::query(
            r"INSERT INTO incident
                (incident_id, channel, name, url, description, owner, generated_by, status,
                 severity, condition_id, labels, root_cause, start_time, recover_time)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
              ON CONFLICT (incident_id, channel) DO NOTHING",
        )
        .bind(incident.incident_id)
        .bind(&incident.channel)
        .bind(&incident.name)
        .bind(&incident.url)
        .bind(&incident.description)
        .bind(&incident.owner)
        .bind(&incident.generated_by)
        .bind(&incident.status)
        .bind(&incident.severity)
        .bind(incident.condition_id)
        .bind(incident.labels.as_str())
        .bind(&incident.root_cause)
        .bind(incident.start_time)
        .bind(incident.recover_time)
        .execute(&self.pool)
        .await?;

        Ok(if result.rows_affected() == 0 {
            InsertOutcome::AlreadyExists
        } else {
            InsertOutcome::Inserted
        })
    }

    async fn update_incident_status(
        &self,
        incident_id: i64,
        channel: &str,
        status: &str,
        recover_time: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE incident SET status = $3, recover_time = $4 \
             WHERE incident_id = $1 AND channel = $2",
        )
        .bind(incident_id)
        .bind(channel)
        .bind(status)
        .bind(recover_time)
        .execute(&self.pool)
        .await?;
        ensure_updated(result.rows_affected(), || {
            format!("incident {incident_id} in {channel}")
        })
    }

    async fn update_root_cause(
        &self,
        incident_id: i64,
        channel: &str,
        root_cause: &str,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE incident SET root_cause = $3 WHERE incident_id = $1 AND channel = $2",
        )
        .bind(incident_id)
        .bind(channel)
        .bind(root_cause)
        .execute(&self.pool)
        .await?;
        ensure_updated(result.rows_affected(), || {
            format!("incident {incident_id} in {channel}")
        })
    }

    async fn insert_thread_record(&self, record: &ThreadRecord) -> Result<(), StoreError> {
        let result = sqlx::query(
            r"INSERT INTO slack_message
                (trigger_id, workspace, user_ack, message_timestamp, incident_id, channel,
                 channel_id)
              VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&record.trigger_id)
        .bind(&record.workspace)
        .bind(&record.user_ack)
        .bind(&record.message_timestamp)
        .bind(record.incident_id)
        .bind(&record.channel)
        .bind(&record.channel_id)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(StoreError::Conflict(format!(
                    "message {} in {}",
                    record.message_timestamp, record.channel_id
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update_thread_ack(
        &self,
        message_ts: &str,
        channel_id: &str,
        ack: &AckMetadata,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE slack_message SET trigger_id = $3, workspace = $4, user_ack = $5 \
             WHERE message_timestamp = $1 AND channel_id = $2",
        )
        .bind(message_ts)
        .bind(channel_id)
        .bind(&ack.trigger_id)
        .bind(&ack.workspace)
        .bind(&ack.user_ack)
        .execute(&self.pool)
        .await?;
        ensure_updated(result.rows_affected(), || {
            format!("message {message_ts} in {channel_id}")
        })
    }

    async fn find_thread_record(
        &self,
        message_ts: &str,
        channel_id: &str,
    ) -> Result<Option<ThreadRecord>, StoreError> {
        let row = sqlx::query_as::<_, ThreadRow>(
            "SELECT trigger_id, workspace, user_ack, message_timestamp, incident_id, channel, \
                    channel_id \
             FROM slack_message WHERE message_timestamp = $1 AND channel_id = $2",
        )
        .bind(message_ts)
        .bind(channel_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(ThreadRecord::from))
    }
}
