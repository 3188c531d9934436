//! Durable queue of unpublished business events (spec §3/§4.1).
//!
//! `outbox_events` rows are co-committed with the business mutation they
//! describe; this crate owns every state transition the publisher makes on
//! those rows plus the append-only `outbox_dlq` archive. Every mutating
//! operation takes an open `Transaction` so the caller controls commit
//! boundaries — the publisher commits once per batch (spec §4.3), never
//! per row.

mod error;
mod metrics;

pub use error::{OutboxError, OutboxResult};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{debug, warn};
use uuid::Uuid;

/// A durable unit of work awaiting publication, matching `outbox_events`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxEvent {
    pub id: Uuid,
    pub event_type: String,
    pub aggregate_type: String,
    pub aggregate_id: Uuid,
    pub payload: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
    pub attempt_count: i32,
    pub last_error: Option<String>,
}

/// Why a row was archived to the DLQ instead of retried further.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DlqReason {
    NonRetryable,
    MaxAttempts,
}

impl DlqReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DlqReason::NonRetryable => "non_retryable",
            DlqReason::MaxAttempts => "max_attempts",
        }
    }
}

/// An immutable archive row destined for `outbox_dlq`.
#[derive(Debug, Clone)]
pub struct DlqEntry {
    pub event_id: Uuid,
    pub event_type: String,
    pub aggregate_type: String,
    pub aggregate_id: Uuid,
    pub payload: Vec<u8>,
    pub error_reason: DlqReason,
    pub error_message: String,
    pub attempt_count: i32,
}

/// Repository of outbox/DLQ operations. Abstracted as a trait (per the
/// teacher's capability-set pattern) so the publisher loop can be tested
/// against an in-memory fake without a live Postgres instance.
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Fetch up to `limit` candidate rows, oldest `created_at` first with
    /// ascending `id` as the tie-break, locking each with
    /// `FOR UPDATE SKIP LOCKED` so concurrent publisher replicas never
    /// double-process a row (spec §4.1, §5).
    async fn fetch_unpublished(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        limit: i64,
        max_attempts: i32,
    ) -> OutboxResult<Vec<OutboxEvent>>;

    /// Idempotently mark a row published. Calling this twice on an
    /// already-published row is a no-op, not an error.
    async fn mark_published(&self, tx: &mut Transaction<'_, Postgres>, id: Uuid) -> OutboxResult<()>;

    /// Increment `attempt_count` and record `last_error` without touching
    /// `published_at`.
    async fn mark_failed(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        err: &str,
    ) -> OutboxResult<()>;

    /// Last bookkeeping call before a DLQ insert: clamps `attempt_count` to
    /// at least `terminal_attempts` so [`fetch_unpublished`] never selects
    /// the row again, regardless of the `max_attempts` the caller passes
    /// there in the future.
    async fn mark_terminal(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        err: &str,
        terminal_attempts: i32,
    ) -> OutboxResult<()>;

    /// Append an immutable DLQ row. Never updated, never deleted.
    async fn insert_dlq(&self, tx: &mut Transaction<'_, Postgres>, entry: &DlqEntry) -> OutboxResult<()>;

    /// Enqueue a new row, co-committed with whatever business mutation the
    /// caller's transaction also writes (spec §3/§4.1). `payload` is the
    /// already-serialized envelope, not the raw domain payload.
    async fn enqueue(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        event_type: &str,
        aggregate_type: &str,
        aggregate_id: Uuid,
        payload: &[u8],
    ) -> OutboxResult<Uuid>;
}

/// SQLx/Postgres-backed [`OutboxStore`].
#[derive(Clone)]
pub struct PgOutboxStore {
    pool: PgPool,
}

impl PgOutboxStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Pending count and oldest-pending age in seconds (0 if none pending);
    /// feeds the `outbox_pending_count`/`outbox_oldest_pending_age_seconds`
    /// gauges the publisher updates each poll.
    pub async fn pending_stats(&self) -> OutboxResult<(i64, i64)> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*)::BIGINT AS pending,
                COALESCE(EXTRACT(EPOCH FROM (NOW() - MIN(created_at)))::BIGINT, 0) AS age_seconds
            FROM outbox_events
            WHERE published_at IS NULL
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let pending: i64 = row.try_get("pending")?;
        let age: i64 = row.try_get("age_seconds")?;
        metrics::set_pending_gauges(pending, age);
        Ok((pending, age))
    }

    /// Resets `published_at`/`attempt_count`/`last_error` for rows created
    /// since `ts`, re-admitting them to the next [`fetch_unpublished`]
    /// batch. Resolves Open Question 3 (DLQ itself stays append-only; this
    /// is an outbox-row replay, not a DLQ mutation) — see DESIGN.md.
    pub async fn replay_since(&self, ts: DateTime<Utc>) -> OutboxResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE outbox_events
            SET published_at = NULL, attempt_count = 0, last_error = NULL
            WHERE created_at >= $1
            "#,
        )
        .bind(ts)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Same as [`Self::replay_since`] but scoped to an inclusive id range,
    /// for operational backfill of a specific known-bad batch.
    pub async fn replay_range(&self, from_id: Uuid, to_id: Uuid) -> OutboxResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE outbox_events
            SET published_at = NULL, attempt_count = 0, last_error = NULL
            WHERE id BETWEEN $1 AND $2
            "#,
        )
        .bind(from_id)
        .bind(to_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Deletes published rows older than `retention`; backs the outbox
    /// retention scheduler job (spec §4.5).
    pub async fn delete_published_before(&self, retention: chrono::Duration) -> OutboxResult<u64> {
        let cutoff = Utc::now() - retention;
        let result = sqlx::query("DELETE FROM outbox_events WHERE published_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl OutboxStore for PgOutboxStore {
    async fn fetch_unpublished(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        limit: i64,
        max_attempts: i32,
    ) -> OutboxResult<Vec<OutboxEvent>> {
        let rows = sqlx::query(
            r#"
            SELECT id, event_type, aggregate_type, aggregate_id, payload,
                   created_at, published_at, attempt_count, last_error
            FROM outbox_events
            WHERE published_at IS NULL AND attempt_count < $2
            ORDER BY created_at ASC, id ASC
            LIMIT $1
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(limit)
        .bind(max_attempts)
        .fetch_all(&mut **tx)
        .await?;

        let events = rows
            .into_iter()
            .map(|row| {
                Ok(OutboxEvent {
                    id: row.try_get("id")?,
                    event_type: row.try_get("event_type")?,
                    aggregate_type: row.try_get("aggregate_type")?,
                    aggregate_id: row.try_get("aggregate_id")?,
                    payload: row.try_get("payload")?,
                    created_at: row.try_get("created_at")?,
                    published_at: row.try_get("published_at")?,
                    attempt_count: row.try_get("attempt_count")?,
                    last_error: row.try_get("last_error")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;

        debug!(count = events.len(), "fetched unpublished outbox rows");
        Ok(events)
    }

    async fn mark_published(&self, tx: &mut Transaction<'_, Postgres>, id: Uuid) -> OutboxResult<()> {
        sqlx::query(
            "UPDATE outbox_events SET published_at = NOW() WHERE id = $1 AND published_at IS NULL",
        )
        .bind(id)
        .execute(&mut **tx)
        .await?;

        debug!(event_id = %id, "outbox row marked published");
        Ok(())
    }

    async fn mark_failed(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        err: &str,
    ) -> OutboxResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE outbox_events
            SET attempt_count = attempt_count + 1, last_error = $2
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(err)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            warn!(event_id = %id, "mark_failed found no matching outbox row");
            return Err(OutboxError::RowNotFound(id));
        }

        warn!(event_id = %id, error = %err, "outbox row marked failed");
        Ok(())
    }

    async fn mark_terminal(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        err: &str,
        terminal_attempts: i32,
    ) -> OutboxResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE outbox_events
            SET attempt_count = GREATEST(attempt_count + 1, $3), last_error = $2
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(err)
        .bind(terminal_attempts)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            warn!(event_id = %id, "mark_terminal found no matching outbox row");
            return Err(OutboxError::RowNotFound(id));
        }

        Ok(())
    }

    async fn insert_dlq(&self, tx: &mut Transaction<'_, Postgres>, entry: &DlqEntry) -> OutboxResult<()> {
        sqlx::query(
            r#"
            INSERT INTO outbox_dlq (
                id, event_id, event_type, aggregate_type, aggregate_id,
                payload, error_reason, error_message, attempt_count, failed_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW())
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(entry.event_id)
        .bind(&entry.event_type)
        .bind(&entry.aggregate_type)
        .bind(entry.aggregate_id)
        .bind(&entry.payload)
        .bind(entry.error_reason.as_str())
        .bind(&entry.error_message)
        .bind(entry.attempt_count)
        .execute(&mut **tx)
        .await?;

        metrics::inc_dlq(entry.error_reason.as_str());
        warn!(
            event_id = %entry.event_id,
            reason = entry.error_reason.as_str(),
            "outbox row archived to DLQ"
        );
        Ok(())
    }

    async fn enqueue(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        event_type: &str,
        aggregate_type: &str,
        aggregate_id: Uuid,
        payload: &[u8],
    ) -> OutboxResult<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO outbox_events (id, event_type, aggregate_type, aggregate_id, payload, created_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            "#,
        )
        .bind(id)
        .bind(event_type)
        .bind(aggregate_type)
        .bind(aggregate_id)
        .bind(payload)
        .execute(&mut **tx)
        .await?;

        debug!(event_id = %id, event_type, "outbox row enqueued");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dlq_reason_strings() {
        assert_eq!(DlqReason::NonRetryable.as_str(), "non_retryable");
        assert_eq!(DlqReason::MaxAttempts.as_str(), "max_attempts");
    }
}
