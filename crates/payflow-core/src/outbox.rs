//! Outbox records and the claim protocol used by the dispatcher.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;
use crate::event::DomainEvent;

/// Delivery state of an outbox record.
///
/// Transitions are one-way: `Pending → Published` or `Pending → Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutboxStatus {
    /// Waiting to be published.
    Pending,
    /// Acknowledged by the broker.
    Published,
    /// Gave up; kept for manual inspection.
    Failed,
}

impl OutboxStatus {
    /// The column value stored in `outbox.status`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Published => "PUBLISHED",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for OutboxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutboxStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "PUBLISHED" => Ok(Self::Published),
            "FAILED" => Ok(Self::Failed),
            other => Err(format!("unknown outbox status: {other}")),
        }
    }
}

/// An outbox record about to be inserted alongside its business mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOutboxRecord {
    /// Identifier of the aggregate the event announces.
    pub aggregate_id: Uuid,
    /// Aggregate type name.
    pub aggregate_type: String,
    /// Event type name.
    pub event_type: String,
    /// Serialized snapshot of the triggering entity.
    pub payload: serde_json::Value,
    /// Creation timestamp; drives publish order.
    pub created_at: DateTime<Utc>,
}

impl NewOutboxRecord {
    /// Builds a pending outbox record announcing `event`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the event payload cannot be
    /// serialized.
    pub fn from_event(
        event: &dyn DomainEvent,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let payload = event.to_payload().map_err(|e| {
            DomainError::Infrastructure(format!("event serialization failed: {e}"))
        })?;
        Ok(Self {
            aggregate_id: event.aggregate_id(),
            aggregate_type: event.aggregate_type().to_owned(),
            event_type: event.event_type().to_owned(),
            payload,
            created_at,
        })
    }
}

/// Stored representation of an outbox record.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboxRecord {
    /// Monotonic identifier.
    pub id: i64,
    /// Identifier of the aggregate the event announces.
    pub aggregate_id: Uuid,
    /// Aggregate type name.
    pub aggregate_type: String,
    /// Event type name.
    pub event_type: String,
    /// Serialized snapshot of the triggering entity.
    pub payload: serde_json::Value,
    /// Delivery state.
    pub status: OutboxStatus,
    /// Number of failed publish attempts so far.
    pub attempts: i32,
    /// Most recent publish failure.
    pub last_error: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Store side of the dispatcher: hands out exclusive batches of pending rows.
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Opens a transaction and locks up to `limit` pending records, oldest
    /// first, skipping records already locked by another claim.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the store is unreachable.
    async fn claim_pending(&self, limit: i64) -> Result<Box<dyn OutboxClaim>, DomainError>;
}

/// A batch of locked outbox records inside an open transaction.
///
/// Status changes are only visible once [`OutboxClaim::commit`] succeeds.
/// Dropping a claim without committing rolls it back and releases the rows.
#[async_trait]
pub trait OutboxClaim: Send {
    /// The claimed records, ordered by `created_at`.
    fn records(&self) -> &[OutboxRecord];

    /// Marks a claimed record as published.
    async fn mark_published(&mut self, id: i64, at: DateTime<Utc>) -> Result<(), DomainError>;

    /// Records a failed attempt and keeps the record pending.
    async fn mark_retry(
        &mut self,
        id: i64,
        error: &str,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError>;

    /// Records a failed attempt and moves the record to `FAILED`.
    async fn mark_failed(
        &mut self,
        id: i64,
        error: &str,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError>;

    /// Commits every status change made through this claim.
    async fn commit(self: Box<Self>) -> Result<(), DomainError>;
}
