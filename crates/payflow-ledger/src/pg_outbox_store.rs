//! `PostgreSQL` implementation of the `OutboxStore` claim protocol.
//!
//! A claim is one open transaction holding row locks taken with
//! `FOR UPDATE SKIP LOCKED`. Concurrent claims therefore never see each
//! other's rows, and a claim that is dropped (or whose process dies) rolls
//! back and leaves its rows pending for the next claimer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

use payflow_core::error::DomainError;
use payflow_core::outbox::{OutboxClaim, OutboxRecord, OutboxStore};

use crate::infrastructure;
use crate::rows::outbox_from_row;
use crate::schema::{CLAIM_PENDING, MARK_FAILED, MARK_PUBLISHED, MARK_RETRY};

/// PostgreSQL-backed outbox store.
#[derive(Debug, Clone)]
pub struct PgOutboxStore {
    pool: PgPool,
}

impl PgOutboxStore {
    /// Creates a new `PgOutboxStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OutboxStore for PgOutboxStore {
    async fn claim_pending(&self, limit: i64) -> Result<Box<dyn OutboxClaim>, DomainError> {
        let mut tx = self.pool.begin().await.map_err(infrastructure)?;

        let rows = sqlx::query(CLAIM_PENDING)
            .bind(limit)
            .fetch_all(&mut *tx)
            .await
            .map_err(infrastructure)?;
        let records = rows
            .iter()
            .map(outbox_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(claimed = records.len(), limit, "claimed pending outbox records");
        Ok(Box::new(PgOutboxClaim { tx, records }))
    }
}

/// A batch of outbox rows locked by an open transaction.
struct PgOutboxClaim {
    tx: Transaction<'static, Postgres>,
    records: Vec<OutboxRecord>,
}

impl PgOutboxClaim {
    fn ensure_claimed(&self, id: i64) -> Result<(), DomainError> {
        if self.records.iter().any(|r| r.id == id) {
            Ok(())
        } else {
            Err(DomainError::Infrastructure(format!(
                "outbox record {id} is not part of this claim"
            )))
        }
    }
}

/// Rejects an update that matched no pending row.
fn expect_one_row(id: i64, rows_affected: u64) -> Result<(), DomainError> {
    if rows_affected == 1 {
        Ok(())
    } else {
        Err(DomainError::Infrastructure(format!(
            "outbox record {id} is no longer pending"
        )))
    }
}

#[async_trait]
impl OutboxClaim for PgOutboxClaim {
    fn records(&self) -> &[OutboxRecord] {
        &self.records
    }

    async fn mark_published(&mut self, id: i64, at: DateTime<Utc>) -> Result<(), DomainError> {
        self.ensure_claimed(id)?;
        let result = sqlx::query(MARK_PUBLISHED)
            .bind(id)
            .bind(at)
            .execute(&mut *self.tx)
            .await
            .map_err(infrastructure)?;
        expect_one_row(id, result.rows_affected())
    }

    async fn mark_retry(
        &mut self,
        id: i64,
        error: &str,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.ensure_claimed(id)?;
        let result = sqlx::query(MARK_RETRY)
            .bind(id)
            .bind(error)
            .bind(at)
            .execute(&mut *self.tx)
            .await
            .map_err(infrastructure)?;
        expect_one_row(id, result.rows_affected())
    }

    async fn mark_failed(
        &mut self,
        id: i64,
        error: &str,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.ensure_claimed(id)?;
        let result = sqlx::query(MARK_FAILED)
            .bind(id)
            .bind(error)
            .bind(at)
            .execute(&mut *self.tx)
            .await
            .map_err(infrastructure)?;
        expect_one_row(id, result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        let claim = *self;
        claim.tx.commit().await.map_err(infrastructure)
    }
}
