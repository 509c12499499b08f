//! `PostgreSQL` implementation of the `PaymentRepository` trait.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use payflow_core::error::DomainError;
use payflow_core::outbox::NewOutboxRecord;
use payflow_core::payment::{NewPayment, StoredPayment};
use payflow_core::repository::PaymentRepository;

use crate::infrastructure;
use crate::rows::payment_from_row;
use crate::schema::{
    IDEMPOTENCY_CONSTRAINT, INSERT_OUTBOX, INSERT_PAYMENT, SELECT_PAYMENT_BY_IDEMPOTENCY_KEY,
    SELECT_PAYMENT_BY_PAYMENT_ID,
};

/// PostgreSQL-backed payment repository.
#[derive(Debug, Clone)]
pub struct PgPaymentRepository {
    pool: PgPool,
}

impl PgPaymentRepository {
    /// Creates a new `PgPaymentRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Classifies a failed payment insert.
fn classify_insert_error(err: sqlx::Error, payment: &NewPayment) -> DomainError {
    if let sqlx::Error::Database(db) = &err
        && db.is_unique_violation()
        && db.constraint() == Some(IDEMPOTENCY_CONSTRAINT)
    {
        return DomainError::DuplicateRequest {
            user_id: payment.user_id,
            idempotency_key: payment.idempotency_key,
        };
    }
    infrastructure(err)
}

#[async_trait]
impl PaymentRepository for PgPaymentRepository {
    async fn create_with_event(
        &self,
        payment: &NewPayment,
        event: &NewOutboxRecord,
    ) -> Result<StoredPayment, DomainError> {
        let mut tx = self.pool.begin().await.map_err(infrastructure)?;

        let row = sqlx::query(INSERT_PAYMENT)
            .bind(payment.payment_id)
            .bind(payment.external_order_id)
            .bind(payment.user_id)
            .bind(payment.idempotency_key)
            .bind(&payment.amount)
            .bind(&payment.currency)
            .bind(payment.status.as_str())
            .bind(payment.created_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| classify_insert_error(e, payment))?;
        let stored = payment_from_row(&row)?;

        sqlx::query(INSERT_OUTBOX)
            .bind(event.aggregate_id)
            .bind(&event.aggregate_type)
            .bind(&event.event_type)
            .bind(&event.payload)
            .bind(event.created_at)
            .execute(&mut *tx)
            .await
            .map_err(infrastructure)?;

        tx.commit().await.map_err(infrastructure)?;

        debug!(
            payment_id = %stored.payment_id,
            id = stored.id,
            "payment and outbox record committed"
        );
        Ok(stored)
    }

    async fn find_by_idempotency_key(
        &self,
        user_id: i64,
        idempotency_key: Uuid,
    ) -> Result<Option<StoredPayment>, DomainError> {
        let row = sqlx::query(SELECT_PAYMENT_BY_IDEMPOTENCY_KEY)
            .bind(user_id)
            .bind(idempotency_key)
            .fetch_optional(&self.pool)
            .await
            .map_err(infrastructure)?;
        row.as_ref().map(payment_from_row).transpose()
    }

    async fn find_by_payment_id(
        &self,
        payment_id: Uuid,
    ) -> Result<Option<StoredPayment>, DomainError> {
        let row = sqlx::query(SELECT_PAYMENT_BY_PAYMENT_ID)
            .bind(payment_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(infrastructure)?;
        row.as_ref().map(payment_from_row).transpose()
    }
}
