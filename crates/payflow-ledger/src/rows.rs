//! Row decoding for the `payments` and `outbox` tables.

use bigdecimal::BigDecimal;
use payflow_core::error::DomainError;
use payflow_core::outbox::{OutboxRecord, OutboxStatus};
use payflow_core::payment::{PaymentStatus, StoredPayment};
use sqlx::Row;
use sqlx::postgres::PgRow;

use crate::infrastructure;

/// Decodes a payment row. `NUMERIC` values may come back with a wider scale
/// than the column declares, so the amount is normalized to cents.
pub(crate) fn payment_from_row(row: &PgRow) -> Result<StoredPayment, DomainError> {
    let status: String = row.try_get("status").map_err(infrastructure)?;
    let amount: BigDecimal = row.try_get("amount").map_err(infrastructure)?;
    Ok(StoredPayment {
        id: row.try_get("id").map_err(infrastructure)?,
        payment_id: row.try_get("payment_id").map_err(infrastructure)?,
        external_order_id: row.try_get("external_order_id").map_err(infrastructure)?,
        user_id: row.try_get("user_id").map_err(infrastructure)?,
        idempotency_key: row.try_get("idempotency_key").map_err(infrastructure)?,
        amount: amount.with_scale(2),
        currency: row.try_get("currency").map_err(infrastructure)?,
        status: status
            .parse::<PaymentStatus>()
            .map_err(DomainError::Infrastructure)?,
        created_at: row.try_get("created_at").map_err(infrastructure)?,
        updated_at: row.try_get("updated_at").map_err(infrastructure)?,
    })
}

pub(crate) fn outbox_from_row(row: &PgRow) -> Result<OutboxRecord, DomainError> {
    let status: String = row.try_get("status").map_err(infrastructure)?;
    Ok(OutboxRecord {
        id: row.try_get("id").map_err(infrastructure)?,
        aggregate_id: row.try_get("aggregate_id").map_err(infrastructure)?,
        aggregate_type: row.try_get("aggregate_type").map_err(infrastructure)?,
        event_type: row.try_get("event_type").map_err(infrastructure)?,
        payload: row.try_get("payload").map_err(infrastructure)?,
        status: status
            .parse::<OutboxStatus>()
            .map_err(DomainError::Infrastructure)?,
        attempts: row.try_get("attempts").map_err(infrastructure)?,
        last_error: row.try_get("last_error").map_err(infrastructure)?,
        created_at: row.try_get("created_at").map_err(infrastructure)?,
        updated_at: row.try_get("updated_at").map_err(infrastructure)?,
    })
}
