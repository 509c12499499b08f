//! Construction of new payments from a command and its resolved order.

use bigdecimal::BigDecimal;
use chrono::{DateTime, SubsecRound, Utc};
use payflow_core::error::DomainError;
use payflow_core::payment::{NewPayment, PaymentStatus};
use uuid::Uuid;

use super::commands::CreatePayment;
use super::order::Order;

/// Builds the pending payment for `command`, charging `order`.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the order does not match the command
/// or carries an amount or currency the ledger cannot store.
pub fn pending_payment(
    command: &CreatePayment,
    order: &Order,
    payment_id: Uuid,
    now: DateTime<Utc>,
) -> Result<NewPayment, DomainError> {
    if order.external_id != command.external_order_id {
        return Err(DomainError::Validation(format!(
            "order service returned order {} for requested order {}",
            order.external_id, command.external_order_id
        )));
    }
    if order.user_id != command.user_id {
        return Err(DomainError::Validation(format!(
            "order {} does not belong to user {}",
            order.external_id, command.user_id
        )));
    }
    validate_amount(&order.amount)?;
    validate_currency(&order.currency)?;

    Ok(NewPayment {
        payment_id,
        external_order_id: command.external_order_id,
        user_id: command.user_id,
        idempotency_key: command.idempotency_key,
        amount: order.amount.with_scale(2),
        currency: order.currency.clone(),
        status: PaymentStatus::Pending,
        // The ledger keeps microseconds.
        created_at: now.trunc_subsecs(6),
    })
}

// NUMERIC(18, 2) leaves sixteen integral digits.
const MAX_WHOLE_AMOUNT: i64 = 10_000_000_000_000_000;

fn validate_amount(amount: &BigDecimal) -> Result<(), DomainError> {
    if *amount <= BigDecimal::from(0_i64) {
        return Err(DomainError::Validation(format!(
            "amount must be positive, got {amount}"
        )));
    }
    if *amount >= BigDecimal::from(MAX_WHOLE_AMOUNT) {
        return Err(DomainError::Validation(format!(
            "amount {amount} exceeds the ledger precision"
        )));
    }
    if amount.with_scale(2) != *amount {
        return Err(DomainError::Validation(format!(
            "amount {amount} has more than two decimal places"
        )));
    }
    Ok(())
}

fn validate_currency(currency: &str) -> Result<(), DomainError> {
    if currency.len() == 3 && currency.bytes().all(|b| b.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err(DomainError::Validation(format!(
            "currency must be a three-letter ISO-4217 code, got {currency:?}"
        )))
    }
}
