//! Command handlers for the Payments context.
//!
//! `handle_create_payment` is the payment write path: resolve the order, build
//! the pending payment and its `payment_created` outbox record, and persist
//! both in one store transaction. Repeated idempotency keys are detected by
//! the store's uniqueness constraint, never by a pre-check.

use payflow_core::clock::Clock;
use payflow_core::command::Command;
use payflow_core::error::DomainError;
use payflow_core::id::IdGenerator;
use payflow_core::outbox::NewOutboxRecord;
use payflow_core::payment::StoredPayment;
use payflow_core::repository::PaymentRepository;
use tracing::{info, warn};

use crate::domain::commands::CreatePayment;
use crate::domain::events::PaymentCreated;
use crate::domain::order::OrderLookup;
use crate::domain::payment::pending_payment;

/// Result of a create-payment request.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentCreation {
    /// The payment created by this request, or by the original request when
    /// `replayed` is set.
    pub payment: StoredPayment,
    /// Whether the idempotency key had already been used.
    pub replayed: bool,
}

/// Handles the `CreatePayment` command.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the order cannot be charged,
/// `DomainError::IdempotencyConflict` if the key was already used for another
/// order, and `DomainError::Infrastructure` if the order service or the store
/// fails.
pub async fn handle_create_payment(
    command: &CreatePayment,
    clock: &dyn Clock,
    ids: &dyn IdGenerator,
    orders: &dyn OrderLookup,
    repo: &dyn PaymentRepository,
) -> Result<PaymentCreation, DomainError> {
    let order = orders
        .get_order_for_user(command.external_order_id, command.user_id)
        .await?;

    let now = clock.now();
    let payment = pending_payment(command, &order, ids.next_id(), now)?;
    let event = NewOutboxRecord::from_event(&PaymentCreated::from(&payment), now)?;

    match repo.create_with_event(&payment, &event).await {
        Ok(stored) => {
            info!(
                command = command.command_type(),
                correlation_id = %command.correlation_id,
                payment_id = %stored.payment_id,
                "payment created"
            );
            Ok(PaymentCreation {
                payment: stored,
                replayed: false,
            })
        }
        Err(DomainError::DuplicateRequest { .. }) => replay(command, repo).await,
        Err(err) => Err(err),
    }
}

/// Resolves a duplicate request into the payment created by the original one.
async fn replay(
    command: &CreatePayment,
    repo: &dyn PaymentRepository,
) -> Result<PaymentCreation, DomainError> {
    let existing = repo
        .find_by_idempotency_key(command.user_id, command.idempotency_key)
        .await?
        .ok_or_else(|| {
            DomainError::Infrastructure(format!(
                "idempotency key {} reported as used but no payment was found",
                command.idempotency_key
            ))
        })?;

    if existing.external_order_id != command.external_order_id {
        warn!(
            correlation_id = %command.correlation_id,
            idempotency_key = %command.idempotency_key,
            original_order_id = %existing.external_order_id,
            requested_order_id = %command.external_order_id,
            "idempotency key reused for a different order"
        );
        return Err(DomainError::IdempotencyConflict {
            idempotency_key: command.idempotency_key,
            original_order_id: existing.external_order_id,
        });
    }

    info!(
        correlation_id = %command.correlation_id,
        payment_id = %existing.payment_id,
        "replaying payment for repeated idempotency key"
    );
    Ok(PaymentCreation {
        payment: existing,
        replayed: true,
    })
}
