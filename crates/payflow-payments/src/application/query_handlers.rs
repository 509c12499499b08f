//! Query handlers for the Payments context.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use payflow_core::error::DomainError;
use payflow_core::payment::{PaymentStatus, StoredPayment};
use payflow_core::repository::PaymentRepository;
use serde::Serialize;
use uuid::Uuid;

/// Read model of a payment as exposed to its owner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentView {
    /// Public payment identifier.
    pub payment_id: Uuid,
    /// The order this payment settles.
    pub external_order_id: Uuid,
    /// Charged amount, serialized as a decimal string.
    pub amount: BigDecimal,
    /// ISO-4217 currency code.
    pub currency: String,
    /// Lifecycle status.
    pub status: PaymentStatus,
    /// When the payment was created.
    pub created_at: DateTime<Utc>,
    /// When the payment last changed.
    pub updated_at: DateTime<Utc>,
}

impl From<StoredPayment> for PaymentView {
    fn from(payment: StoredPayment) -> Self {
        Self {
            payment_id: payment.payment_id,
            external_order_id: payment.external_order_id,
            amount: payment.amount,
            currency: payment.currency,
            status: payment.status,
            created_at: payment.created_at,
            updated_at: payment.updated_at,
        }
    }
}

/// Retrieves a payment owned by `user_id`.
///
/// Payments belonging to other users are reported as not found.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if no such payment is visible to the user,
/// or `DomainError::Infrastructure` if the store fails.
pub async fn get_payment(
    payment_id: Uuid,
    user_id: i64,
    repo: &dyn PaymentRepository,
) -> Result<PaymentView, DomainError> {
    match repo.find_by_payment_id(payment_id).await? {
        Some(payment) if payment.user_id == user_id => Ok(PaymentView::from(payment)),
        _ => Err(DomainError::NotFound(payment_id)),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use payflow_core::error::DomainError;
    use uuid::Uuid;

    use super::get_payment;
    use crate::application::command_handlers::handle_create_payment;
    use crate::domain::commands::CreatePayment;
    use crate::domain::order::{FixedOrderLookup, FixedOrderResponse};
    use payflow_test_support::{
        FailingPaymentRepository, FixedClock, InMemoryLedger, SequenceIdGenerator,
    };

    async fn seeded_ledger(user_id: i64, payment_id: Uuid) -> InMemoryLedger {
        let clock = FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap());
        let ids = SequenceIdGenerator::new(vec![payment_id]);
        let orders = FixedOrderLookup::new(FixedOrderResponse::Success);
        let ledger = InMemoryLedger::new();
        let command = CreatePayment {
            correlation_id: Uuid::new_v4(),
            user_id,
            idempotency_key: Uuid::new_v4(),
            external_order_id: Uuid::new_v4(),
        };
        handle_create_payment(&command, &clock, &ids, &orders, &ledger)
            .await
            .unwrap();
        ledger
    }

    #[tokio::test]
    async fn test_get_payment_returns_view_for_owner() {
        // Arrange
        let payment_id = Uuid::new_v4();
        let ledger = seeded_ledger(7, payment_id).await;

        // Act
        let view = get_payment(payment_id, 7, &ledger).await.unwrap();

        // Assert
        assert_eq!(view.payment_id, payment_id);
        assert_eq!(view.currency, "USD");
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["amount"], "99.99");
        assert_eq!(json["status"], "PENDING");
    }

    #[tokio::test]
    async fn test_get_payment_hides_other_users_payments() {
        let payment_id = Uuid::new_v4();
        let ledger = seeded_ledger(7, payment_id).await;

        let result = get_payment(payment_id, 8, &ledger).await;

        assert!(matches!(result, Err(DomainError::NotFound(id)) if id == payment_id));
    }

    #[tokio::test]
    async fn test_get_payment_unknown_id_is_not_found() {
        let ledger = InMemoryLedger::new();

        let result = get_payment(Uuid::new_v4(), 7, &ledger).await;

        assert!(matches!(result, Err(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_get_payment_propagates_store_failure() {
        let result = get_payment(Uuid::new_v4(), 7, &FailingPaymentRepository).await;

        assert!(matches!(result, Err(DomainError::Infrastructure(_))));
    }
}
