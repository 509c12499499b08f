//! Domain events for the Payments context.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use payflow_core::event::DomainEvent;
use payflow_core::payment::{NewPayment, PaymentStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Aggregate type for every payment event.
pub const PAYMENT_AGGREGATE: &str = "payment";

/// Emitted when a payment is created; the payload is a snapshot of the payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentCreated {
    /// The payment identifier.
    pub payment_id: Uuid,
    /// The upstream order being paid.
    pub external_order_id: Uuid,
    /// The paying user.
    pub user_id: i64,
    /// The idempotency key the payment was created under.
    pub idempotency_key: Uuid,
    /// Payment amount.
    pub amount: BigDecimal,
    /// ISO-4217 currency code.
    pub currency: String,
    /// Status at creation.
    pub status: PaymentStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<&NewPayment> for PaymentCreated {
    fn from(payment: &NewPayment) -> Self {
        Self {
            payment_id: payment.payment_id,
            external_order_id: payment.external_order_id,
            user_id: payment.user_id,
            idempotency_key: payment.idempotency_key,
            amount: payment.amount.clone(),
            currency: payment.currency.clone(),
            status: payment.status,
            created_at: payment.created_at,
        }
    }
}

impl DomainEvent for PaymentCreated {
    fn aggregate_type(&self) -> &'static str {
        PAYMENT_AGGREGATE
    }

    fn event_type(&self) -> &'static str {
        "payment_created"
    }

    fn aggregate_id(&self) -> Uuid {
        self.payment_id
    }

    fn to_payload(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_payload_is_a_snapshot_of_the_payment() {
        // Arrange
        let created_at = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
        let payment = NewPayment {
            payment_id: Uuid::new_v4(),
            external_order_id: Uuid::new_v4(),
            user_id: 1,
            idempotency_key: Uuid::new_v4(),
            amount: BigDecimal::from_str("99.99").unwrap(),
            currency: "USD".to_owned(),
            status: PaymentStatus::Pending,
            created_at,
        };

        // Act
        let event = PaymentCreated::from(&payment);
        let payload = event.to_payload().unwrap();

        // Assert
        assert_eq!(event.aggregate_id(), payment.payment_id);
        assert_eq!(event.event_type(), "payment_created");
        assert_eq!(event.aggregate_type(), "payment");
        assert_eq!(payload["payment_id"], payment.payment_id.to_string());
        assert_eq!(payload["amount"], "99.99");
        assert_eq!(payload["currency"], "USD");
        assert_eq!(payload["status"], "PENDING");
        assert_eq!(payload["user_id"], 1);

        let decoded: PaymentCreated = serde_json::from_value(payload).unwrap();
        assert_eq!(decoded, event);
    }
}
