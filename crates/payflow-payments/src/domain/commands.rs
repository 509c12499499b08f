//! Commands for the Payments context.

use payflow_core::command::Command;
use uuid::Uuid;

/// Command to create a payment for an upstream order.
#[derive(Debug, Clone)]
pub struct CreatePayment {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The user paying for the order.
    pub user_id: i64,
    /// Client-supplied key; repeated keys replay the original result.
    pub idempotency_key: Uuid,
    /// The upstream order being paid.
    pub external_order_id: Uuid,
}

impl Command for CreatePayment {
    fn command_type(&self) -> &'static str {
        "payments.create_payment"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}
