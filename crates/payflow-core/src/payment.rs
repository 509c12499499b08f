//! Payment records as persisted by the ledger store.

use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a payment.
///
/// The write path only ever creates `Pending` payments; later transitions are
/// owned by downstream processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// Created, awaiting downstream processing.
    Pending,
    /// Confirmed by downstream processing.
    Confirmed,
    /// Rejected by downstream processing.
    Failed,
}

impl PaymentStatus {
    /// The column value stored in the `payments.status` column.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "CONFIRMED" => Ok(Self::Confirmed),
            "FAILED" => Ok(Self::Failed),
            other => Err(format!("unknown payment status: {other}")),
        }
    }
}

/// A payment that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewPayment {
    /// Globally unique payment identifier.
    pub payment_id: Uuid,
    /// Reference to the upstream order.
    pub external_order_id: Uuid,
    /// The paying user.
    pub user_id: i64,
    /// Client-supplied key scoping this creation request.
    pub idempotency_key: Uuid,
    /// Amount resolved from the upstream order.
    pub amount: BigDecimal,
    /// ISO-4217 currency code.
    pub currency: String,
    /// Initial status.
    pub status: PaymentStatus,
    /// Creation timestamp (also used as `updated_at`).
    pub created_at: DateTime<Utc>,
}

/// Stored representation of a payment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredPayment {
    /// Store-assigned surrogate identifier.
    pub id: i64,
    /// Globally unique payment identifier.
    pub payment_id: Uuid,
    /// Reference to the upstream order.
    pub external_order_id: Uuid,
    /// The paying user.
    pub user_id: i64,
    /// Client-supplied key scoping the creation request.
    pub idempotency_key: Uuid,
    /// Payment amount.
    pub amount: BigDecimal,
    /// ISO-4217 currency code.
    pub currency: String,
    /// Current status.
    pub status: PaymentStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl StoredPayment {
    /// Builds the stored form of `payment` once the store has assigned `id`.
    #[must_use]
    pub fn from_new(id: i64, payment: &NewPayment) -> Self {
        Self {
            id,
            payment_id: payment.payment_id,
            external_order_id: payment.external_order_id,
            user_id: payment.user_id,
            idempotency_key: payment.idempotency_key,
            amount: payment.amount.clone(),
            currency: payment.currency.clone(),
            status: payment.status,
            created_at: payment.created_at,
            updated_at: payment.created_at,
        }
    }
}
