//! Port to the upstream order service.
//!
//! The payments context only needs the amount and currency of an order that
//! belongs to the requesting user. `FixedOrderLookup` answers with a canned
//! response and stands in for the real service in tests and local runs.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use payflow_core::error::DomainError;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// An upstream order with the details needed to charge it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// External order identifier.
    pub external_id: Uuid,
    /// Owner of the order.
    pub user_id: i64,
    /// Name of the service being paid for.
    pub service_name: String,
    /// Amount due. Accepts a decimal string or a JSON number.
    #[serde(deserialize_with = "decimal_from_text_or_number")]
    pub amount: BigDecimal,
    /// ISO-4217 currency code.
    pub currency: String,
    /// Bank account of the service.
    pub bank_account: String,
    /// Bank code of the service.
    pub bank_code: String,
}

/// Decodes an amount sent either as a decimal string or as a JSON number.
///
/// Numbers are parsed from their shortest decimal form, so `99.99` decodes to
/// exactly `99.99` rather than the nearest binary fraction.
fn decimal_from_text_or_number<'de, D>(deserializer: D) -> Result<BigDecimal, D::Error>
where
    D: Deserializer<'de>,
{
    struct DecimalVisitor;

    impl Visitor<'_> for DecimalVisitor {
        type Value = BigDecimal;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a decimal amount as a string or number")
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<BigDecimal, E> {
            BigDecimal::from_str(value.trim()).map_err(E::custom)
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<BigDecimal, E> {
            Ok(BigDecimal::from(value))
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<BigDecimal, E> {
            Ok(BigDecimal::from(value))
        }

        fn visit_f64<E: de::Error>(self, value: f64) -> Result<BigDecimal, E> {
            if !value.is_finite() {
                return Err(E::custom(format!("amount {value} is not finite")));
            }
            BigDecimal::from_str(&value.to_string()).map_err(E::custom)
        }
    }

    deserializer.deserialize_any(DecimalVisitor)
}

/// Order lookup failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderLookupError {
    /// No order exists with this identifier.
    #[error("order not found: {0}")]
    NotFound(Uuid),

    /// The order exists but belongs to someone else.
    #[error("order {external_order_id} does not belong to user {user_id}")]
    UserMismatch {
        /// The requested order.
        external_order_id: Uuid,
        /// The requesting user.
        user_id: i64,
    },

    /// The order service rejected the request.
    #[error("invalid order request: {0}")]
    InvalidRequest(String),

    /// The order service could not be reached or failed.
    #[error("order service unavailable: {0}")]
    Unavailable(String),
}

impl From<OrderLookupError> for DomainError {
    fn from(err: OrderLookupError) -> Self {
        match err {
            OrderLookupError::Unavailable(_) => Self::Infrastructure(err.to_string()),
            OrderLookupError::NotFound(_)
            | OrderLookupError::UserMismatch { .. }
            | OrderLookupError::InvalidRequest(_) => Self::Validation(err.to_string()),
        }
    }
}

/// Retrieves orders from the upstream order service.
#[async_trait]
pub trait OrderLookup: Send + Sync {
    /// Returns the order `external_order_id` if it belongs to `user_id`.
    async fn get_order_for_user(
        &self,
        external_order_id: Uuid,
        user_id: i64,
    ) -> Result<Order, OrderLookupError>;
}

/// Canned outcome returned by [`FixedOrderLookup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixedOrderResponse {
    /// Return a 99.99 USD order owned by the requesting user.
    Success,
    /// Fail with `OrderLookupError::NotFound`.
    NotFound,
    /// Fail with `OrderLookupError::UserMismatch`.
    UserMismatch,
    /// Fail with `OrderLookupError::Unavailable`.
    Internal,
    /// Fail with `OrderLookupError::InvalidRequest`.
    BadRequest,
}

/// Order lookup that always answers with the same outcome.
#[derive(Debug, Clone, Copy)]
pub struct FixedOrderLookup {
    response: FixedOrderResponse,
}

impl FixedOrderLookup {
    /// Creates a lookup that always yields `response`.
    #[must_use]
    pub fn new(response: FixedOrderResponse) -> Self {
        Self { response }
    }
}

#[async_trait]
impl OrderLookup for FixedOrderLookup {
    async fn get_order_for_user(
        &self,
        external_order_id: Uuid,
        user_id: i64,
    ) -> Result<Order, OrderLookupError> {
        match self.response {
            FixedOrderResponse::Success => Ok(Order {
                external_id: external_order_id,
                user_id,
                service_name: "Service A".to_owned(),
                amount: BigDecimal::from_str("99.99")
                    .map_err(|e| OrderLookupError::Unavailable(e.to_string()))?,
                currency: "USD".to_owned(),
                bank_account: "123456789".to_owned(),
                bank_code: "XY".to_owned(),
            }),
            FixedOrderResponse::NotFound => Err(OrderLookupError::NotFound(external_order_id)),
            FixedOrderResponse::UserMismatch => Err(OrderLookupError::UserMismatch {
                external_order_id,
                user_id,
            }),
            FixedOrderResponse::Internal => Err(OrderLookupError::Unavailable(
                "internal error occurred".to_owned(),
            )),
            FixedOrderResponse::BadRequest => Err(OrderLookupError::InvalidRequest(
                "invalid external order id".to_owned(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_success_returns_order_for_requesting_user() {
        let lookup = FixedOrderLookup::new(FixedOrderResponse::Success);
        let order_id = Uuid::new_v4();

        let order = lookup.get_order_for_user(order_id, 7).await.unwrap();

        assert_eq!(order.external_id, order_id);
        assert_eq!(order.user_id, 7);
        assert_eq!(order.amount, BigDecimal::from_str("99.99").unwrap());
        assert_eq!(order.currency, "USD");
    }

    fn order_json(amount: serde_json::Value) -> String {
        serde_json::json!({
            "external_id": Uuid::new_v4(),
            "user_id": 1,
            "service_name": "Service A",
            "amount": amount,
            "currency": "USD",
            "bank_account": "123456789",
            "bank_code": "XY",
        })
        .to_string()
    }

    #[test]
    fn test_numeric_amount_decodes_to_its_decimal_text() {
        let order: Order = serde_json::from_str(&order_json(serde_json::json!(99.99))).unwrap();

        assert_eq!(order.amount, BigDecimal::from_str("99.99").unwrap());
        assert_eq!(order.amount.to_string(), "99.99");
    }

    #[test]
    fn test_string_and_integer_amounts_decode() {
        let text: Order = serde_json::from_str(&order_json(serde_json::json!("12.50"))).unwrap();
        let whole: Order = serde_json::from_str(&order_json(serde_json::json!(40))).unwrap();

        assert_eq!(text.amount, BigDecimal::from_str("12.5").unwrap());
        assert_eq!(whole.amount, BigDecimal::from(40));
    }

    #[test]
    fn test_malformed_amount_is_rejected() {
        let result = serde_json::from_str::<Order>(&order_json(serde_json::json!("ninety")));

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_fixed_failures_map_to_domain_errors() {
        let order_id = Uuid::new_v4();

        let not_found = FixedOrderLookup::new(FixedOrderResponse::NotFound)
            .get_order_for_user(order_id, 1)
            .await
            .unwrap_err();
        assert!(matches!(
            DomainError::from(not_found),
            DomainError::Validation(_)
        ));

        let internal = FixedOrderLookup::new(FixedOrderResponse::Internal)
            .get_order_for_user(order_id, 1)
            .await
            .unwrap_err();
        assert!(matches!(
            DomainError::from(internal),
            DomainError::Infrastructure(_)
        ));
    }
}
