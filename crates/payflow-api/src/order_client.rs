//! HTTP client for the upstream order service.
//!
//! `GET {base_url}/v1/orders/{external_order_id}?user_id={user_id}` returns
//! the order as JSON. 404 means the order does not exist, 403 that it belongs
//! to another user, and any other 4xx that the request was refused. Timeouts,
//! connection failures and 5xx answers mean the service is unavailable.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument};
use uuid::Uuid;

use payflow_payments::domain::order::{Order, OrderLookup, OrderLookupError};

use crate::config::OrderServiceConfig;

/// `OrderLookup` backed by the order service's HTTP API.
#[derive(Debug, Clone)]
pub struct HttpOrderLookup {
    client: Client,
    base_url: String,
}

impl HttpOrderLookup {
    /// Creates a client with the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns the client error if the TLS backend cannot be initialized.
    pub fn new(config: &OrderServiceConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }
}

#[async_trait]
impl OrderLookup for HttpOrderLookup {
    #[instrument(skip(self))]
    async fn get_order_for_user(
        &self,
        external_order_id: Uuid,
        user_id: i64,
    ) -> Result<Order, OrderLookupError> {
        let url = format!("{}/v1/orders/{external_order_id}", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("user_id", user_id)])
            .send()
            .await
            .map_err(|e| OrderLookupError::Unavailable(e.to_string()))?;

        let status = response.status();
        debug!(%status, "order service responded");
        match status {
            StatusCode::NOT_FOUND => return Err(OrderLookupError::NotFound(external_order_id)),
            StatusCode::FORBIDDEN => {
                return Err(OrderLookupError::UserMismatch {
                    external_order_id,
                    user_id,
                });
            }
            s if s.is_client_error() => {
                let body = response.text().await.unwrap_or_default();
                return Err(OrderLookupError::InvalidRequest(format!("{s}: {body}")));
            }
            s if !s.is_success() => {
                return Err(OrderLookupError::Unavailable(format!(
                    "order service answered {s}"
                )));
            }
            _ => {}
        }

        let order: Order = response
            .json()
            .await
            .map_err(|e| OrderLookupError::Unavailable(format!("malformed order response: {e}")))?;
        if order.user_id != user_id {
            return Err(OrderLookupError::UserMismatch {
                external_order_id,
                user_id,
            });
        }
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::extract::{Path, Query};
    use axum::http::StatusCode as AxumStatus;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde::Deserialize;
    use serde_json::{Value, json};

    use super::*;

    #[derive(Deserialize)]
    struct UserQuery {
        user_id: i64,
    }

    /// Serves a fake order service: order ids ending in `0` do not exist,
    /// ending in `5` fail with 500, ending in `2` carry the amount as a JSON
    /// number, and orders belong to user 1.
    async fn fake_order_service() -> String {
        async fn order(
            Path(id): Path<Uuid>,
            Query(query): Query<UserQuery>,
        ) -> Result<Json<Value>, AxumStatus> {
            let id_text = id.to_string();
            if id_text.ends_with('0') {
                return Err(AxumStatus::NOT_FOUND);
            }
            if id_text.ends_with('5') {
                return Err(AxumStatus::INTERNAL_SERVER_ERROR);
            }
            if query.user_id != 1 {
                return Err(AxumStatus::FORBIDDEN);
            }
            let amount = if id_text.ends_with('2') {
                json!(99.99)
            } else {
                json!("99.99")
            };
            Ok(Json(json!({
                "external_id": id,
                "user_id": 1,
                "service_name": "Service A",
                "amount": amount,
                "currency": "USD",
                "bank_account": "123456789",
                "bank_code": "XY",
            })))
        }

        let app = Router::new().route("/v1/orders/{id}", get(order));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn order_id_ending_with(last: char) -> Uuid {
        let mut text = Uuid::new_v4().to_string();
        text.pop();
        text.push(last);
        Uuid::parse_str(&text).unwrap()
    }

    async fn client() -> HttpOrderLookup {
        HttpOrderLookup::new(&OrderServiceConfig {
            base_url: fake_order_service().await,
            timeout: Duration::from_secs(2),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_returns_order_for_owner() {
        // Arrange
        let lookup = client().await;
        let order_id = order_id_ending_with('1');

        // Act
        let order = lookup.get_order_for_user(order_id, 1).await.unwrap();

        // Assert
        assert_eq!(order.external_id, order_id);
        assert_eq!(order.amount.to_string(), "99.99");
        assert_eq!(order.currency, "USD");
    }

    #[tokio::test]
    async fn test_numeric_amount_keeps_its_decimal_value() {
        // Arrange
        let lookup = client().await;
        let order_id = order_id_ending_with('2');

        // Act
        let order = lookup.get_order_for_user(order_id, 1).await.unwrap();

        // Assert
        assert_eq!(order.amount.to_string(), "99.99");
        assert_eq!(order.amount.with_scale(2), order.amount);
    }

    #[tokio::test]
    async fn test_unknown_order_is_not_found() {
        let lookup = client().await;
        let order_id = order_id_ending_with('0');

        let result = lookup.get_order_for_user(order_id, 1).await;

        assert_eq!(result, Err(OrderLookupError::NotFound(order_id)));
    }

    #[tokio::test]
    async fn test_other_users_order_is_a_mismatch() {
        let lookup = client().await;

        let result = lookup.get_order_for_user(order_id_ending_with('1'), 2).await;

        assert!(matches!(result, Err(OrderLookupError::UserMismatch { user_id: 2, .. })));
    }

    #[tokio::test]
    async fn test_server_error_is_unavailable() {
        let lookup = client().await;

        let result = lookup.get_order_for_user(order_id_ending_with('5'), 1).await;

        assert!(matches!(result, Err(OrderLookupError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_unavailable() {
        let lookup = HttpOrderLookup::new(&OrderServiceConfig {
            base_url: "http://127.0.0.1:9".to_owned(),
            timeout: Duration::from_millis(500),
        })
        .unwrap();

        let result = lookup.get_order_for_user(Uuid::new_v4(), 1).await;

        assert!(matches!(result, Err(OrderLookupError::Unavailable(_))));
    }
}
