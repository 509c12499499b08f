//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, Utc};
use http_body_util::BodyExt;
use payflow_core::clock::Clock;
use payflow_core::id::RandomIdGenerator;
use payflow_ledger::pg_payment_repository::PgPaymentRepository;
use payflow_payments::domain::order::{FixedOrderLookup, FixedOrderResponse};
use payflow_test_support::FixedClock;
use sqlx::PgPool;
use tower::ServiceExt;

use payflow_api::routes;
use payflow_api::state::AppState;

/// Fixed timestamp used across all integration tests.
fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock(
        chrono::TimeZone::with_ymd_and_hms(&Utc, 2026, 1, 15, 10, 0, 0).unwrap(),
    ))
}

/// Build the full app router with a real `PgPaymentRepository`, a fixed
/// clock and an order service that always returns a 99.99 USD order.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with_orders(pool, FixedOrderResponse::Success)
}

/// Build the full app router with a canned order service outcome.
pub fn build_test_app_with_orders(pool: PgPool, response: FixedOrderResponse) -> Router {
    build_app(pool, fixed_clock(), response)
}

/// Build the full app router with a clock frozen at `now`.
pub fn build_test_app_at(pool: PgPool, now: DateTime<Utc>) -> Router {
    build_app(pool, Arc::new(FixedClock(now)), FixedOrderResponse::Success)
}

fn build_app(pool: PgPool, clock: Arc<dyn Clock>, response: FixedOrderResponse) -> Router {
    let payments = Arc::new(PgPaymentRepository::new(pool.clone()));
    let app_state = AppState::new(
        pool,
        clock,
        Arc::new(RandomIdGenerator),
        payments,
        Arc::new(FixedOrderLookup::new(response)),
    );
    routes::router(app_state)
}

async fn send(
    app: Router,
    request: Request<Body>,
) -> (StatusCode, Option<String>, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let replayed = response
        .headers()
        .get("idempotent-replayed")
        .map(|v| v.to_str().unwrap().to_owned());
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body_bytes).unwrap_or(serde_json::Value::Null);
    (status, replayed, json)
}

/// Send a POST request with a JSON body and the given headers. Returns the
/// status, the `idempotent-replayed` header if present, and the JSON body.
pub async fn post_json(
    app: Router,
    uri: &str,
    headers: &[(&str, &str)],
    body: &serde_json::Value,
) -> (StatusCode, Option<String>, serde_json::Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = builder
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();
    send(app, request).await
}

/// Send a GET request with the given headers and return the response.
pub async fn get_json(
    app: Router,
    uri: &str,
    headers: &[(&str, &str)],
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method("GET").uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let (status, _, json) = send(app, builder.body(Body::empty()).unwrap()).await;
    (status, json)
}
