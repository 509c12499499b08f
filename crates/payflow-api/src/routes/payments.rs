//! Routes for the Payments bounded context.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use payflow_core::error::DomainError;
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use payflow_payments::application::query_handlers::PaymentView;
use payflow_payments::application::{command_handlers, query_handlers};
use payflow_payments::domain::commands;

use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the client's idempotency key.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";
/// Header carrying the authenticated user id.
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header set on responses that replay an earlier request.
pub const REPLAYED_HEADER: &str = "idempotent-replayed";

/// Request body for POST /v1/payments.
#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    /// The order to pay for.
    pub external_order_id: Uuid,
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, ApiError> {
    headers
        .get(name)
        .ok_or_else(|| DomainError::Validation(format!("missing {name} header")))?
        .to_str()
        .map(str::trim)
        .map_err(|_| ApiError(DomainError::Validation(format!("{name} header is not valid text"))))
}

fn user_id(headers: &HeaderMap) -> Result<i64, ApiError> {
    let raw = header(headers, USER_ID_HEADER)?;
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ApiError(DomainError::Validation(format!(
            "{USER_ID_HEADER} must be a positive integer, got {raw:?}"
        )))),
    }
}

fn idempotency_key(headers: &HeaderMap) -> Result<Uuid, ApiError> {
    let raw = header(headers, IDEMPOTENCY_KEY_HEADER)?;
    Uuid::parse_str(raw).map_err(|_| {
        ApiError(DomainError::Validation(format!(
            "{IDEMPOTENCY_KEY_HEADER} must be a UUID, got {raw:?}"
        )))
    })
}

/// POST /v1/payments
///
/// Answers `202 Accepted` for a new payment and `200 OK` with the
/// `idempotent-replayed` header when the idempotency key was already used
/// for the same order.
#[instrument(skip(state, headers, request), fields(external_order_id = %request.external_order_id))]
async fn create_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreatePaymentRequest>,
) -> Result<Response, ApiError> {
    let command = commands::CreatePayment {
        correlation_id: Uuid::new_v4(),
        user_id: user_id(&headers)?,
        idempotency_key: idempotency_key(&headers)?,
        external_order_id: request.external_order_id,
    };

    info!(
        correlation_id = %command.correlation_id,
        user_id = command.user_id,
        "handling create_payment command"
    );

    let creation = command_handlers::handle_create_payment(
        &command,
        state.clock.as_ref(),
        state.ids.as_ref(),
        state.orders.as_ref(),
        state.payments.as_ref(),
    )
    .await?;

    let body = Json(PaymentView::from(creation.payment));
    if creation.replayed {
        Ok((
            StatusCode::OK,
            [(
                HeaderName::from_static(REPLAYED_HEADER),
                HeaderValue::from_static("true"),
            )],
            body,
        )
            .into_response())
    } else {
        Ok((StatusCode::ACCEPTED, body).into_response())
    }
}

/// GET /v1/payments/{payment_id}
#[instrument(skip(state, headers))]
async fn get_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(payment_id): Path<Uuid>,
) -> Result<Json<PaymentView>, ApiError> {
    let user_id = user_id(&headers)?;
    let view = query_handlers::get_payment(payment_id, user_id, state.payments.as_ref()).await?;
    Ok(Json(view))
}

/// Returns the router for the payments context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_payment))
        .route("/{payment_id}", get(get_payment))
}
