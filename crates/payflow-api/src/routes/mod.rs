//! HTTP routes.

pub mod health;
pub mod payments;

use axum::Router;

use crate::state::AppState;

/// Builds the application router. Used by `main.rs` and the integration
/// tests so both serve the same routes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .nest("/v1/payments", payments::router())
        .with_state(state)
}
