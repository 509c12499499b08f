//! Payflow API server entry point.

use std::sync::Arc;

use payflow_api::config::{ApiConfig, env_lookup};
use payflow_api::error::AppError;
use payflow_api::order_client::HttpOrderLookup;
use payflow_api::routes;
use payflow_api::shutdown::shutdown_token;
use payflow_api::state::AppState;
use payflow_api::telemetry;
use payflow_core::clock::SystemClock;
use payflow_core::id::RandomIdGenerator;
use payflow_ledger::pg_payment_repository::PgPaymentRepository;
use payflow_payments::domain::order::{FixedOrderLookup, FixedOrderResponse, OrderLookup};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let _telemetry = telemetry::init("payflow-api", &env_lookup)?;

    tracing::info!("Starting Payflow API server");

    let config = ApiConfig::from_env()?;
    let pool = config.database.connect().await?;

    let orders: Arc<dyn OrderLookup> = match &config.order_service {
        Some(order_service) => Arc::new(
            HttpOrderLookup::new(order_service).map_err(|e| AppError::Client(e.to_string()))?,
        ),
        None => {
            tracing::warn!("ORDER_SERVICE_URL not set, every order resolves to a fixed response");
            Arc::new(FixedOrderLookup::new(FixedOrderResponse::Success))
        }
    };

    let app_state = AppState::new(
        pool.clone(),
        Arc::new(SystemClock),
        Arc::new(RandomIdGenerator),
        Arc::new(PgPaymentRepository::new(pool)),
        orders,
    );

    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    let app = routes::router(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    let token = shutdown_token();
    axum::serve(listener, app)
        .with_graceful_shutdown(token.cancelled_owned())
        .await?;

    tracing::info!("Payflow API server stopped");
    Ok(())
}
