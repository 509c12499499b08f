//! Shared application state.

use std::sync::Arc;

use payflow_core::clock::Clock;
use payflow_core::id::IdGenerator;
use payflow_core::repository::PaymentRepository;
use payflow_payments::domain::order::OrderLookup;
use sqlx::PgPool;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool, used for readiness checks.
    pub db_pool: PgPool,
    /// Clock for deterministic timestamps.
    pub clock: Arc<dyn Clock>,
    /// Source of new payment identifiers.
    pub ids: Arc<dyn IdGenerator>,
    /// Payment ledger.
    pub payments: Arc<dyn PaymentRepository>,
    /// Upstream order service.
    pub orders: Arc<dyn OrderLookup>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        db_pool: PgPool,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        payments: Arc<dyn PaymentRepository>,
        orders: Arc<dyn OrderLookup>,
    ) -> Self {
        Self {
            db_pool,
            clock,
            ids,
            payments,
            orders,
        }
    }
}
