//! PostgreSQL-backed payment and outbox store for Payflow.

pub mod pg_outbox_store;
pub mod pg_payment_repository;
pub mod pool;
pub mod schema;

mod rows;

use payflow_core::error::DomainError;

/// Maps a store failure that has no domain meaning.
fn infrastructure(err: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(err.to_string())
}
