//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A payment was not found.
    #[error("payment not found: {0}")]
    NotFound(Uuid),

    /// The `(user_id, idempotency_key)` pair has already been used.
    #[error("duplicate request: idempotency key {idempotency_key} already used by user {user_id}")]
    DuplicateRequest {
        /// The user that sent the request.
        user_id: i64,
        /// The idempotency key that collided.
        idempotency_key: Uuid,
    },

    /// An idempotency key was reused for a different order.
    #[error(
        "idempotency key {idempotency_key} was already used for order {original_order_id}"
    )]
    IdempotencyConflict {
        /// The reused idempotency key.
        idempotency_key: Uuid,
        /// The order the key was first used for.
        original_order_id: Uuid,
    },

    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl DomainError {
    /// Whether the caller may retry the same request unchanged.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Infrastructure(_) | Self::DuplicateRequest { .. }
        )
    }
}
