//! Payment repository abstraction.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::DomainError;
use crate::outbox::NewOutboxRecord;
use crate::payment::{NewPayment, StoredPayment};

/// Repository trait for the payment write path and payment lookups.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Inserts `payment` and `event` in one transaction.
    ///
    /// Either both rows are committed or neither is.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::DuplicateRequest` when the
    /// `(user_id, idempotency_key)` pair already exists, and
    /// `DomainError::Infrastructure` for any other store failure.
    async fn create_with_event(
        &self,
        payment: &NewPayment,
        event: &NewOutboxRecord,
    ) -> Result<StoredPayment, DomainError>;

    /// Loads the payment created for `(user_id, idempotency_key)`, if any.
    async fn find_by_idempotency_key(
        &self,
        user_id: i64,
        idempotency_key: Uuid,
    ) -> Result<Option<StoredPayment>, DomainError>;

    /// Loads a payment by its public identifier.
    async fn find_by_payment_id(
        &self,
        payment_id: Uuid,
    ) -> Result<Option<StoredPayment>, DomainError>;
}
