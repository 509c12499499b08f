//! Always-failing store doubles for error-path tests.

use async_trait::async_trait;
use payflow_core::error::DomainError;
use payflow_core::outbox::{NewOutboxRecord, OutboxClaim, OutboxStore};
use payflow_core::payment::{NewPayment, StoredPayment};
use payflow_core::repository::PaymentRepository;
use uuid::Uuid;

/// A payment repository that always returns an infrastructure error.
#[derive(Debug)]
pub struct FailingPaymentRepository;

#[async_trait]
impl PaymentRepository for FailingPaymentRepository {
    async fn create_with_event(
        &self,
        _payment: &NewPayment,
        _event: &NewOutboxRecord,
    ) -> Result<StoredPayment, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn find_by_idempotency_key(
        &self,
        _user_id: i64,
        _idempotency_key: Uuid,
    ) -> Result<Option<StoredPayment>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn find_by_payment_id(
        &self,
        _payment_id: Uuid,
    ) -> Result<Option<StoredPayment>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}

/// An outbox store whose claims always fail. Useful for checking that the
/// dispatcher survives an unreachable database.
#[derive(Debug)]
pub struct FailingOutboxStore;

#[async_trait]
impl OutboxStore for FailingOutboxStore {
    async fn claim_pending(&self, _limit: i64) -> Result<Box<dyn OutboxClaim>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}
