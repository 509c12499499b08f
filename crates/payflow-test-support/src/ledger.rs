//! In-memory ledger: a `PaymentRepository` and `OutboxStore` sharing one
//! state, with the locking and commit semantics of the Postgres store.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use payflow_core::error::DomainError;
use payflow_core::outbox::{
    NewOutboxRecord, OutboxClaim, OutboxRecord, OutboxStatus, OutboxStore,
};
use payflow_core::payment::{NewPayment, StoredPayment};
use payflow_core::repository::PaymentRepository;
use uuid::Uuid;

#[derive(Debug, Default)]
struct LedgerState {
    payments: Vec<StoredPayment>,
    outbox: Vec<OutboxRecord>,
    locked: HashSet<i64>,
    next_payment_id: i64,
    next_outbox_id: i64,
    fail_commits: bool,
}

impl LedgerState {
    fn push_outbox(&mut self, event: &NewOutboxRecord) -> i64 {
        self.next_outbox_id += 1;
        let id = self.next_outbox_id;
        self.outbox.push(OutboxRecord {
            id,
            aggregate_id: event.aggregate_id,
            aggregate_type: event.aggregate_type.clone(),
            event_type: event.event_type.clone(),
            payload: event.payload.clone(),
            status: OutboxStatus::Pending,
            attempts: 0,
            last_error: None,
            created_at: event.created_at,
            updated_at: event.created_at,
        });
        id
    }
}

/// A shared in-memory ledger.
///
/// Clones share state, so one clone can be handed to the code under test
/// while another inspects the result. Claims lock their records until they
/// are committed or dropped; status changes are staged and only applied on
/// commit.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl InMemoryLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a pending outbox record directly and returns its id.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn insert_outbox(&self, event: &NewOutboxRecord) -> i64 {
        self.state.lock().unwrap().push_outbox(event)
    }

    /// Makes every subsequent claim commit fail, leaving its rows untouched.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn fail_commits(&self, fail: bool) {
        self.state.lock().unwrap().fail_commits = fail;
    }

    /// Returns a snapshot of all stored payments.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn payments(&self) -> Vec<StoredPayment> {
        self.state.lock().unwrap().payments.clone()
    }

    /// Returns a snapshot of all outbox records, in insertion order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn outbox_records(&self) -> Vec<OutboxRecord> {
        self.state.lock().unwrap().outbox.clone()
    }

    /// Returns a snapshot of one outbox record.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn outbox_record(&self, id: i64) -> Option<OutboxRecord> {
        self.state
            .lock()
            .unwrap()
            .outbox
            .iter()
            .find(|record| record.id == id)
            .cloned()
    }
}

#[async_trait]
impl PaymentRepository for InMemoryLedger {
    async fn create_with_event(
        &self,
        payment: &NewPayment,
        event: &NewOutboxRecord,
    ) -> Result<StoredPayment, DomainError> {
        let mut state = self.state.lock().unwrap();
        if state.payments.iter().any(|p| {
            p.user_id == payment.user_id && p.idempotency_key == payment.idempotency_key
        }) {
            return Err(DomainError::DuplicateRequest {
                user_id: payment.user_id,
                idempotency_key: payment.idempotency_key,
            });
        }
        if state
            .payments
            .iter()
            .any(|p| p.payment_id == payment.payment_id)
        {
            return Err(DomainError::Infrastructure(format!(
                "payment id {} already exists",
                payment.payment_id
            )));
        }

        state.next_payment_id += 1;
        let stored = StoredPayment::from_new(state.next_payment_id, payment);
        state.payments.push(stored.clone());
        state.push_outbox(event);
        Ok(stored)
    }

    async fn find_by_idempotency_key(
        &self,
        user_id: i64,
        idempotency_key: Uuid,
    ) -> Result<Option<StoredPayment>, DomainError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .payments
            .iter()
            .find(|p| p.user_id == user_id && p.idempotency_key == idempotency_key)
            .cloned())
    }

    async fn find_by_payment_id(
        &self,
        payment_id: Uuid,
    ) -> Result<Option<StoredPayment>, DomainError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .payments
            .iter()
            .find(|p| p.payment_id == payment_id)
            .cloned())
    }
}

#[async_trait]
impl OutboxStore for InMemoryLedger {
    async fn claim_pending(&self, limit: i64) -> Result<Box<dyn OutboxClaim>, DomainError> {
        let limit = usize::try_from(limit).unwrap_or(0);
        let mut state = self.state.lock().unwrap();

        let mut records: Vec<OutboxRecord> = state
            .outbox
            .iter()
            .filter(|r| r.status == OutboxStatus::Pending && !state.locked.contains(&r.id))
            .cloned()
            .collect();
        records.sort_by_key(|r| (r.created_at, r.id));
        records.truncate(limit);

        for record in &records {
            state.locked.insert(record.id);
        }

        Ok(Box::new(InMemoryClaim {
            state: Arc::clone(&self.state),
            records,
            committed: false,
        }))
    }
}

struct InMemoryClaim {
    state: Arc<Mutex<LedgerState>>,
    records: Vec<OutboxRecord>,
    committed: bool,
}

impl InMemoryClaim {
    fn stage(
        &mut self,
        id: i64,
        next: OutboxStatus,
        error: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| {
                DomainError::Infrastructure(format!("outbox record {id} is not claimed"))
            })?;
        if record.status != OutboxStatus::Pending {
            return Err(DomainError::Infrastructure(format!(
                "outbox record {id} is already {}",
                record.status
            )));
        }
        if let Some(error) = error {
            record.attempts += 1;
            record.last_error = Some(error.to_owned());
        }
        record.status = next;
        record.updated_at = at;
        Ok(())
    }

    fn release(&self, state: &mut LedgerState) {
        for record in &self.records {
            state.locked.remove(&record.id);
        }
    }
}

#[async_trait]
impl OutboxClaim for InMemoryClaim {
    fn records(&self) -> &[OutboxRecord] {
        &self.records
    }

    async fn mark_published(&mut self, id: i64, at: DateTime<Utc>) -> Result<(), DomainError> {
        self.stage(id, OutboxStatus::Published, None, at)
    }

    async fn mark_retry(
        &mut self,
        id: i64,
        error: &str,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.stage(id, OutboxStatus::Pending, Some(error), at)
    }

    async fn mark_failed(
        &mut self,
        id: i64,
        error: &str,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.stage(id, OutboxStatus::Failed, Some(error), at)
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        let mut this = self;
        {
            let mut state = this.state.lock().unwrap();
            if state.fail_commits {
                // Locks are released by `Drop`, as on rollback.
                return Err(DomainError::Infrastructure("commit failed".into()));
            }
            for claimed in &this.records {
                if let Some(stored) = state.outbox.iter_mut().find(|r| r.id == claimed.id) {
                    *stored = claimed.clone();
                }
            }
            this.release(&mut state);
        }
        this.committed = true;
        Ok(())
    }
}

impl Drop for InMemoryClaim {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if let Ok(mut state) = self.state.lock() {
            self.release(&mut state);
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    use super::*;

    fn event(seconds: i64) -> NewOutboxRecord {
        NewOutboxRecord {
            aggregate_id: Uuid::new_v4(),
            aggregate_type: "payment".into(),
            event_type: "payment_created".into(),
            payload: json!({}),
            created_at: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
                + Duration::seconds(seconds),
        }
    }

    #[tokio::test]
    async fn test_claims_are_disjoint_until_released() {
        // Arrange
        let ledger = InMemoryLedger::new();
        for i in 0..3 {
            ledger.insert_outbox(&event(i));
        }

        // Act
        let first = ledger.claim_pending(2).await.unwrap();
        let second = ledger.claim_pending(2).await.unwrap();

        // Assert
        let first_ids: Vec<i64> = first.records().iter().map(|r| r.id).collect();
        let second_ids: Vec<i64> = second.records().iter().map(|r| r.id).collect();
        assert_eq!(first_ids, vec![1, 2]);
        assert_eq!(second_ids, vec![3]);

        drop(first);
        let third = ledger.claim_pending(10).await.unwrap();
        assert_eq!(third.records().len(), 2);
    }

    #[tokio::test]
    async fn test_changes_apply_only_on_commit() {
        // Arrange
        let ledger = InMemoryLedger::new();
        let id = ledger.insert_outbox(&event(0));
        let at = Utc.with_ymd_and_hms(2026, 1, 15, 11, 0, 0).unwrap();

        // Act
        let mut claim = ledger.claim_pending(10).await.unwrap();
        claim.mark_published(id, at).await.unwrap();
        assert_eq!(
            ledger.outbox_record(id).unwrap().status,
            OutboxStatus::Pending
        );
        claim.commit().await.unwrap();

        // Assert
        let record = ledger.outbox_record(id).unwrap();
        assert_eq!(record.status, OutboxStatus::Published);
        assert_eq!(record.updated_at, at);
    }

    #[tokio::test]
    async fn test_terminal_record_cannot_be_marked_again() {
        let ledger = InMemoryLedger::new();
        let id = ledger.insert_outbox(&event(0));
        let at = Utc::now();

        let mut claim = ledger.claim_pending(10).await.unwrap();
        claim.mark_failed(id, "boom", at).await.unwrap();
        let again = claim.mark_published(id, at).await;

        assert!(matches!(again, Err(DomainError::Infrastructure(_))));
    }
}
