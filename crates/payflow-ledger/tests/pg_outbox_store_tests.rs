//! Integration tests for `PgOutboxStore`.

use chrono::{DateTime, Duration, TimeZone, Utc};
use payflow_core::error::DomainError;
use payflow_core::outbox::{OutboxStatus, OutboxStore};
use payflow_ledger::pg_outbox_store::PgOutboxStore;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use uuid::Uuid;

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
}

/// Inserts a pending outbox row created `offset_secs` after the base time.
async fn insert_pending(pool: &PgPool, aggregate_id: Uuid, offset_secs: i64) -> i64 {
    let at = base_time() + Duration::seconds(offset_secs);
    sqlx::query_scalar(
        "INSERT INTO outbox \
         (aggregate_id, aggregate_type, event_type, payload, created_at, updated_at) \
         VALUES ($1, 'payment', 'payment_created', $2, $3, $3) RETURNING id",
    )
    .bind(aggregate_id)
    .bind(serde_json::json!({ "payment_id": aggregate_id }))
    .bind(at)
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn row_state(pool: &PgPool, id: i64) -> (String, i32, Option<String>) {
    sqlx::query_as("SELECT status, attempts, last_error FROM outbox WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await
        .unwrap()
}

// --- claim ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_claim_returns_oldest_pending_first(pool: PgPool) {
    // Arrange
    let store = PgOutboxStore::new(pool.clone());
    let newest = insert_pending(&pool, Uuid::new_v4(), 30).await;
    let oldest = insert_pending(&pool, Uuid::new_v4(), 0).await;
    let middle = insert_pending(&pool, Uuid::new_v4(), 10).await;

    // Act
    let claim = store.claim_pending(2).await.unwrap();

    // Assert
    let ids: Vec<i64> = claim.records().iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![oldest, middle]);
    assert!(!ids.contains(&newest));
    assert!(claim
        .records()
        .iter()
        .all(|r| r.status == OutboxStatus::Pending && r.attempts == 0));
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_concurrent_claims_never_share_rows(pool: PgPool) {
    // Arrange
    let store = PgOutboxStore::new(pool.clone());
    for offset in 0..5 {
        insert_pending(&pool, Uuid::new_v4(), offset).await;
    }

    // Act
    let first = store.claim_pending(3).await.unwrap();
    let second = store.claim_pending(10).await.unwrap();

    // Assert
    let first_ids: Vec<i64> = first.records().iter().map(|r| r.id).collect();
    let second_ids: Vec<i64> = second.records().iter().map(|r| r.id).collect();
    assert_eq!(first_ids.len(), 3);
    assert_eq!(second_ids.len(), 2);
    assert!(first_ids.iter().all(|id| !second_ids.contains(id)));
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_dropped_claim_releases_rows_unchanged(
    pool_opts: PgPoolOptions,
    connect_opts: PgConnectOptions,
) {
    // Arrange
    // One connection, so the reclaim waits for the rollback of the dropped claim.
    let pool = pool_opts
        .max_connections(1)
        .connect_with(connect_opts)
        .await
        .unwrap();
    let store = PgOutboxStore::new(pool.clone());
    let id = insert_pending(&pool, Uuid::new_v4(), 0).await;

    // Act
    {
        let mut claim = store.claim_pending(10).await.unwrap();
        claim.mark_published(id, Utc::now()).await.unwrap();
        // Dropped without commit.
    }
    let reclaimed = store.claim_pending(10).await.unwrap();

    // Assert
    assert_eq!(reclaimed.records().len(), 1);
    assert_eq!(reclaimed.records()[0].id, id);
    drop(reclaimed);
    assert_eq!(row_state(&pool, id).await.0, "PENDING");
}

// --- status updates ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_mark_published_is_visible_after_commit(pool: PgPool) {
    // Arrange
    let store = PgOutboxStore::new(pool.clone());
    let id = insert_pending(&pool, Uuid::new_v4(), 0).await;

    // Act
    let mut claim = store.claim_pending(10).await.unwrap();
    claim.mark_published(id, Utc::now()).await.unwrap();
    claim.commit().await.unwrap();

    // Assert
    assert_eq!(row_state(&pool, id).await, ("PUBLISHED".to_string(), 0, None));
    let next = store.claim_pending(10).await.unwrap();
    assert!(next.records().is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_mark_retry_keeps_row_pending_and_counts_attempt(pool: PgPool) {
    let store = PgOutboxStore::new(pool.clone());
    let id = insert_pending(&pool, Uuid::new_v4(), 0).await;

    let mut claim = store.claim_pending(10).await.unwrap();
    claim
        .mark_retry(id, "broker unavailable", Utc::now())
        .await
        .unwrap();
    claim.commit().await.unwrap();

    assert_eq!(
        row_state(&pool, id).await,
        (
            "PENDING".to_string(),
            1,
            Some("broker unavailable".to_string())
        )
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_mark_failed_is_terminal(pool: PgPool) {
    // Arrange
    let store = PgOutboxStore::new(pool.clone());
    let id = insert_pending(&pool, Uuid::new_v4(), 0).await;
    let mut claim = store.claim_pending(10).await.unwrap();

    // Act
    claim.mark_failed(id, "message too large", Utc::now()).await.unwrap();
    let again = claim.mark_published(id, Utc::now()).await;
    claim.commit().await.unwrap();

    // Assert
    assert!(matches!(again, Err(DomainError::Infrastructure(_))));
    let (status, attempts, last_error) = row_state(&pool, id).await;
    assert_eq!(status, "FAILED");
    assert_eq!(attempts, 1);
    assert_eq!(last_error.as_deref(), Some("message too large"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_marking_unclaimed_row_is_rejected(pool: PgPool) {
    let store = PgOutboxStore::new(pool.clone());
    let claimed = insert_pending(&pool, Uuid::new_v4(), 0).await;
    let other = insert_pending(&pool, Uuid::new_v4(), 10).await;

    let mut claim = store.claim_pending(1).await.unwrap();
    assert_eq!(claim.records()[0].id, claimed);
    let result = claim.mark_published(other, Utc::now()).await;

    assert!(matches!(result, Err(DomainError::Infrastructure(_))));
}
