//! The outbox dispatcher.
//!
//! Each cycle claims a batch of pending outbox records, publishes them in
//! `created_at` order and records the outcome of every row inside the claim's
//! transaction before committing. A cycle that cannot record an outcome
//! aborts and drops its claim, so rows published during that cycle are
//! delivered again by a later one.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use payflow_core::clock::Clock;
use payflow_core::error::DomainError;
use payflow_core::outbox::{OutboxRecord, OutboxStore};
use payflow_core::publisher::{MessagePublisher, OutboundMessage, PublishError};
use tokio::time::{Instant, timeout_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Message header carrying the outbox row id; consumers deduplicate on it.
pub const OUTBOX_ID_HEADER: &str = "outbox_id";
/// Message header carrying the event type.
pub const EVENT_TYPE_HEADER: &str = "event_type";
/// Message header carrying the aggregate type.
pub const AGGREGATE_TYPE_HEADER: &str = "aggregate_type";

/// Dispatcher tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Maximum number of records claimed per cycle.
    pub batch_size: i64,
    /// Pause between cycles that did not drain a full batch.
    pub poll_interval: Duration,
    /// Failed attempts after which a record is moved to `FAILED`.
    pub max_attempts: i32,
    /// Prepended to every topic name.
    pub topic_prefix: String,
    /// Longest a cycle may spend publishing while it holds its claim. A
    /// publish still running at the deadline counts as a transient failure
    /// and the remaining records are deferred to a later cycle.
    pub cycle_budget: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            poll_interval: Duration::from_secs(1),
            max_attempts: 5,
            topic_prefix: String::new(),
            cycle_budget: Duration::from_secs(30),
        }
    }
}

/// What a single cycle did with the records it claimed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Records claimed.
    pub claimed: usize,
    /// Records acknowledged by the broker and marked `PUBLISHED`.
    pub published: usize,
    /// Records that failed and stay `PENDING`.
    pub retried: usize,
    /// Records moved to `FAILED`.
    pub failed: usize,
    /// Records left untouched because an earlier record of the same
    /// aggregate failed in this cycle or the cycle ran out of time.
    pub deferred: usize,
}

impl CycleReport {
    /// Whether the cycle claimed a full batch and settled every record, in
    /// which case more work is probably waiting.
    #[must_use]
    pub fn drained_full_batch(&self, batch_size: i64) -> bool {
        let full = i64::try_from(self.claimed).is_ok_and(|claimed| claimed >= batch_size);
        full && self.retried == 0 && self.deferred == 0
    }
}

/// Topic an event is published to: `{prefix}{aggregate_type}.{event_type}`.
#[must_use]
pub fn topic_for(prefix: &str, aggregate_type: &str, event_type: &str) -> String {
    format!("{prefix}{aggregate_type}.{event_type}")
}

/// Builds the broker message for an outbox record.
///
/// # Errors
///
/// Returns `PublishError::Rejected` if the payload cannot be encoded.
pub fn message_for(
    record: &OutboxRecord,
    topic_prefix: &str,
) -> Result<OutboundMessage, PublishError> {
    let value = serde_json::to_vec(&record.payload)
        .map_err(|e| PublishError::Rejected(format!("payload encoding failed: {e}")))?;
    Ok(OutboundMessage {
        topic: topic_for(topic_prefix, &record.aggregate_type, &record.event_type),
        key: record.aggregate_id.to_string().into_bytes(),
        value,
        headers: vec![
            (OUTBOX_ID_HEADER.to_owned(), record.id.to_string()),
            (EVENT_TYPE_HEADER.to_owned(), record.event_type.clone()),
            (AGGREGATE_TYPE_HEADER.to_owned(), record.aggregate_type.clone()),
        ],
    })
}

/// Claims, publishes and settles outbox records.
///
/// Several dispatchers may run against the same store; they coordinate only
/// through the store's skip-locked claims.
#[derive(Clone)]
pub struct OutboxDispatcher {
    store: Arc<dyn OutboxStore>,
    publisher: Arc<dyn MessagePublisher>,
    clock: Arc<dyn Clock>,
    config: DispatcherConfig,
}

impl OutboxDispatcher {
    /// Creates a dispatcher.
    #[must_use]
    pub fn new(
        store: Arc<dyn OutboxStore>,
        publisher: Arc<dyn MessagePublisher>,
        clock: Arc<dyn Clock>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            store,
            publisher,
            clock,
            config,
        }
    }

    /// Runs one claim/publish/commit cycle.
    ///
    /// Publish failures are recorded per row and never abort the cycle.
    /// Publishing stops at `cycle_budget` so row locks are never held much
    /// longer than that.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the batch cannot be claimed,
    /// an outcome cannot be recorded, or the commit fails. Nothing from the
    /// cycle is persisted in that case.
    #[instrument(skip(self), fields(batch_size = self.config.batch_size))]
    pub async fn run_cycle(&self) -> Result<CycleReport, DomainError> {
        let mut claim = self.store.claim_pending(self.config.batch_size).await?;
        let records = claim.records().to_vec();
        let mut report = CycleReport {
            claimed: records.len(),
            ..CycleReport::default()
        };
        let mut blocked: HashSet<Uuid> = HashSet::new();
        let deadline = Instant::now() + self.config.cycle_budget;

        for record in &records {
            if Instant::now() >= deadline {
                debug!(outbox_id = record.id, "deferred, cycle budget spent");
                report.deferred += 1;
                continue;
            }
            if blocked.contains(&record.aggregate_id) {
                debug!(outbox_id = record.id, "deferred behind failed record of same aggregate");
                report.deferred += 1;
                continue;
            }

            let outcome = match message_for(record, &self.config.topic_prefix) {
                Ok(message) => timeout_at(deadline, self.publisher.publish(&message))
                    .await
                    .unwrap_or_else(|_| {
                        Err(PublishError::Transient(
                            "publish did not finish within the cycle budget".to_owned(),
                        ))
                    }),
                Err(err) => Err(err),
            };
            let now = self.clock.now();

            match outcome {
                Ok(delivery) => {
                    claim.mark_published(record.id, now).await?;
                    report.published += 1;
                    debug!(
                        outbox_id = record.id,
                        partition = delivery.partition,
                        offset = delivery.offset,
                        "outbox record published"
                    );
                }
                Err(err) => {
                    blocked.insert(record.aggregate_id);
                    let reason = err.to_string();
                    let attempts = record.attempts + 1;
                    if !err.is_transient() || attempts >= self.config.max_attempts {
                        claim.mark_failed(record.id, &reason, now).await?;
                        report.failed += 1;
                        error!(
                            outbox_id = record.id,
                            aggregate_id = %record.aggregate_id,
                            attempts,
                            error = %reason,
                            "outbox record moved to FAILED"
                        );
                    } else {
                        claim.mark_retry(record.id, &reason, now).await?;
                        report.retried += 1;
                        warn!(
                            outbox_id = record.id,
                            attempts,
                            error = %reason,
                            "publish failed, will retry"
                        );
                    }
                }
            }
        }

        claim.commit().await?;
        Ok(report)
    }

    /// Runs cycles until `shutdown` is cancelled.
    ///
    /// Cancellation is checked before every cycle and interrupts the pause
    /// between cycles; a cycle already in progress is completed.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(
            batch_size = self.config.batch_size,
            poll_interval_ms =
                u64::try_from(self.config.poll_interval.as_millis()).unwrap_or(u64::MAX),
            "outbox dispatcher started"
        );

        while !shutdown.is_cancelled() {
            let more_waiting = match self.run_cycle().await {
                Ok(report) => {
                    if report.claimed > 0 {
                        info!(
                            claimed = report.claimed,
                            published = report.published,
                            retried = report.retried,
                            failed = report.failed,
                            deferred = report.deferred,
                            "outbox cycle complete"
                        );
                    }
                    report.drained_full_batch(self.config.batch_size)
                }
                Err(err) => {
                    error!(error = %err, "outbox cycle aborted");
                    false
                }
            };

            if more_waiting {
                continue;
            }
            tokio::select! {
                () = shutdown.cancelled() => break,
                () = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        info!("outbox dispatcher stopped");
    }
}
