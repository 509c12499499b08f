//! Payflow outbox relay: publishes committed outbox records to Kafka.

use std::sync::Arc;

use payflow_api::config::{RelayConfig, env_lookup};
use payflow_api::error::AppError;
use payflow_api::shutdown::shutdown_token;
use payflow_api::telemetry;
use payflow_core::clock::SystemClock;
use payflow_ledger::pg_outbox_store::PgOutboxStore;
use payflow_outbox::dispatcher::OutboxDispatcher;
use payflow_outbox::kafka::KafkaPublisher;
use payflow_outbox::publisher::RetryingPublisher;
use tokio::task::JoinSet;
use tracing::Instrument;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let _telemetry = telemetry::init("payflow-relay", &env_lookup)?;

    tracing::info!("Starting Payflow outbox relay");

    let config = RelayConfig::from_env()?;
    let pool = config.database.connect().await?;

    let kafka = KafkaPublisher::new(&config.kafka()).map_err(|e| AppError::Client(e.to_string()))?;
    let publisher = Arc::new(RetryingPublisher::new(kafka, config.retry));
    let store = Arc::new(PgOutboxStore::new(pool));
    let dispatcher = OutboxDispatcher::new(
        store,
        publisher,
        Arc::new(SystemClock),
        config.dispatcher.clone(),
    );

    let token = shutdown_token();
    let mut workers = JoinSet::new();
    for worker in 0..config.workers {
        let dispatcher = dispatcher.clone();
        let token = token.clone();
        workers.spawn(
            async move { dispatcher.run(token).await }
                .instrument(tracing::info_span!("outbox_worker", worker)),
        );
    }
    tracing::info!(workers = config.workers, "outbox relay running");

    while let Some(result) = workers.join_next().await {
        if let Err(e) = result {
            tracing::error!(error = %e, "outbox worker panicked");
            token.cancel();
        }
    }

    tracing::info!("Payflow outbox relay stopped");
    Ok(())
}
