//! Process configuration for the API server and the outbox relay.

use std::time::Duration;

use payflow_core::config::{ConfigError, Lookup, optional, parsed_or, positive_or, required};
use payflow_ledger::pool::DatabaseConfig;
use payflow_outbox::dispatcher::DispatcherConfig;
use payflow_outbox::publisher::RetryPolicy;

/// Reads the process environment.
#[must_use]
pub fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Where and how to reach the upstream order service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderServiceConfig {
    /// Base URL, without a trailing slash.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// API server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Ledger database.
    pub database: DatabaseConfig,
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Order service; `None` serves every order from a fixed response.
    pub order_service: Option<OrderServiceConfig>,
}

impl ApiConfig {
    /// Loads the API settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required setting is missing or any value is
    /// malformed.
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self, ConfigError> {
        let database = DatabaseConfig::from_lookup(lookup)?;
        let host = optional(lookup, "HOST").unwrap_or_else(|| "0.0.0.0".to_owned());
        let port = parsed_or(lookup, "PORT", 8000_u16)?;
        let order_service = match optional(lookup, "ORDER_SERVICE_URL") {
            Some(url) => Some(OrderServiceConfig {
                base_url: url.trim_end_matches('/').to_owned(),
                timeout: Duration::from_millis(positive_or(
                    lookup,
                    "ORDER_SERVICE_TIMEOUT_MS",
                    3000,
                )?),
            }),
            None => None,
        };

        Ok(Self {
            database,
            host,
            port,
            order_service,
        })
    }

    /// Loads the API settings from the process environment.
    ///
    /// # Errors
    ///
    /// See [`ApiConfig::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&env_lookup)
    }

    /// `host:port` to bind the listener to.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Outbox relay settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// Ledger database.
    pub database: DatabaseConfig,
    /// Kafka bootstrap servers.
    pub brokers: String,
    /// Kafka client id.
    pub client_id: String,
    /// Settings shared by every dispatcher worker.
    pub dispatcher: DispatcherConfig,
    /// Number of dispatcher workers in this process.
    pub workers: usize,
    /// Retry policy for transient publish failures.
    pub retry: RetryPolicy,
    /// How long one delivery may take before it counts as failed.
    pub publish_timeout: Duration,
}

impl RelayConfig {
    /// Loads the relay settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required setting is missing or any value is
    /// malformed.
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self, ConfigError> {
        let database = DatabaseConfig::from_lookup(lookup)?;
        let brokers = required(lookup, "KAFKA_BROKERS")?;
        let client_id =
            optional(lookup, "KAFKA_CLIENT_ID").unwrap_or_else(|| "payflow-relay".to_owned());

        let dispatcher = DispatcherConfig {
            batch_size: to_i64("OUTBOX_BATCH_SIZE", positive_or(lookup, "OUTBOX_BATCH_SIZE", 10)?)?,
            poll_interval: Duration::from_millis(positive_or(
                lookup,
                "OUTBOX_POLL_INTERVAL_MS",
                1000,
            )?),
            max_attempts: to_i32(
                "OUTBOX_MAX_ATTEMPTS",
                positive_or(lookup, "OUTBOX_MAX_ATTEMPTS", 5)?,
            )?,
            topic_prefix: optional(lookup, "OUTBOX_TOPIC_PREFIX").unwrap_or_default(),
            cycle_budget: Duration::from_millis(positive_or(
                lookup,
                "OUTBOX_CYCLE_BUDGET_MS",
                30_000,
            )?),
        };
        let workers =
            usize::try_from(positive_or(lookup, "OUTBOX_WORKERS", 1)?).unwrap_or(usize::MAX);
        let retry = RetryPolicy {
            max_retries: parsed_or(lookup, "PUBLISH_MAX_RETRIES", 5_u32)?,
            initial_backoff: Duration::from_millis(positive_or(
                lookup,
                "PUBLISH_RETRY_BACKOFF_MS",
                100,
            )?),
            max_backoff: Duration::from_millis(positive_or(
                lookup,
                "PUBLISH_MAX_BACKOFF_MS",
                5000,
            )?),
        };
        let publish_timeout =
            Duration::from_millis(positive_or(lookup, "PUBLISH_TIMEOUT_MS", 5000)?);

        Ok(Self {
            database,
            brokers,
            client_id,
            dispatcher,
            workers,
            retry,
            publish_timeout,
        })
    }

    /// Loads the relay settings from the process environment.
    ///
    /// # Errors
    ///
    /// See [`RelayConfig::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&env_lookup)
    }

    /// Producer settings derived from the relay settings.
    #[cfg(feature = "kafka")]
    #[must_use]
    pub fn kafka(&self) -> payflow_outbox::kafka::KafkaConfig {
        payflow_outbox::kafka::KafkaConfig {
            brokers: self.brokers.clone(),
            client_id: self.client_id.clone(),
            max_retries: self.retry.max_retries,
            retry_backoff: self.retry.initial_backoff,
            delivery_timeout: self.publish_timeout,
        }
    }
}

fn to_i64(key: &'static str, value: u64) -> Result<i64, ConfigError> {
    i64::try_from(value).map_err(|e| ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn to_i32(key: &'static str, value: u64) -> Result<i32, ConfigError> {
    i32::try_from(value).map_err(|e| ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: e.to_string(),
    })
}
