//! Kafka publisher backed by `rdkafka`'s `FutureProducer`.

use std::time::Duration;

use async_trait::async_trait;
use payflow_core::publisher::{Delivery, MessagePublisher, OutboundMessage, PublishError};
use rdkafka::config::ClientConfig;
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::message::{Header, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use tracing::info;

/// Producer settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KafkaConfig {
    /// Comma-separated bootstrap servers.
    pub brokers: String,
    /// Client identifier reported to the brokers.
    pub client_id: String,
    /// `message.send.max.retries` inside the producer.
    pub max_retries: u32,
    /// `retry.backoff.ms` inside the producer.
    pub retry_backoff: Duration,
    /// How long a single `publish` may wait for the acknowledgement.
    pub delivery_timeout: Duration,
}

/// Publishes with `acks=all` and idempotent production, waiting for the
/// broker acknowledgement of every message.
pub struct KafkaPublisher {
    producer: FutureProducer,
    delivery_timeout: Duration,
}

impl KafkaPublisher {
    /// Creates the producer. No connection is made until the first publish.
    ///
    /// # Errors
    ///
    /// Returns the client error if the configuration is rejected.
    pub fn new(config: &KafkaConfig) -> Result<Self, KafkaError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("client.id", &config.client_id)
            .set("acks", "all")
            .set("enable.idempotence", "true")
            .set("message.send.max.retries", config.max_retries.to_string())
            .set("retry.backoff.ms", config.retry_backoff.as_millis().to_string())
            .set(
                "message.timeout.ms",
                config.delivery_timeout.as_millis().to_string(),
            )
            .create()?;

        info!(brokers = %config.brokers, client_id = %config.client_id, "kafka producer created");
        Ok(Self {
            producer,
            delivery_timeout: config.delivery_timeout,
        })
    }
}

/// Sorts producer failures into retryable and permanent ones.
fn classify(err: &KafkaError) -> PublishError {
    match err.rdkafka_error_code() {
        Some(
            RDKafkaErrorCode::MessageSizeTooLarge
            | RDKafkaErrorCode::InvalidMessage
            | RDKafkaErrorCode::InvalidMessageSize
            | RDKafkaErrorCode::TopicAuthorizationFailed,
        ) => PublishError::Rejected(err.to_string()),
        _ => PublishError::Transient(err.to_string()),
    }
}

#[async_trait]
impl MessagePublisher for KafkaPublisher {
    async fn publish(&self, message: &OutboundMessage) -> Result<Delivery, PublishError> {
        let headers = message
            .headers
            .iter()
            .fold(OwnedHeaders::new(), |headers, (key, value)| {
                headers.insert(Header {
                    key: key.as_str(),
                    value: Some(value.as_str()),
                })
            });
        let record = FutureRecord::to(&message.topic)
            .key(&message.key)
            .payload(&message.value)
            .headers(headers);

        match self
            .producer
            .send(record, Timeout::After(self.delivery_timeout))
            .await
        {
            Ok((partition, offset)) => Ok(Delivery { partition, offset }),
            Err((err, _message)) => Err(classify(&err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oversized_message_is_rejected() {
        let err = KafkaError::MessageProduction(RDKafkaErrorCode::MessageSizeTooLarge);
        assert!(matches!(classify(&err), PublishError::Rejected(_)));
    }

    #[test]
    fn test_timeout_is_transient() {
        let err = KafkaError::MessageProduction(RDKafkaErrorCode::MessageTimedOut);
        assert!(classify(&err).is_transient());
    }

    #[test]
    fn test_producer_is_created_without_connecting() {
        let config = KafkaConfig {
            brokers: "localhost:9092".into(),
            client_id: "payflow-test".into(),
            max_retries: 5,
            retry_backoff: Duration::from_millis(100),
            delivery_timeout: Duration::from_secs(5),
        };

        assert!(KafkaPublisher::new(&config).is_ok());
    }
}
