//! Message publisher boundary.

use async_trait::async_trait;
use thiserror::Error;

/// A message ready to be handed to the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Destination topic.
    pub topic: String,
    /// Partitioning key; messages sharing a key keep their relative order.
    pub key: Vec<u8>,
    /// Message body.
    pub value: Vec<u8>,
    /// Metadata headers.
    pub headers: Vec<(String, String)>,
}

impl OutboundMessage {
    /// Returns the value of header `name`, if present.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Broker acknowledgement of a published message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    /// Partition the message was written to.
    pub partition: i32,
    /// Offset within the partition.
    pub offset: i64,
}

/// Failure to publish a single message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    /// The broker was unreachable, timed out or asked us to retry.
    #[error("transient publish failure: {0}")]
    Transient(String),

    /// The broker refused the message; retrying it unchanged cannot succeed.
    #[error("message rejected by broker: {0}")]
    Rejected(String),
}

impl PublishError {
    /// Whether retrying the same message may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Synchronous-acknowledgement publisher.
///
/// Implementations return only after the broker acknowledged the message, or
/// with an error.
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    /// Publishes `message` and waits for the acknowledgement.
    async fn publish(&self, message: &OutboundMessage) -> Result<Delivery, PublishError>;
}
