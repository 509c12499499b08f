//! Publisher decorators.

use std::time::Duration;

use async_trait::async_trait;
use payflow_core::publisher::{Delivery, MessagePublisher, OutboundMessage, PublishError};
use tracing::warn;

/// Retry settings for [`RetryingPublisher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound for the doubling delay.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(5),
        }
    }
}

/// Retries transient publish failures with capped exponential backoff.
///
/// Rejections are returned at once.
#[derive(Debug)]
pub struct RetryingPublisher<P> {
    inner: P,
    policy: RetryPolicy,
}

impl<P> RetryingPublisher<P> {
    /// Wraps `inner`.
    #[must_use]
    pub fn new(inner: P, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<P: MessagePublisher> MessagePublisher for RetryingPublisher<P> {
    async fn publish(&self, message: &OutboundMessage) -> Result<Delivery, PublishError> {
        let mut retries = 0;
        let mut delay = self.policy.initial_backoff;

        loop {
            match self.inner.publish(message).await {
                Err(err) if err.is_transient() && retries < self.policy.max_retries => {
                    retries += 1;
                    warn!(
                        topic = %message.topic,
                        retry = retries,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "publish failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2).min(self.policy.max_backoff);
                }
                outcome => return outcome,
            }
        }
    }
}
