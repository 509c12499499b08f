//! Test publishers: scripted and always-failing `MessagePublisher`s.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use payflow_core::publisher::{Delivery, MessagePublisher, OutboundMessage, PublishError};

/// A publisher that plays back a script of outcomes, one per call, and
/// succeeds once the script is exhausted. Every call and every successful
/// delivery is recorded.
#[derive(Debug, Default)]
pub struct ScriptedPublisher {
    script: Mutex<VecDeque<Result<(), PublishError>>>,
    attempts: Mutex<Vec<OutboundMessage>>,
    delivered: Mutex<Vec<OutboundMessage>>,
}

impl ScriptedPublisher {
    /// Create a publisher that acknowledges every message.
    #[must_use]
    pub fn succeeding() -> Self {
        Self::default()
    }

    /// Create a publisher that returns `outcomes` in order before
    /// acknowledging every further message.
    #[must_use]
    pub fn new(outcomes: Vec<Result<(), PublishError>>) -> Self {
        Self {
            script: Mutex::new(outcomes.into()),
            ..Self::default()
        }
    }

    /// Returns every message passed to `publish`, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn attempts(&self) -> Vec<OutboundMessage> {
        self.attempts.lock().unwrap().clone()
    }

    /// Returns the messages that were acknowledged, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn delivered(&self) -> Vec<OutboundMessage> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessagePublisher for ScriptedPublisher {
    async fn publish(&self, message: &OutboundMessage) -> Result<Delivery, PublishError> {
        self.attempts.lock().unwrap().push(message.clone());
        let outcome = self.script.lock().unwrap().pop_front().unwrap_or(Ok(()));
        outcome?;
        let mut delivered = self.delivered.lock().unwrap();
        delivered.push(message.clone());
        Ok(Delivery {
            partition: 0,
            offset: i64::try_from(delivered.len()).unwrap_or(i64::MAX) - 1,
        })
    }
}

/// A publisher that fails every call with the configured error.
#[derive(Debug)]
pub struct FailingPublisher {
    error: PublishError,
    calls: Mutex<usize>,
}

impl FailingPublisher {
    /// Create a publisher that always returns `error`.
    #[must_use]
    pub fn new(error: PublishError) -> Self {
        Self {
            error,
            calls: Mutex::new(0),
        }
    }

    /// Number of `publish` calls made so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl MessagePublisher for FailingPublisher {
    async fn publish(&self, _message: &OutboundMessage) -> Result<Delivery, PublishError> {
        *self.calls.lock().unwrap() += 1;
        Err(self.error.clone())
    }
}

/// A publisher whose calls never complete, like a broker that stopped
/// acknowledging.
#[derive(Debug, Default)]
pub struct StallingPublisher {
    calls: Mutex<usize>,
}

impl StallingPublisher {
    /// Create a stalling publisher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `publish` calls started so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl MessagePublisher for StallingPublisher {
    async fn publish(&self, _message: &OutboundMessage) -> Result<Delivery, PublishError> {
        *self.calls.lock().unwrap() += 1;
        std::future::pending().await
    }
}
