//! Outbox dispatcher and message publishers for Payflow.

pub mod dispatcher;
#[cfg(feature = "kafka")]
pub mod kafka;
pub mod publisher;
