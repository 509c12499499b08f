//! Shared test doubles and utilities for Payflow.

mod clock;
mod id;
mod ledger;
mod publisher;
mod repository;

pub use clock::FixedClock;
pub use id::SequenceIdGenerator;
pub use ledger::InMemoryLedger;
pub use publisher::{FailingPublisher, ScriptedPublisher, StallingPublisher};
pub use repository::{FailingOutboxStore, FailingPaymentRepository};
