//! Payflow: Payments bounded context.
//!
//! Responsible for turning a validated creation request into a pending payment
//! and its `payment_created` outbox record, and for recognizing repeated
//! requests through their idempotency key.

pub mod application;
pub mod domain;
