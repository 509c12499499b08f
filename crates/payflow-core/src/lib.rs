//! Payflow Core: shared domain abstractions.
//!
//! This crate defines the records, traits and errors that the write path, the
//! ledger store and the outbox dispatcher agree on. It contains no
//! infrastructure code.

pub mod clock;
pub mod command;
pub mod config;
pub mod error;
pub mod event;
pub mod id;
pub mod outbox;
pub mod payment;
pub mod publisher;
pub mod repository;
