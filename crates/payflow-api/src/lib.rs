//! Payflow HTTP API: payment creation and lookup over the ledger, plus the
//! shared plumbing (configuration, telemetry, shutdown) of both binaries.

pub mod config;
pub mod error;
pub mod order_client;
pub mod routes;
pub mod shutdown;
pub mod state;
pub mod telemetry;
