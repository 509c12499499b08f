//! Domain layer: commands, events, the payment factory and the order port.

pub mod commands;
pub mod events;
pub mod order;
pub mod payment;
