//! Identifier generation abstraction.
//!
//! In production, identifiers are random v4 UUIDs. Tests inject a generator
//! that hands out a known sequence so payloads and responses can be asserted.

use uuid::Uuid;

/// Abstraction over globally unique identifier generation.
pub trait IdGenerator: Send + Sync {
    /// Returns a fresh identifier.
    fn next_id(&self) -> Uuid;
}

/// Production generator backed by random v4 UUIDs.
#[derive(Debug, Clone, Copy)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn next_id(&self) -> Uuid {
        Uuid::new_v4()
    }
}
