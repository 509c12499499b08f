//! Domain event abstractions.

use uuid::Uuid;

/// Trait that all events announced through the outbox implement.
pub trait DomainEvent: Send + Sync + std::fmt::Debug {
    /// Type of the aggregate that produced the event (e.g. `"payment"`).
    fn aggregate_type(&self) -> &'static str;

    /// The event type name (e.g. `"payment_created"`).
    fn event_type(&self) -> &'static str;

    /// Identifier of the aggregate instance; used as the broker message key.
    fn aggregate_id(&self) -> Uuid;

    /// Serializes the event payload to JSON.
    ///
    /// # Errors
    ///
    /// Returns the serializer error if the payload cannot be represented as JSON.
    fn to_payload(&self) -> Result<serde_json::Value, serde_json::Error>;
}
