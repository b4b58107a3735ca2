use std::collections::HashMap;

use super::error::OutboxError;
use super::event::{DomainEvent, Event};
use super::message::OutboxMessage;

type Decoder = fn(serde_json::Value) -> Result<Box<dyn Event>, serde_json::Error>;

fn decode_as<E: DomainEvent>(payload: serde_json::Value) -> Result<Box<dyn Event>, serde_json::Error> {
    Ok(Box::new(serde_json::from_value::<E>(payload)?))
}

/// Maps stable message type tags to payload decoders.
///
/// Populated once at startup; the processor uses it to turn stored messages
/// back into typed events.
#[derive(Default)]
pub struct EventRegistry {
    decoders: HashMap<&'static str, Decoder>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<E: DomainEvent>(&mut self) -> &mut Self {
        let previous = self.decoders.insert(E::event_type(), decode_as::<E>);
        if previous.is_some() {
            tracing::warn!(message_type = E::event_type(), "Event type registered twice, replacing decoder");
        }
        self
    }

    pub fn is_registered(&self, message_type: &str) -> bool {
        self.decoders.contains_key(message_type)
    }

    pub fn decode(&self, message: &OutboxMessage) -> Result<Box<dyn Event>, OutboxError> {
        let decoder = self
            .decoders
            .get(message.message_type.as_str())
            .ok_or_else(|| OutboxError::UnknownMessageType(message.message_type.clone()))?;

        decoder(message.payload.clone()).map_err(|source| OutboxError::CorruptMessage {
            message_id: message.id,
            message_type: message.message_type.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outbox::event::fixtures::{Pinged, Ponged};
    use crate::outbox::message::MessageType;

    fn registry() -> EventRegistry {
        let mut registry = EventRegistry::new();
        registry.register::<Pinged>().register::<Ponged>();
        registry
    }

    #[test]
    fn test_decode_round_trips_event() {
        let event = Pinged::new(42);
        let message = OutboxMessage::pending(&event).unwrap();

        let decoded = registry().decode(&message).unwrap();

        assert_eq!(decoded.message_type(), "test.Pinged");
        assert_eq!(decoded.as_any().downcast_ref::<Pinged>(), Some(&event));
    }

    #[test]
    fn test_unknown_message_type() {
        let mut message = OutboxMessage::pending(&Pinged::new(1)).unwrap();
        message.message_type = MessageType::new("test.Vanished");

        let result = registry().decode(&message);

        assert!(matches!(result, Err(OutboxError::UnknownMessageType(t)) if t.as_str() == "test.Vanished"));
    }

    #[test]
    fn test_corrupt_payload() {
        let mut message = OutboxMessage::pending(&Pinged::new(1)).unwrap();
        message.payload = serde_json::json!({ "sequence": "not a number" });

        let result = registry().decode(&message);

        assert!(matches!(result, Err(OutboxError::CorruptMessage { .. })));
    }

    #[test]
    fn test_is_registered() {
        let registry = registry();

        assert!(registry.is_registered("test.Ponged"));
        assert!(!registry.is_registered("test.Other"));
    }
}
