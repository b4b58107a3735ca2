use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::event::Event;

/// Stable type tag of an outbox message: `<module>.<EventName>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageType(String);

impl MessageType {
    pub fn new(qualified_name: impl Into<String>) -> Self {
        Self(qualified_name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pending or processed outbound message
#[derive(Debug, Clone, PartialEq)]
pub struct OutboxMessage {
    pub id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub message_type: MessageType,
    pub payload: serde_json::Value,
    pub processed_at: Option<DateTime<Utc>>,
}

impl OutboxMessage {
    /// Build a pending message for `event`, stamped with the save time
    pub fn pending(event: &dyn Event) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            message_type: MessageType::new(event.message_type()),
            payload: event.to_payload()?,
            processed_at: None,
        })
    }

    pub fn is_processed(&self) -> bool {
        self.processed_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outbox::event::fixtures::Pinged;

    #[test]
    fn test_message_type_displays_its_tag() {
        let message_type = MessageType::new("library.ItemRented");

        assert_eq!(message_type.as_str(), "library.ItemRented");
        assert_eq!(message_type.to_string(), "library.ItemRented");
    }

    #[test]
    fn test_pending_message_from_event() {
        let event = Pinged::new(3);

        let message = OutboxMessage::pending(&event).unwrap();

        assert_eq!(message.message_type.as_str(), "test.Pinged");
        assert_eq!(message.payload["sequence"], 3);
        assert!(!message.is_processed());
    }
}
