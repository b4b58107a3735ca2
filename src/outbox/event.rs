use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt::Debug;
use uuid::Uuid;

// ============================================================================
// Domain Events
// ============================================================================
//
// `DomainEvent` is implemented by every concrete event struct and carries the
// stable type tag used in the outbox. `Event` is its object-safe face: the
// publisher, the outbox and the bus only ever see `&dyn Event`.
//
// ============================================================================

/// Identity and timestamp shared by every event
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct EventMetadata {
    pub id: Uuid,
    pub occurred_on: DateTime<Utc>,
}

impl EventMetadata {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            occurred_on: Utc::now(),
        }
    }
}

impl Default for EventMetadata {
    fn default() -> Self {
        Self::new()
    }
}

/// Concrete event type with a stable tag, e.g. `library.ItemRented`
pub trait DomainEvent: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static {
    fn event_type() -> &'static str
    where
        Self: Sized;

    fn metadata(&self) -> &EventMetadata;
}

pub trait Event: Debug + Send + Sync {
    fn message_type(&self) -> &'static str;
    fn event_id(&self) -> Uuid;
    fn occurred_on(&self) -> DateTime<Utc>;
    fn to_payload(&self) -> Result<serde_json::Value, serde_json::Error>;
    fn as_any(&self) -> &dyn Any;
}

impl<E: DomainEvent> Event for E {
    fn message_type(&self) -> &'static str {
        E::event_type()
    }

    fn event_id(&self) -> Uuid {
        self.metadata().id
    }

    fn occurred_on(&self) -> DateTime<Utc> {
        self.metadata().occurred_on
    }

    fn to_payload(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::Pinged;
    use super::*;

    #[test]
    fn test_payload_contains_metadata_and_fields() {
        let event = Pinged::new(7);
        let payload = event.to_payload().unwrap();

        assert_eq!(payload["sequence"], 7);
        assert_eq!(payload["id"], event.metadata.id.to_string());
        assert!(payload.get("occurred_on").is_some());
    }

    #[test]
    fn test_dyn_event_exposes_type_and_identity() {
        let event = Pinged::new(1);
        let dynamic: &dyn Event = &event;

        assert_eq!(dynamic.message_type(), "test.Pinged");
        assert_eq!(dynamic.event_id(), event.metadata.id);
        assert_eq!(dynamic.as_any().downcast_ref::<Pinged>(), Some(&event));
    }
}
