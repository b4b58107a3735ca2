use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::value_objects::EntityId;
use crate::outbox::event::{DomainEvent, Event, EventMetadata};

// ============================================================================
// Library Card Events
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LibraryCardCreated {
    #[serde(flatten)]
    pub metadata: EventMetadata,
    pub card_id: EntityId,
    pub owner_id: EntityId,
}

impl DomainEvent for LibraryCardCreated {
    fn event_type() -> &'static str {
        "library.LibraryCardCreated"
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ItemRented {
    #[serde(flatten)]
    pub metadata: EventMetadata,
    pub resource_id: EntityId,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

impl DomainEvent for ItemRented {
    fn event_type() -> &'static str {
        "library.ItemRented"
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ItemProlonged {
    #[serde(flatten)]
    pub metadata: EventMetadata,
    pub resource_id: EntityId,
    pub prolonged_for: u32,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

impl DomainEvent for ItemProlonged {
    fn event_type() -> &'static str {
        "library.ItemProlonged"
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ItemReturned {
    #[serde(flatten)]
    pub metadata: EventMetadata,
    pub resource_id: EntityId,
}

impl DomainEvent for ItemReturned {
    fn event_type() -> &'static str {
        "library.ItemReturned"
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LibraryCardSuspended {
    #[serde(flatten)]
    pub metadata: EventMetadata,
    pub card_id: EntityId,
    pub owner_id: EntityId,
}

impl DomainEvent for LibraryCardSuspended {
    fn event_type() -> &'static str {
        "library.LibraryCardSuspended"
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}

/// Union of everything a library card records
#[derive(Clone, Debug, PartialEq)]
pub enum LibraryCardEvent {
    Created(LibraryCardCreated),
    ItemRented(ItemRented),
    ItemProlonged(ItemProlonged),
    ItemReturned(ItemReturned),
    Suspended(LibraryCardSuspended),
}

impl LibraryCardEvent {
    pub fn as_event(&self) -> &dyn Event {
        match self {
            LibraryCardEvent::Created(event) => event,
            LibraryCardEvent::ItemRented(event) => event,
            LibraryCardEvent::ItemProlonged(event) => event,
            LibraryCardEvent::ItemReturned(event) => event,
            LibraryCardEvent::Suspended(event) => event,
        }
    }
}
