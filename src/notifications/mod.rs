// ============================================================================
// Notifications - subscribers for library card events
// ============================================================================

use crate::domain::library::{
    ItemProlonged, ItemRented, ItemReturned, LibraryCardCreated, LibraryCardSuspended,
};
use crate::messaging::InProcessEventBus;
use crate::outbox::EventRegistry;

pub fn library_card_created(event: &LibraryCardCreated) -> anyhow::Result<()> {
    tracing::info!(
        event_id = %event.metadata.id,
        card_id = %event.card_id,
        owner_id = %event.owner_id,
        "✉️  Welcome notification for new library card"
    );
    Ok(())
}

pub fn library_card_suspended(event: &LibraryCardSuspended) -> anyhow::Result<()> {
    tracing::warn!(
        event_id = %event.metadata.id,
        card_id = %event.card_id,
        owner_id = %event.owner_id,
        "✉️  Suspension notice for library card"
    );
    Ok(())
}

/// Register every library event type for decoding and attach the
/// notification handlers
pub fn register_library_events(registry: &mut EventRegistry, bus: &mut InProcessEventBus) {
    registry
        .register::<LibraryCardCreated>()
        .register::<ItemRented>()
        .register::<ItemProlonged>()
        .register::<ItemReturned>()
        .register::<LibraryCardSuspended>();

    bus.subscribe::<LibraryCardCreated, _>(library_card_created)
        .subscribe::<LibraryCardSuspended, _>(library_card_suspended);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_library_events_are_registered() {
        let mut registry = EventRegistry::new();
        let mut bus = InProcessEventBus::new();

        register_library_events(&mut registry, &mut bus);

        for message_type in [
            "library.LibraryCardCreated",
            "library.ItemRented",
            "library.ItemProlonged",
            "library.ItemReturned",
            "library.LibraryCardSuspended",
        ] {
            assert!(registry.is_registered(message_type), "{} not registered", message_type);
        }
        assert_eq!(bus.handler_count("library.LibraryCardCreated"), 1);
        assert_eq!(bus.handler_count("library.LibraryCardSuspended"), 1);
    }
}
