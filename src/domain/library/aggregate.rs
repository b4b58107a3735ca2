use chrono::{DateTime, Utc};

use super::errors::LibraryCardError;
use super::events::{
    ItemProlonged, ItemRented, ItemReturned, LibraryCardCreated, LibraryCardEvent, LibraryCardSuspended,
};
use super::rental::Rental;
use super::value_objects::{CardStatus, DateRange, EntityId};
use crate::outbox::event::EventMetadata;

// ============================================================================
// Library Card Aggregate
// ============================================================================
//
// Business rules:
// - only an active card can borrow
// - a single rental lasts at most 14 days
// - at most 3 resources at a time
// - returning more than 3 days late suspends the card
//
// Every state change records an event in an in-memory buffer. The
// application service publishes the buffer in the same transaction that
// saves the card, then clears it.
//
// ============================================================================

pub const MAX_RENTAL_DAYS: i64 = 14;
pub const MAX_RENTALS: usize = 3;
pub const OVERDUE_DAYS_BEFORE_SUSPENSION: i64 = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct LibraryCard {
    id: EntityId,
    owner_id: EntityId,
    rentals: Vec<Rental>,
    status: CardStatus,
    created_at: DateTime<Utc>,
    events: Vec<LibraryCardEvent>,
}

impl LibraryCard {
    pub fn create(owner_id: EntityId) -> Self {
        let mut card = Self::restore(EntityId::new(), owner_id, Vec::new(), CardStatus::Active, Utc::now());
        card.record(LibraryCardEvent::Created(LibraryCardCreated {
            metadata: EventMetadata::new(),
            card_id: card.id,
            owner_id,
        }));
        card
    }

    /// Rebuild a stored card. The event buffer starts empty.
    pub fn restore(
        id: EntityId,
        owner_id: EntityId,
        rentals: Vec<Rental>,
        status: CardStatus,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner_id,
            rentals,
            status,
            created_at,
            events: Vec::new(),
        }
    }

    // Getters
    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn owner_id(&self) -> EntityId {
        self.owner_id
    }

    pub fn rentals(&self) -> &[Rental] {
        &self.rentals
    }

    pub fn status(&self) -> CardStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_active(&self) -> bool {
        self.status == CardStatus::Active
    }

    pub fn is_owned_by(&self, owner_id: EntityId) -> bool {
        self.owner_id == owner_id
    }

    /// Copy of the events recorded since the last clear
    pub fn events(&self) -> Vec<LibraryCardEvent> {
        self.events.clone()
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    pub fn borrow(&mut self, resource_id: EntityId, how_long: DateRange) -> Result<EntityId, LibraryCardError> {
        if !self.is_active() {
            return Err(LibraryCardError::NotActive(self.id));
        }

        if how_long.days() > MAX_RENTAL_DAYS {
            return Err(LibraryCardError::RentalTooLong {
                requested_days: how_long.days(),
                max_days: MAX_RENTAL_DAYS,
            });
        }

        if self.rentals.len() >= MAX_RENTALS {
            return Err(LibraryCardError::TooManyRentals(MAX_RENTALS));
        }

        let rental = Rental::create(resource_id, how_long);
        let rental_id = rental.id();
        self.rentals.push(rental);

        self.record(LibraryCardEvent::ItemRented(ItemRented {
            metadata: EventMetadata::new(),
            resource_id,
            starts_at: how_long.start_date(),
            ends_at: how_long.end_date(),
        }));
        Ok(rental_id)
    }

    pub fn prolong_for(&mut self, rental_id: EntityId, days: u32) -> Result<(), LibraryCardError> {
        let rental = self
            .rentals
            .iter_mut()
            .find(|rental| rental.id() == rental_id)
            .ok_or(LibraryCardError::RentalNotFound(rental_id))?;

        rental.prolong(days)?;

        let event = ItemProlonged {
            metadata: EventMetadata::new(),
            resource_id: rental.resource_id(),
            prolonged_for: days,
            starts_at: rental.rental_period().start_date(),
            ends_at: rental.rental_period().end_date(),
        };
        self.record(LibraryCardEvent::ItemProlonged(event));
        Ok(())
    }

    pub fn give_back(&mut self, resource_id: EntityId) -> Result<(), LibraryCardError> {
        let position = self
            .rentals
            .iter()
            .position(|rental| rental.resource_id() == resource_id)
            .ok_or(LibraryCardError::ResourceNotRented(resource_id))?;

        let rental = self.rentals.remove(position);
        self.record(LibraryCardEvent::ItemReturned(ItemReturned {
            metadata: EventMetadata::new(),
            resource_id,
        }));

        let days_overdue = (Utc::now() - rental.rental_period().end_date()).num_days();
        if days_overdue > OVERDUE_DAYS_BEFORE_SUSPENSION {
            self.status = CardStatus::Suspended;
            self.record(LibraryCardEvent::Suspended(LibraryCardSuspended {
                metadata: EventMetadata::new(),
                card_id: self.id,
                owner_id: self.owner_id,
            }));
            tracing::info!(card_id = %self.id, days_overdue = days_overdue, "Library card suspended");
        }

        Ok(())
    }

    fn record(&mut self, event: LibraryCardEvent) {
        self.events.push(event);
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn active_card_with(rentals: Vec<Rental>) -> LibraryCard {
        LibraryCard::restore(EntityId::new(), EntityId::new(), rentals, CardStatus::Active, Utc::now())
    }

    #[test]
    fn test_can_create_card() {
        let owner_id = EntityId::new();

        let card = LibraryCard::create(owner_id);

        assert!(card.is_active());
        assert!(card.is_owned_by(owner_id));
        match &card.events()[..] {
            [LibraryCardEvent::Created(event)] => {
                assert_eq!(event.card_id, card.id());
                assert_eq!(event.owner_id, owner_id);
            }
            other => panic!("unexpected events: {:?}", other),
        }
    }

    #[test]
    fn test_can_not_borrow_if_card_not_active() {
        let mut card = LibraryCard::restore(
            EntityId::new(),
            EntityId::new(),
            Vec::new(),
            CardStatus::Suspended,
            Utc::now(),
        );

        let result = card.borrow(EntityId::new(), DateRange::one_week());

        assert!(matches!(result, Err(LibraryCardError::NotActive(_))));
        assert!(card.events().is_empty());
    }

    #[test]
    fn test_can_borrow_resource() {
        let mut card = LibraryCard::create(EntityId::new());
        let resource_id = EntityId::new();
        let two_weeks = DateRange::two_weeks();

        card.borrow(resource_id, two_weeks).unwrap();

        match &card.events()[1] {
            LibraryCardEvent::ItemRented(event) => {
                assert_eq!(event.resource_id, resource_id);
                assert_eq!(event.starts_at, two_weeks.start_date());
                assert_eq!(event.ends_at, two_weeks.end_date());
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(card.rentals().len(), 1);
    }

    #[test]
    fn test_can_not_borrow_more_than_14_days() {
        let mut card = LibraryCard::create(EntityId::new());

        let result = card.borrow(EntityId::new(), DateRange::one_month());

        assert!(matches!(result, Err(LibraryCardError::RentalTooLong { .. })));
    }

    #[test]
    fn test_can_not_borrow_more_than_3_resources() {
        let mut card = LibraryCard::create(EntityId::new());

        for _ in 0..3 {
            card.borrow(EntityId::new(), DateRange::one_week()).unwrap();
        }
        let result = card.borrow(EntityId::new(), DateRange::one_week());

        assert_eq!(result, Err(LibraryCardError::TooManyRentals(3)));
        assert_eq!(card.rentals().len(), 3);
    }

    #[test]
    fn test_can_prolong_a_resource() {
        let resource_id = EntityId::new();
        let rental = Rental::create(resource_id, DateRange::one_week());
        let rental_id = rental.id();
        let mut card = active_card_with(vec![rental]);
        card.borrow(EntityId::new(), DateRange::one_week()).unwrap();

        card.prolong_for(rental_id, 7).unwrap();

        match &card.events()[1] {
            LibraryCardEvent::ItemProlonged(event) => {
                assert_eq!(event.resource_id, resource_id);
                assert_eq!(event.prolonged_for, 7);
                assert_eq!((event.ends_at - event.starts_at).num_days(), 14);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_prolonging_unknown_rental_fails() {
        let mut card = active_card_with(Vec::new());
        let rental_id = EntityId::new();

        assert_eq!(card.prolong_for(rental_id, 1), Err(LibraryCardError::RentalNotFound(rental_id)));
    }

    #[test]
    fn test_can_give_back_a_resource() {
        let resource_id = EntityId::new();
        let mut card = active_card_with(vec![Rental::create(resource_id, DateRange::one_week())]);

        card.give_back(resource_id).unwrap();

        match &card.events()[..] {
            [LibraryCardEvent::ItemReturned(event)] => assert_eq!(event.resource_id, resource_id),
            other => panic!("unexpected events: {:?}", other),
        }
        assert!(card.rentals().is_empty());
        assert!(card.is_active());
    }

    #[test]
    fn test_late_return_suspends_card() {
        let resource_id = EntityId::new();
        let now = Utc::now();
        let period = DateRange::new(now - Duration::days(20), now - Duration::days(10)).unwrap();
        let mut card = active_card_with(vec![Rental::create(resource_id, period)]);

        card.give_back(resource_id).unwrap();

        assert_eq!(card.status(), CardStatus::Suspended);
        assert!(matches!(
            &card.events()[..],
            [LibraryCardEvent::ItemReturned(_), LibraryCardEvent::Suspended(_)]
        ));
    }

    #[test]
    fn test_giving_back_unknown_resource_fails() {
        let mut card = active_card_with(Vec::new());
        let resource_id = EntityId::new();

        assert_eq!(card.give_back(resource_id), Err(LibraryCardError::ResourceNotRented(resource_id)));
    }

    #[test]
    fn test_clear_events() {
        let mut card = LibraryCard::create(EntityId::new());
        let snapshot = card.events();

        card.clear_events();

        assert_eq!(snapshot.len(), 1);
        assert!(card.events().is_empty());
    }
}
