use super::errors::LibraryCardError;
use super::value_objects::{DateRange, EntityId};

pub const MAX_PROLONGATION_DAYS: u32 = 7;

#[derive(Debug, Clone, PartialEq)]
pub struct Rental {
    id: EntityId,
    resource_id: EntityId,
    rental_period: DateRange,
}

impl Rental {
    pub fn create(resource_id: EntityId, rental_period: DateRange) -> Self {
        Self {
            id: EntityId::new(),
            resource_id,
            rental_period,
        }
    }

    /// Rebuild a stored rental
    pub fn restore(id: EntityId, resource_id: EntityId, rental_period: DateRange) -> Self {
        Self {
            id,
            resource_id,
            rental_period,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn resource_id(&self) -> EntityId {
        self.resource_id
    }

    pub fn rental_period(&self) -> DateRange {
        self.rental_period
    }

    pub fn prolong(&mut self, days: u32) -> Result<(), LibraryCardError> {
        if days > MAX_PROLONGATION_DAYS {
            return Err(LibraryCardError::ProlongationTooLong {
                requested_days: days,
                max_days: MAX_PROLONGATION_DAYS,
            });
        }

        self.rental_period = self.rental_period.extended_by(days);
        Ok(())
    }
}
