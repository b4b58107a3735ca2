use chrono::{DateTime, Utc};

use super::value_objects::EntityId;

// ============================================================================
// Library Card Business Rule Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LibraryCardError {
    #[error("Can not borrow, library card {0} is not active")]
    NotActive(EntityId),

    #[error("You cannot borrow for more than {max_days} days at once! (requested {requested_days})")]
    RentalTooLong { requested_days: i64, max_days: i64 },

    #[error("You can only have {0} resources borrowed!")]
    TooManyRentals(usize),

    #[error("{max_days} days is the maximum prolongation period! (requested {requested_days})")]
    ProlongationTooLong { requested_days: u32, max_days: u32 },

    #[error("Rental {0} not found")]
    RentalNotFound(EntityId),

    #[error("Resource {0} is not rented on this card")]
    ResourceNotRented(EntityId),

    #[error("Can not create DateRange from {start_date} to {end_date}")]
    InvalidDateRange {
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    },

    #[error("Unknown card status: {0}")]
    UnknownStatus(String),
}
