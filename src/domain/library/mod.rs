// ============================================================================
// Library Domain - Store-and-Forward Example
// ============================================================================
//
// - Value objects (EntityId, DateRange, CardStatus)
// - Rental entity
// - LibraryCard aggregate recording domain events
// - Application service publishing those events through the outbox
//
// ============================================================================

pub mod value_objects;
pub mod errors;
pub mod events;
pub mod rental;
pub mod aggregate;
pub mod service;

pub use value_objects::*;
pub use errors::*;
pub use events::*;
pub use rental::*;
pub use aggregate::*;
pub use service::*;
