// ============================================================================
// Library Card Repositories
// ============================================================================
//
// Both backends work inside a unit-of-work transaction so card rows and
// outbox rows commit together. Loaded cards always have an empty event
// buffer: events are never stored with the card.
//
// ============================================================================

mod in_memory;
mod postgres;

pub use self::in_memory::InMemoryLibraryCardRepository;
pub use self::postgres::PostgresLibraryCardRepository;

use async_trait::async_trait;

use crate::domain::library::{EntityId, LibraryCard, LibraryCardError};

#[derive(Debug, thiserror::Error)]
pub enum LibraryRepositoryError {
    #[error("Library card {0} was not found")]
    NotFound(EntityId),

    #[error("Library card storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Stored library card {card_id} is corrupt: {source}")]
    Corrupt {
        card_id: EntityId,
        #[source]
        source: LibraryCardError,
    },
}

impl LibraryRepositoryError {
    pub fn storage<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage(Box::new(source))
    }
}

#[async_trait]
pub trait LibraryCardRepository: Send + Sync {
    type Tx: Send;

    async fn get(&self, tx: &mut Self::Tx, card_id: EntityId) -> Result<LibraryCard, LibraryRepositoryError>;

    /// Insert or replace the card together with its current rentals
    async fn save(&self, tx: &mut Self::Tx, card: &LibraryCard) -> Result<(), LibraryRepositoryError>;
}
