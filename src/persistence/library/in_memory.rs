use async_trait::async_trait;

use super::{LibraryCardRepository, LibraryRepositoryError};
use crate::domain::library::{EntityId, LibraryCard};
use crate::persistence::{InMemoryDatabase, InMemoryTransaction};

pub struct InMemoryLibraryCardRepository {
    database: InMemoryDatabase,
}

impl InMemoryLibraryCardRepository {
    pub fn new(database: InMemoryDatabase) -> Self {
        Self { database }
    }
}

#[async_trait]
impl LibraryCardRepository for InMemoryLibraryCardRepository {
    type Tx = InMemoryTransaction;

    async fn get(&self, tx: &mut Self::Tx, card_id: EntityId) -> Result<LibraryCard, LibraryRepositoryError> {
        if let Some(card) = tx.cards.get(&card_id) {
            return Ok(card.clone());
        }

        self.database
            .lock()
            .await
            .cards
            .get(&card_id)
            .cloned()
            .ok_or(LibraryRepositoryError::NotFound(card_id))
    }

    async fn save(&self, tx: &mut Self::Tx, card: &LibraryCard) -> Result<(), LibraryRepositoryError> {
        let mut stored = card.clone();
        stored.clear_events();
        tx.cards.insert(card.id(), stored);

        tracing::debug!(card_id = %card.id(), rentals = card.rentals().len(), "Staged library card");
        Ok(())
    }
}
