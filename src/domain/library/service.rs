use std::sync::Arc;

use super::{DateRange, EntityId, LibraryCard, LibraryCardError};
use crate::outbox::{EventPublisher, OutboxError};
use crate::persistence::library::{LibraryCardRepository, LibraryRepositoryError};
use crate::persistence::{TransactionError, UnitOfWork};

// ============================================================================
// Library Card Application Service
// ============================================================================
//
// Each operation is one unit of work:
// begin -> load or create -> mutate -> save -> publish buffered events ->
// clear buffer -> commit
//
// Publishing goes through the store-and-forward publisher, so the card and
// its outbox messages are committed or rolled back together.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum LibraryServiceError {
    #[error(transparent)]
    Domain(#[from] LibraryCardError),

    #[error(transparent)]
    Repository(#[from] LibraryRepositoryError),

    #[error(transparent)]
    Outbox(#[from] OutboxError),

    #[error(transparent)]
    Transaction(#[from] TransactionError),
}

pub struct LibraryCardService<U, R, P> {
    unit_of_work: Arc<U>,
    repository: Arc<R>,
    publisher: Arc<P>,
}

impl<U, R, P> LibraryCardService<U, R, P>
where
    U: UnitOfWork,
    R: LibraryCardRepository<Tx = U::Tx>,
    P: EventPublisher<Tx = U::Tx>,
{
    pub fn new(unit_of_work: Arc<U>, repository: Arc<R>, publisher: Arc<P>) -> Self {
        Self {
            unit_of_work,
            repository,
            publisher,
        }
    }

    pub async fn create(&self, owner_id: EntityId) -> Result<LibraryCard, LibraryServiceError> {
        let mut card = LibraryCard::create(owner_id);
        let mut tx = self.unit_of_work.begin().await?;

        match self.persist(&mut tx, &mut card).await {
            Ok(()) => self.unit_of_work.commit(tx).await?,
            Err(e) => return Err(self.abort(tx, e).await),
        }

        tracing::info!(card_id = %card.id(), owner_id = %owner_id, "📚 Library card created");
        Ok(card)
    }

    /// Borrow a resource. Returns the new rental's id.
    pub async fn borrow(
        &self,
        card_id: EntityId,
        resource_id: EntityId,
        period: DateRange,
    ) -> Result<EntityId, LibraryServiceError> {
        self.modify(card_id, move |card| card.borrow(resource_id, period)).await
    }

    pub async fn prolong(&self, card_id: EntityId, rental_id: EntityId, days: u32) -> Result<(), LibraryServiceError> {
        self.modify(card_id, move |card| card.prolong_for(rental_id, days)).await
    }

    pub async fn give_back(&self, card_id: EntityId, resource_id: EntityId) -> Result<(), LibraryServiceError> {
        self.modify(card_id, move |card| card.give_back(resource_id)).await
    }

    async fn modify<T, F>(&self, card_id: EntityId, change: F) -> Result<T, LibraryServiceError>
    where
        T: Send,
        F: FnOnce(&mut LibraryCard) -> Result<T, LibraryCardError> + Send,
    {
        let mut tx = self.unit_of_work.begin().await?;

        match self.load_change_persist(&mut tx, card_id, change).await {
            Ok(value) => {
                self.unit_of_work.commit(tx).await?;
                Ok(value)
            }
            Err(e) => Err(self.abort(tx, e).await),
        }
    }

    async fn load_change_persist<T, F>(
        &self,
        tx: &mut U::Tx,
        card_id: EntityId,
        change: F,
    ) -> Result<T, LibraryServiceError>
    where
        F: FnOnce(&mut LibraryCard) -> Result<T, LibraryCardError>,
    {
        let mut card = self.repository.get(tx, card_id).await?;
        let value = change(&mut card)?;
        self.persist(tx, &mut card).await?;
        Ok(value)
    }

    async fn persist(&self, tx: &mut U::Tx, card: &mut LibraryCard) -> Result<(), LibraryServiceError> {
        self.repository.save(tx, card).await?;

        for event in card.events() {
            self.publisher.publish(tx, event.as_event()).await?;
        }
        card.clear_events();

        Ok(())
    }

    async fn abort(&self, tx: U::Tx, error: LibraryServiceError) -> LibraryServiceError {
        if let Err(rollback_error) = self.unit_of_work.rollback(tx).await {
            tracing::warn!(error = %rollback_error, "Rollback failed");
        }
        tracing::warn!(error = %error, "Library card operation rolled back");
        error
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
