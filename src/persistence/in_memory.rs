use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::unit_of_work::{TransactionError, UnitOfWork};
use crate::domain::library::{EntityId, LibraryCard};
use crate::outbox::message::OutboxMessage;

// ============================================================================
// In-Memory Database
// ============================================================================
//
// Committed state lives behind one mutex. A transaction only stages writes:
// commit applies them under the lock, rollback drops them. Reads through a
// transaction see committed state overlaid with the transaction's own writes.
//
// Row locks mimic FOR UPDATE SKIP LOCKED for outbox messages: a message
// locked by one open transaction is skipped by the others.
//
// ============================================================================

#[derive(Default)]
pub(crate) struct CommittedState {
    pub(crate) messages: Vec<OutboxMessage>,
    pub(crate) cards: HashMap<EntityId, LibraryCard>,
    pub(crate) locked_messages: HashSet<Uuid>,
}

#[derive(Clone, Default)]
pub struct InMemoryDatabase {
    state: Arc<Mutex<CommittedState>>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, CommittedState> {
        self.state.lock().await
    }

    /// Committed outbox messages, processed ones included
    pub async fn messages(&self) -> Vec<OutboxMessage> {
        self.state.lock().await.messages.clone()
    }
}

/// Writes staged by one unit of work
#[derive(Debug, Default)]
pub struct InMemoryTransaction {
    pub(crate) messages: Vec<OutboxMessage>,
    pub(crate) processed: HashMap<Uuid, DateTime<Utc>>,
    pub(crate) cards: HashMap<EntityId, LibraryCard>,
    pub(crate) locks: Vec<Uuid>,
}

impl InMemoryTransaction {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.processed.is_empty() && self.cards.is_empty()
    }
}

pub struct InMemoryUnitOfWork {
    database: InMemoryDatabase,
}

impl InMemoryUnitOfWork {
    pub fn new(database: InMemoryDatabase) -> Self {
        Self { database }
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    type Tx = InMemoryTransaction;

    async fn begin(&self) -> Result<Self::Tx, TransactionError> {
        Ok(InMemoryTransaction::default())
    }

    async fn commit(&self, tx: Self::Tx) -> Result<(), TransactionError> {
        let mut state = self.database.lock().await;

        for message in state.messages.iter_mut() {
            if let Some(processed_at) = tx.processed.get(&message.id) {
                message.processed_at.get_or_insert(*processed_at);
            }
        }

        for mut message in tx.messages {
            if let Some(processed_at) = tx.processed.get(&message.id) {
                message.processed_at = Some(*processed_at);
            }
            state.messages.push(message);
        }

        state.cards.extend(tx.cards);

        for id in &tx.locks {
            state.locked_messages.remove(id);
        }

        Ok(())
    }

    async fn rollback(&self, tx: Self::Tx) -> Result<(), TransactionError> {
        let mut state = self.database.lock().await;
        for id in &tx.locks {
            state.locked_messages.remove(id);
        }

        tracing::debug!(
            staged_messages = tx.messages.len(),
            staged_cards = tx.cards.len(),
            "Discarded in-memory transaction"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outbox::event::fixtures::Pinged;

    #[tokio::test]
    async fn test_commit_applies_staged_writes() {
        let database = InMemoryDatabase::new();
        let unit_of_work = InMemoryUnitOfWork::new(database.clone());

        let mut tx = unit_of_work.begin().await.unwrap();
        tx.messages.push(OutboxMessage::pending(&Pinged::new(1)).unwrap());
        assert!(!tx.is_empty());
        assert!(database.messages().await.is_empty());

        unit_of_work.commit(tx).await.unwrap();

        assert_eq!(database.messages().await.len(), 1);
    }

    #[tokio::test]
    async fn test_rollback_discards_staged_writes_and_locks() {
        let database = InMemoryDatabase::new();
        let unit_of_work = InMemoryUnitOfWork::new(database.clone());
        let message = OutboxMessage::pending(&Pinged::new(1)).unwrap();
        database.lock().await.locked_messages.insert(message.id);

        let mut tx = unit_of_work.begin().await.unwrap();
        tx.locks.push(message.id);
        tx.messages.push(message);
        unit_of_work.rollback(tx).await.unwrap();

        assert!(database.messages().await.is_empty());
        assert!(database.lock().await.locked_messages.is_empty());
    }
}
