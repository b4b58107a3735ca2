use async_trait::async_trait;
use chrono::Utc;

use super::MessageOutbox;
use crate::outbox::error::OutboxError;
use crate::outbox::event::Event;
use crate::outbox::message::OutboxMessage;
use crate::persistence::{InMemoryDatabase, InMemoryTransaction};

/// Outbox over the in-memory database. Messages saved in a transaction are
/// visible to that transaction only until it commits.
pub struct InMemoryMessageOutbox {
    database: InMemoryDatabase,
}

impl InMemoryMessageOutbox {
    pub fn new(database: InMemoryDatabase) -> Self {
        Self { database }
    }
}

#[async_trait]
impl MessageOutbox for InMemoryMessageOutbox {
    type Tx = InMemoryTransaction;

    async fn save(&self, tx: &mut Self::Tx, event: &dyn Event) -> Result<OutboxMessage, OutboxError> {
        let message = OutboxMessage::pending(event)?;
        tx.messages.push(message.clone());

        tracing::debug!(
            message_id = %message.id,
            message_type = %message.message_type,
            "Staged outbox message"
        );
        Ok(message)
    }

    async fn to_publish(&self, tx: &mut Self::Tx, limit: usize) -> Result<Vec<OutboxMessage>, OutboxError> {
        let state = self.database.lock().await;

        let mut pending: Vec<OutboxMessage> = state
            .messages
            .iter()
            .chain(tx.messages.iter())
            .filter(|message| !message.is_processed() && !tx.processed.contains_key(&message.id))
            .filter(|message| !state.locked_messages.contains(&message.id) || tx.locks.contains(&message.id))
            .cloned()
            .collect();

        // Stable sort keeps insertion order for equal timestamps
        pending.sort_by_key(|message| message.occurred_at);
        pending.truncate(limit);
        Ok(pending)
    }

    async fn lock_pending(&self, tx: &mut Self::Tx, message: &OutboxMessage) -> Result<bool, OutboxError> {
        if tx.processed.contains_key(&message.id) {
            return Ok(false);
        }
        if tx.messages.iter().any(|staged| staged.id == message.id) || tx.locks.contains(&message.id) {
            return Ok(true);
        }

        let mut state = self.database.lock().await;
        let pending = state
            .messages
            .iter()
            .any(|stored| stored.id == message.id && !stored.is_processed());

        if !pending || !state.locked_messages.insert(message.id) {
            return Ok(false);
        }

        tx.locks.push(message.id);
        Ok(true)
    }

    async fn mark_as_published(&self, tx: &mut Self::Tx, message: &OutboxMessage) -> Result<(), OutboxError> {
        tx.processed.entry(message.id).or_insert_with(Utc::now);
        Ok(())
    }
}
