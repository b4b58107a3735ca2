// ============================================================================
// Message Outbox - pending outbound messages
// ============================================================================
//
// Every operation runs inside the caller's transaction, so a message saved
// together with entity changes becomes visible only when both commit.
//
// ============================================================================

mod in_memory;
mod postgres;

pub use self::in_memory::InMemoryMessageOutbox;
pub use self::postgres::PostgresMessageOutbox;

use async_trait::async_trait;

use super::error::OutboxError;
use super::event::Event;
use super::message::OutboxMessage;

/// Default number of messages fetched per poll
pub const DEFAULT_BATCH_SIZE: usize = 100;

#[async_trait]
pub trait MessageOutbox: Send + Sync {
    type Tx: Send;

    /// Append a pending message carrying the event's type tag and payload
    async fn save(&self, tx: &mut Self::Tx, event: &dyn Event) -> Result<OutboxMessage, OutboxError>;

    /// Up to `limit` pending messages, oldest first, ties in insertion order
    async fn to_publish(&self, tx: &mut Self::Tx, limit: usize) -> Result<Vec<OutboxMessage>, OutboxError>;

    /// Lock `message` for this transaction if it is still pending. Returns
    /// false when it was processed meanwhile or another processor holds it.
    async fn lock_pending(&self, tx: &mut Self::Tx, message: &OutboxMessage) -> Result<bool, OutboxError>;

    /// Set `processed_at`. Marking an already processed message keeps the
    /// first timestamp.
    async fn mark_as_published(&self, tx: &mut Self::Tx, message: &OutboxMessage) -> Result<(), OutboxError>;
}
