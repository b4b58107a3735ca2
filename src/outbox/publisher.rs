use async_trait::async_trait;
use std::sync::Arc;

use super::error::OutboxError;
use super::event::Event;
use super::store::MessageOutbox;

/// Publishing seen from the domain side. Implementations decide when the
/// event actually reaches its subscribers.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    type Tx: Send;

    async fn publish(&self, tx: &mut Self::Tx, event: &dyn Event) -> Result<(), OutboxError>;
}

/// Defers delivery: the event is stored in the outbox inside the caller's
/// transaction and forwarded later by the outbox processor.
pub struct StoreAndForwardPublisher<O> {
    outbox: Arc<O>,
}

impl<O: MessageOutbox> StoreAndForwardPublisher<O> {
    pub fn new(outbox: Arc<O>) -> Self {
        Self { outbox }
    }
}

#[async_trait]
impl<O: MessageOutbox> EventPublisher for StoreAndForwardPublisher<O> {
    type Tx = O::Tx;

    async fn publish(&self, tx: &mut Self::Tx, event: &dyn Event) -> Result<(), OutboxError> {
        let message = self.outbox.save(tx, event).await?;

        tracing::info!(
            message_id = %message.id,
            event_id = %event.event_id(),
            message_type = %message.message_type,
            "📮 Event stored for forwarding"
        );
        Ok(())
    }
}
