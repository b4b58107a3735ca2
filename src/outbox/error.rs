use uuid::Uuid;

use super::message::MessageType;
use crate::messaging::DispatchError;
use crate::persistence::TransactionError;

// ============================================================================
// Outbox Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum OutboxError {
    #[error("Outbox storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No event registered for message type {0}")]
    UnknownMessageType(MessageType),

    #[error("Message {message_id} payload does not match {message_type}: {source}")]
    CorruptMessage {
        message_id: Uuid,
        message_type: MessageType,
        #[source]
        source: serde_json::Error,
    },

    #[error("Dispatch of message {message_id} failed: {source}")]
    Dispatch {
        message_id: Uuid,
        #[source]
        source: DispatchError,
    },
}

impl OutboxError {
    pub fn storage<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage(Box::new(source))
    }

    /// Short reason label for metrics
    pub fn reason(&self) -> &'static str {
        match self {
            OutboxError::Storage(_) | OutboxError::Transaction(_) => "storage",
            OutboxError::Serialization(_) => "serialization",
            OutboxError::UnknownMessageType(_) => "unknown_type",
            OutboxError::CorruptMessage { .. } => "corrupt_payload",
            OutboxError::Dispatch { .. } => "dispatch_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::io;

    #[test]
    fn test_storage_errors_hide_the_backend_type() {
        let error = OutboxError::storage(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset"));

        assert_eq!(error.reason(), "storage");
        assert!(error.to_string().contains("connection reset"));
        assert!(error.source().is_some());
    }

    #[test]
    fn test_transaction_failures_are_labelled_as_storage() {
        let failure = TransactionError::storage(io::Error::new(io::ErrorKind::TimedOut, "commit timed out"));

        let error = OutboxError::from(failure);

        assert_eq!(error.reason(), "storage");
        assert!(matches!(error, OutboxError::Transaction(TransactionError::Storage(_))));
    }
}
