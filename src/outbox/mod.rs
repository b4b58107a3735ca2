// ============================================================================
// Transactional Outbox - Store-and-Forward Delivery
// ============================================================================
//
// - event:     DomainEvent (typed, tagged) and Event (object safe)
// - message:   OutboxMessage and its MessageType tag
// - store:     MessageOutbox contract with PostgreSQL and in-memory backends
// - publisher: StoreAndForwardPublisher, used inside application transactions
// - registry:  tag -> payload decoder, no reflection
// - processor: polling loop that dispatches and marks messages
//
// ============================================================================

pub mod error;
pub mod event;
pub mod message;
pub mod processor;
pub mod publisher;
pub mod registry;
pub mod store;

pub use error::OutboxError;
pub use event::{DomainEvent, Event, EventMetadata};
pub use message::{MessageType, OutboxMessage};
pub use processor::{BatchReport, CommitMode, OutboxProcessor, ProcessorConfig};
pub use publisher::{EventPublisher, StoreAndForwardPublisher};
pub use registry::EventRegistry;
pub use store::{InMemoryMessageOutbox, MessageOutbox, PostgresMessageOutbox, DEFAULT_BATCH_SIZE};
