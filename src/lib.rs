// ============================================================================
// Wallet & Outbox - optimistic locking and store-and-forward messaging
// ============================================================================

pub mod config;
pub mod db;
pub mod domain;
pub mod messaging;
pub mod metrics;
pub mod notifications;
pub mod outbox;
pub mod persistence;
pub mod utils;
