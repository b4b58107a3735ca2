// ============================================================================
// Wallet Repositories - Optimistic Locking
// ============================================================================
//
// One contract, four independent backends:
// - postgres:  UPDATE ... WHERE id = $ AND version = $
// - redis:     JSON document replaced by a Lua script if the version matches
// - scylla:    lightweight transaction UPDATE ... IF version = ?
// - in_memory: compare-and-swap under a mutex
//
// The backend is picked when the application is wired together. Every
// backend error is translated to RepositoryError at this boundary.
//
// ============================================================================

mod in_memory;
mod postgres;
mod redis;
mod scylla;

pub use self::in_memory::InMemoryWalletRepository;
pub use self::postgres::PostgresWalletRepository;
pub use self::redis::RedisWalletRepository;
pub use self::scylla::ScyllaWalletRepository;

use async_trait::async_trait;
use std::fmt;

use crate::domain::wallet::{Version, Wallet, WalletId};

/// Repository operation that failed, used in error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Get,
    Update,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let description = match self {
            Operation::Create => "adding a wallet to the database",
            Operation::Get => "retrieving the wallet",
            Operation::Update => "the update operation for a wallet",
        };
        f.write_str(description)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Wallet with id={0} was not found")]
    NotFound(WalletId),

    #[error("Wallet {wallet_id} must have been updated in the meantime (expected version {expected})")]
    OptimisticLock { wallet_id: WalletId, expected: Version },

    #[error("An error occurred during {operation}: {source}")]
    Storage {
        operation: Operation,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl RepositoryError {
    pub fn storage<E>(operation: Operation, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            operation,
            source: Box::new(source),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, RepositoryError::OptimisticLock { .. })
    }
}

#[async_trait]
pub trait WalletRepository: Send + Sync {
    /// Short backend name for logs and metrics
    fn backend(&self) -> &'static str;

    /// Persist a brand-new wallet. Duplicate ids are rejected.
    async fn create(&self, wallet: &Wallet) -> Result<(), RepositoryError>;

    async fn get(&self, wallet_id: &WalletId) -> Result<Wallet, RepositoryError>;

    /// Conditional write: applies only if the stored version still equals
    /// `wallet.version()`. On success the wallet's version is advanced by one.
    async fn update(&self, wallet: &mut Wallet) -> Result<(), RepositoryError>;
}
