// ============================================================================
// Persistence Layer
// ============================================================================
//
// - wallet:       optimistic-locking repositories (postgres, redis, scylla, memory)
// - library:      library card repositories bound to a unit of work
// - unit_of_work: transaction boundary (PostgreSQL)
// - in_memory:    process-local database with staged, transactional writes
//
// ============================================================================

pub mod in_memory;
pub mod library;
pub mod unit_of_work;
pub mod wallet;

pub use in_memory::{InMemoryDatabase, InMemoryTransaction, InMemoryUnitOfWork};
pub use unit_of_work::{PgTransaction, PgUnitOfWork, TransactionError, UnitOfWork};
