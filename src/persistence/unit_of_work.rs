use async_trait::async_trait;
use sqlx::postgres::{PgPool, Postgres};

// ============================================================================
// Unit of Work
// ============================================================================
//
// Explicit transaction boundary shared by the library card repository and
// the message outbox. Both take `&mut Tx`, so the entity rows and the
// outbox rows they write commit or roll back together.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    #[error("Transaction error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl TransactionError {
    pub fn storage<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage(Box::new(source))
    }
}

#[async_trait]
pub trait UnitOfWork: Send + Sync {
    type Tx: Send;

    async fn begin(&self) -> Result<Self::Tx, TransactionError>;
    async fn commit(&self, tx: Self::Tx) -> Result<(), TransactionError>;
    async fn rollback(&self, tx: Self::Tx) -> Result<(), TransactionError>;
}

pub type PgTransaction = sqlx::Transaction<'static, Postgres>;

pub struct PgUnitOfWork {
    pool: PgPool,
}

impl PgUnitOfWork {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    type Tx = PgTransaction;

    async fn begin(&self) -> Result<Self::Tx, TransactionError> {
        self.pool.begin().await.map_err(TransactionError::storage)
    }

    async fn commit(&self, tx: Self::Tx) -> Result<(), TransactionError> {
        tx.commit().await.map_err(TransactionError::storage)
    }

    async fn rollback(&self, tx: Self::Tx) -> Result<(), TransactionError> {
        tx.rollback().await.map_err(TransactionError::storage)
    }
}
