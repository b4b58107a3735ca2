use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPool;
use sqlx::FromRow;

use super::{Operation, RepositoryError, WalletRepository};
use crate::domain::wallet::{Currency, Version, Wallet, WalletError, WalletId, WalletSnapshot};

// ============================================================================
// PostgreSQL Wallet Repository
// ============================================================================
//
// Relational backend. The version precondition is part of the UPDATE's WHERE
// clause, so a stale writer simply matches zero rows.
//
// ============================================================================

#[derive(FromRow)]
struct WalletRow {
    id: String,
    balance: Decimal,
    currency: String,
    created_at: DateTime<Utc>,
    version: i64,
}

impl TryFrom<WalletRow> for Wallet {
    type Error = WalletError;

    fn try_from(row: WalletRow) -> Result<Self, Self::Error> {
        Wallet::from_snapshot(WalletSnapshot {
            id: WalletId::new(row.id),
            balance: row.balance,
            currency: row.currency.parse::<Currency>()?,
            created_at: row.created_at,
            version: Version::try_from(row.version)?,
        })
    }
}

pub struct PostgresWalletRepository {
    pool: PgPool,
}

impl PostgresWalletRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, wallet_id: &WalletId) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM wallets WHERE id = $1)")
            .bind(wallet_id.as_str())
            .fetch_one(&self.pool)
            .await
    }
}

#[async_trait]
impl WalletRepository for PostgresWalletRepository {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn create(&self, wallet: &Wallet) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO wallets (id, balance, currency, created_at, version)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(wallet.id().as_str())
        .bind(wallet.balance())
        .bind(wallet.currency().as_str())
        .bind(wallet.created_at())
        .bind(wallet.version().as_i64())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::storage(Operation::Create, e))?;

        tracing::debug!(wallet_id = %wallet.id(), "Inserted wallet row");
        Ok(())
    }

    async fn get(&self, wallet_id: &WalletId) -> Result<Wallet, RepositoryError> {
        let row: Option<WalletRow> = sqlx::query_as::<_, WalletRow>(
            "SELECT id, balance, currency, created_at, version FROM wallets WHERE id = $1",
        )
        .bind(wallet_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::storage(Operation::Get, e))?;

        let row = row.ok_or_else(|| RepositoryError::NotFound(wallet_id.clone()))?;
        Wallet::try_from(row).map_err(|e| RepositoryError::storage(Operation::Get, e))
    }

    async fn update(&self, wallet: &mut Wallet) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE wallets
            SET balance = $1, version = $2
            WHERE id = $3 AND version = $4
            "#,
        )
        .bind(wallet.balance())
        .bind(wallet.version().next().as_i64())
        .bind(wallet.id().as_str())
        .bind(wallet.version().as_i64())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::storage(Operation::Update, e))?;

        if result.rows_affected() == 0 {
            let exists = self
                .exists(wallet.id())
                .await
                .map_err(|e| RepositoryError::storage(Operation::Update, e))?;

            if !exists {
                return Err(RepositoryError::NotFound(wallet.id().clone()));
            }

            tracing::warn!(
                wallet_id = %wallet.id(),
                expected_version = %wallet.version(),
                "Optimistic lock conflict on wallets row"
            );
            return Err(RepositoryError::OptimisticLock {
                wallet_id: wallet.id().clone(),
                expected: wallet.version(),
            });
        }

        wallet.advance_version();
        tracing::debug!(wallet_id = %wallet.id(), version = %wallet.version(), "Updated wallet row");
        Ok(())
    }
}

// ============================================================================
// Integration Tests
// ============================================================================
