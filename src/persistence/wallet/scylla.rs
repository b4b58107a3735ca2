use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use scylla::client::session::Session;
use scylla::value::{CqlValue, Row};
use std::sync::Arc;

use super::{Operation, RepositoryError, WalletRepository};
use crate::domain::wallet::{Currency, Version, Wallet, WalletError, WalletId, WalletSnapshot};

// ============================================================================
// ScyllaDB Wallet Repository - Conditional Put
// ============================================================================
//
// Key-value backend. Both writes are lightweight transactions (Paxos):
// - create: INSERT ... IF NOT EXISTS
// - update: UPDATE ... IF version = ?
//
// The first column of an LWT result is `[applied]`. When an update is not
// applied Scylla also returns the current `version`, which is null if the
// row does not exist.
//
// Balances are stored as decimal strings.
//
// ============================================================================

type WalletColumns = (String, String, String, DateTime<Utc>, i64);

pub struct ScyllaWalletRepository {
    session: Arc<Session>,
}

impl ScyllaWalletRepository {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }
}

/// Outcome of a lightweight transaction
#[derive(Debug, PartialEq)]
enum LwtOutcome {
    Applied,
    Rejected { current_version: Option<i64> },
}

fn lwt_outcome(row: Option<Row>) -> LwtOutcome {
    let Some(row) = row else {
        return LwtOutcome::Rejected { current_version: None };
    };

    match row.columns.first() {
        Some(Some(CqlValue::Boolean(true))) => LwtOutcome::Applied,
        _ => {
            let current_version = row.columns.iter().skip(1).find_map(|column| match column {
                Some(CqlValue::BigInt(version)) => Some(*version),
                _ => None,
            });
            LwtOutcome::Rejected { current_version }
        }
    }
}

fn wallet_from_columns(columns: WalletColumns) -> Result<Wallet, WalletError> {
    let (id, balance, currency, created_at, version) = columns;
    let balance = balance
        .parse::<Decimal>()
        .map_err(|_| WalletError::UnparsableBalance(balance.clone()))?;

    Wallet::from_snapshot(WalletSnapshot {
        id: WalletId::new(id),
        balance,
        currency: currency.parse::<Currency>()?,
        created_at,
        version: Version::try_from(version)?,
    })
}

#[async_trait]
impl WalletRepository for ScyllaWalletRepository {
    fn backend(&self) -> &'static str {
        "scylla"
    }

    async fn create(&self, wallet: &Wallet) -> Result<(), RepositoryError> {
        let result = self
            .session
            .query_unpaged(
                "INSERT INTO wallets (id, balance, currency, created_at, version) \
                 VALUES (?, ?, ?, ?, ?) IF NOT EXISTS",
                (
                    wallet.id().as_str(),
                    wallet.balance().to_string(),
                    wallet.currency().as_str(),
                    wallet.created_at(),
                    wallet.version().as_i64(),
                ),
            )
            .await
            .map_err(|e| RepositoryError::storage(Operation::Create, e))?;

        let rows = result
            .into_rows_result()
            .map_err(|e| RepositoryError::storage(Operation::Create, e))?;
        let row = rows
            .maybe_first_row::<Row>()
            .map_err(|e| RepositoryError::storage(Operation::Create, e))?;

        match lwt_outcome(row) {
            LwtOutcome::Applied => {
                tracing::debug!(wallet_id = %wallet.id(), "Inserted wallet row");
                Ok(())
            }
            LwtOutcome::Rejected { .. } => Err(RepositoryError::storage(
                Operation::Create,
                WalletAlreadyExists(wallet.id().clone()),
            )),
        }
    }

    async fn get(&self, wallet_id: &WalletId) -> Result<Wallet, RepositoryError> {
        let result = self
            .session
            .query_unpaged(
                "SELECT id, balance, currency, created_at, version FROM wallets WHERE id = ?",
                (wallet_id.as_str(),),
            )
            .await
            .map_err(|e| RepositoryError::storage(Operation::Get, e))?;

        let rows = result
            .into_rows_result()
            .map_err(|e| RepositoryError::storage(Operation::Get, e))?;
        let columns = rows
            .maybe_first_row::<WalletColumns>()
            .map_err(|e| RepositoryError::storage(Operation::Get, e))?
            .ok_or_else(|| RepositoryError::NotFound(wallet_id.clone()))?;

        wallet_from_columns(columns).map_err(|e| RepositoryError::storage(Operation::Get, e))
    }

    async fn update(&self, wallet: &mut Wallet) -> Result<(), RepositoryError> {
        let result = self
            .session
            .query_unpaged(
                "UPDATE wallets SET balance = ?, version = ? WHERE id = ? IF version = ?",
                (
                    wallet.balance().to_string(),
                    wallet.version().next().as_i64(),
                    wallet.id().as_str(),
                    wallet.version().as_i64(),
                ),
            )
            .await
            .map_err(|e| RepositoryError::storage(Operation::Update, e))?;

        let rows = result
            .into_rows_result()
            .map_err(|e| RepositoryError::storage(Operation::Update, e))?;
        let row = rows
            .maybe_first_row::<Row>()
            .map_err(|e| RepositoryError::storage(Operation::Update, e))?;

        match lwt_outcome(row) {
            LwtOutcome::Applied => {
                wallet.advance_version();
                tracing::debug!(wallet_id = %wallet.id(), version = %wallet.version(), "Updated wallet row");
                Ok(())
            }
            LwtOutcome::Rejected { current_version: None } => {
                Err(RepositoryError::NotFound(wallet.id().clone()))
            }
            LwtOutcome::Rejected { current_version: Some(current) } => {
                tracing::warn!(
                    wallet_id = %wallet.id(),
                    expected_version = %wallet.version(),
                    current_version = current,
                    "Optimistic lock conflict on wallets LWT"
                );
                Err(RepositoryError::OptimisticLock {
                    wallet_id: wallet.id().clone(),
                    expected: wallet.version(),
                })
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("wallet {0} already exists")]
struct WalletAlreadyExists(WalletId);

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_applied_lwt() {
        let row = Row {
            columns: vec![Some(CqlValue::Boolean(true))],
        };
        assert_eq!(lwt_outcome(Some(row)), LwtOutcome::Applied);
    }

    #[test]
    fn test_rejected_lwt_reports_current_version() {
        let row = Row {
            columns: vec![Some(CqlValue::Boolean(false)), Some(CqlValue::BigInt(4))],
        };
        assert_eq!(
            lwt_outcome(Some(row)),
            LwtOutcome::Rejected { current_version: Some(4) }
        );
    }

    #[test]
    fn test_rejected_lwt_on_missing_row() {
        let row = Row {
            columns: vec![Some(CqlValue::Boolean(false)), None],
        };
        assert_eq!(lwt_outcome(Some(row)), LwtOutcome::Rejected { current_version: None });
        assert_eq!(lwt_outcome(None), LwtOutcome::Rejected { current_version: None });
    }

    #[test]
    fn test_wallet_from_columns() {
        let created_at = Utc::now();
        let wallet = wallet_from_columns((
            "abc".to_string(),
            "99.95".to_string(),
            "CAD".to_string(),
            created_at,
            2,
        ))
        .unwrap();

        assert_eq!(wallet.balance(), dec!(99.95));
        assert_eq!(wallet.currency(), Currency::CAD);
        assert_eq!(wallet.version().value(), 2);
        assert_eq!(wallet.created_at(), created_at);
    }

    #[tokio::test]
    #[ignore = "Requires ScyllaDB"]
    async fn test_optimistic_locking_works() {
        let node = std::env::var("SCYLLA_NODE").unwrap_or_else(|_| "127.0.0.1:9042".to_string());
        let session = crate::db::scylla::connect(&node, "wallets_test").await.unwrap();
        let repository = ScyllaWalletRepository::new(session);

        let wallet = Wallet::create(Currency::GBP);
        repository.create(&wallet).await.unwrap();

        let mut ours = repository.get(wallet.id()).await.unwrap();
        let mut theirs = repository.get(wallet.id()).await.unwrap();
        theirs.increase_balance(dec!(5), Currency::GBP).unwrap();
        repository.update(&mut theirs).await.unwrap();

        let result = repository.update(&mut ours).await;
        assert!(matches!(result, Err(RepositoryError::OptimisticLock { .. })));
    }
}
