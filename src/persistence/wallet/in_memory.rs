use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::{Operation, RepositoryError, WalletRepository};
use crate::domain::wallet::{Wallet, WalletId, WalletSnapshot};

/// Process-local wallet store with the same compare-and-swap semantics as the
/// database backends
#[derive(Default)]
pub struct InMemoryWalletRepository {
    wallets: Mutex<HashMap<WalletId, WalletSnapshot>>,
}

impl InMemoryWalletRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.wallets.lock().await.len()
    }
}

#[async_trait]
impl WalletRepository for InMemoryWalletRepository {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn create(&self, wallet: &Wallet) -> Result<(), RepositoryError> {
        let mut wallets = self.wallets.lock().await;

        if wallets.contains_key(wallet.id()) {
            return Err(RepositoryError::storage(
                Operation::Create,
                DuplicateWallet(wallet.id().clone()),
            ));
        }

        wallets.insert(wallet.id().clone(), wallet.to_snapshot());
        tracing::debug!(wallet_id = %wallet.id(), "Wallet created");
        Ok(())
    }

    async fn get(&self, wallet_id: &WalletId) -> Result<Wallet, RepositoryError> {
        let snapshot = self
            .wallets
            .lock()
            .await
            .get(wallet_id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(wallet_id.clone()))?;

        Wallet::from_snapshot(snapshot).map_err(|e| RepositoryError::storage(Operation::Get, e))
    }

    async fn update(&self, wallet: &mut Wallet) -> Result<(), RepositoryError> {
        let mut wallets = self.wallets.lock().await;

        let stored = wallets
            .get_mut(wallet.id())
            .ok_or_else(|| RepositoryError::NotFound(wallet.id().clone()))?;

        if stored.version != wallet.version() {
            tracing::warn!(
                wallet_id = %wallet.id(),
                expected_version = %wallet.version(),
                stored_version = %stored.version,
                "Optimistic lock conflict"
            );
            return Err(RepositoryError::OptimisticLock {
                wallet_id: wallet.id().clone(),
                expected: wallet.version(),
            });
        }

        stored.balance = wallet.balance();
        stored.version = wallet.version().next();
        wallet.advance_version();

        tracing::debug!(wallet_id = %wallet.id(), version = %wallet.version(), "Wallet updated");
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("wallet {0} already exists")]
struct DuplicateWallet(WalletId);

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::wallet::Currency;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_can_get_wallet() {
        let repository = InMemoryWalletRepository::new();
        let wallet = Wallet::create(Currency::GBP);
        repository.create(&wallet).await.unwrap();

        let fetched = repository.get(wallet.id()).await.unwrap();

        assert_eq!(fetched.to_snapshot(), wallet.to_snapshot());
    }

    #[tokio::test]
    async fn test_missing_wallet_is_not_found() {
        let repository = InMemoryWalletRepository::new();

        let result = repository.get(&WalletId::new("missing")).await;

        assert!(matches!(result, Err(RepositoryError::NotFound(id)) if id.as_str() == "missing"));
    }

    #[tokio::test]
    async fn test_duplicate_create_is_a_storage_error() {
        let repository = InMemoryWalletRepository::new();
        let wallet = Wallet::create(Currency::GBP);
        repository.create(&wallet).await.unwrap();

        let result = repository.create(&wallet).await;

        assert!(matches!(
            result,
            Err(RepositoryError::Storage { operation: Operation::Create, .. })
        ));
        assert_eq!(repository.len().await, 1);
    }

    #[tokio::test]
    async fn test_can_update_wallet() {
        let repository = InMemoryWalletRepository::new();
        let mut wallet = Wallet::create(Currency::GBP);
        repository.create(&wallet).await.unwrap();

        wallet.increase_balance(dec!(122), Currency::GBP).unwrap();
        repository.update(&mut wallet).await.unwrap();

        let fetched = repository.get(wallet.id()).await.unwrap();
        assert_eq!(fetched.balance(), dec!(122));
        assert_eq!(fetched.version().value(), 1);
        assert_eq!(wallet.version().value(), 1);
    }

    #[tokio::test]
    async fn test_optimistic_locking_works() {
        let repository = InMemoryWalletRepository::new();
        let wallet = Wallet::create(Currency::GBP);
        repository.create(&wallet).await.unwrap();

        let mut ours = repository.get(wallet.id()).await.unwrap();

        // someone modified the wallet in the meantime
        let mut theirs = repository.get(wallet.id()).await.unwrap();
        theirs.increase_balance(dec!(10), Currency::GBP).unwrap();
        repository.update(&mut theirs).await.unwrap();

        ours.increase_balance(dec!(1526), Currency::GBP).unwrap();
        let result = repository.update(&mut ours).await;

        assert!(matches!(result, Err(RepositoryError::OptimisticLock { .. })));
        assert_eq!(ours.version().value(), 0);

        let stored = repository.get(wallet.id()).await.unwrap();
        assert_eq!(stored.balance(), dec!(10));
        assert_eq!(stored.version().value(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_writers_exactly_one_wins() {
        let repository = Arc::new(InMemoryWalletRepository::new());
        let wallet = Wallet::create(Currency::EUR);
        repository.create(&wallet).await.unwrap();

        let mut handles = Vec::new();
        for amount in [dec!(1), dec!(2), dec!(3), dec!(4)] {
            let repository = repository.clone();
            let mut copy = repository.get(wallet.id()).await.unwrap();
            handles.push(tokio::spawn(async move {
                copy.increase_balance(amount, Currency::EUR).unwrap();
                repository.update(&mut copy).await
            }));
        }

        let mut successes = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => successes += 1,
                Err(e) if e.is_conflict() => conflicts += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(conflicts, 3);
        assert_eq!(repository.get(wallet.id()).await.unwrap().version().value(), 1);
    }

    #[tokio::test]
    async fn test_update_of_missing_wallet_is_not_found() {
        let repository = InMemoryWalletRepository::new();
        let mut wallet = Wallet::create(Currency::GBP);

        let result = repository.update(&mut wallet).await;

        assert!(matches!(result, Err(RepositoryError::NotFound(_))));
    }
}
