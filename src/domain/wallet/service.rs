use rust_decimal::Decimal;
use std::sync::Arc;

use super::{Currency, Wallet, WalletError, WalletId};
use crate::metrics::Metrics;
use crate::persistence::wallet::{RepositoryError, WalletRepository};
use crate::utils::retry::{retry_on_transient, IsTransient, RetryConfig};

// ============================================================================
// Wallet Service - read-modify-write with retry on version conflicts
// ============================================================================
//
// Every balance change reloads the wallet, applies the change in memory and
// issues a conditional update. A stale version is the only transient
// failure: the cycle is repeated from a fresh read. Validation errors and
// missing wallets are returned immediately.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum WalletServiceError {
    #[error(transparent)]
    Validation(#[from] WalletError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl IsTransient for WalletServiceError {
    fn is_transient(&self) -> bool {
        matches!(self, WalletServiceError::Repository(e) if e.is_conflict())
    }
}

pub struct WalletService {
    repository: Arc<dyn WalletRepository>,
    retry: RetryConfig,
    metrics: Option<Arc<Metrics>>,
}

impl WalletService {
    pub fn new(repository: Arc<dyn WalletRepository>) -> Self {
        Self {
            repository,
            retry: RetryConfig::for_conflicts(),
            metrics: None,
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub async fn open(&self, currency: Currency) -> Result<Wallet, WalletServiceError> {
        let wallet = Wallet::create(currency);
        self.repository.create(&wallet).await?;

        tracing::info!(
            wallet_id = %wallet.id(),
            currency = %currency,
            backend = self.repository.backend(),
            "💰 Opened wallet"
        );
        Ok(wallet)
    }

    pub async fn balance(&self, wallet_id: &WalletId) -> Result<Decimal, WalletServiceError> {
        Ok(self.repository.get(wallet_id).await?.balance())
    }

    pub async fn deposit(
        &self,
        wallet_id: &WalletId,
        amount: Decimal,
        currency: Currency,
    ) -> Result<Wallet, WalletServiceError> {
        self.modify(wallet_id, "wallet_deposit", |wallet| wallet.increase_balance(amount, currency))
            .await
    }

    pub async fn withdraw(
        &self,
        wallet_id: &WalletId,
        amount: Decimal,
        currency: Currency,
    ) -> Result<Wallet, WalletServiceError> {
        self.modify(wallet_id, "wallet_withdraw", |wallet| wallet.decrease_balance(amount, currency))
            .await
    }

    async fn modify<F>(
        &self,
        wallet_id: &WalletId,
        operation: &'static str,
        change: F,
    ) -> Result<Wallet, WalletServiceError>
    where
        F: Fn(&mut Wallet) -> Result<(), WalletError> + Send + Sync,
    {
        let change = &change;

        let result = retry_on_transient(operation, self.retry.clone(), |attempt| async move {
            if let Some(metrics) = &self.metrics {
                metrics.record_retry_attempt(operation, attempt);
            }

            let mut wallet = self.repository.get(wallet_id).await?;
            change(&mut wallet)?;

            if let Err(e) = self.repository.update(&mut wallet).await {
                if e.is_conflict() {
                    if let Some(metrics) = &self.metrics {
                        metrics.record_wallet_conflict(self.repository.backend());
                    }
                }
                return Err(WalletServiceError::from(e));
            }

            Ok(wallet)
        })
        .await;

        if let Some(metrics) = &self.metrics {
            metrics.record_retry_outcome(operation, result.is_success());
        }

        let wallet = result.into_result()?;
        tracing::debug!(
            wallet_id = %wallet.id(),
            operation = operation,
            balance = %wallet.balance(),
            version = %wallet.version(),
            "Wallet updated"
        );
        Ok(wallet)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
