use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::errors::WalletError;
use super::value_objects::{Currency, Version, WalletId};

// ============================================================================
// Wallet - Versioned Entity
// ============================================================================
//
// Balance changes happen in memory. Persisting them is the job of a
// WalletRepository, which guards every update with the version the wallet
// was read at.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Wallet {
    id: WalletId,
    balance: Decimal,
    currency: Currency,
    created_at: DateTime<Utc>,
    version: Version,
}

/// Storage-neutral record form of a wallet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletSnapshot {
    pub id: WalletId,
    pub balance: Decimal,
    pub currency: Currency,
    pub created_at: DateTime<Utc>,
    pub version: Version,
}

impl Wallet {
    /// New wallet with zero balance at version 0
    pub fn create(currency: Currency) -> Self {
        Self {
            id: WalletId::generate(),
            balance: Decimal::ZERO,
            currency,
            created_at: Utc::now(),
            version: Version::zero(),
        }
    }

    /// Rebuild a wallet from a stored record
    pub fn from_snapshot(snapshot: WalletSnapshot) -> Result<Self, WalletError> {
        if snapshot.balance < Decimal::ZERO {
            return Err(WalletError::NegativeBalance(snapshot.balance));
        }

        Ok(Self {
            id: snapshot.id,
            balance: snapshot.balance,
            currency: snapshot.currency,
            created_at: snapshot.created_at,
            version: snapshot.version,
        })
    }

    pub fn to_snapshot(&self) -> WalletSnapshot {
        WalletSnapshot {
            id: self.id.clone(),
            balance: self.balance,
            currency: self.currency,
            created_at: self.created_at,
            version: self.version,
        }
    }

    pub fn id(&self) -> &WalletId {
        &self.id
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn increase_balance(&mut self, how_much: Decimal, currency: Currency) -> Result<(), WalletError> {
        self.validate(how_much, currency)?;
        self.balance = self
            .balance
            .checked_add(how_much)
            .ok_or(WalletError::BalanceOverflow {
                requested: how_much,
                balance: self.balance,
            })?;
        Ok(())
    }

    pub fn decrease_balance(&mut self, how_much: Decimal, currency: Currency) -> Result<(), WalletError> {
        self.validate(how_much, currency)?;

        if how_much > self.balance {
            return Err(WalletError::InsufficientBalance {
                requested: how_much,
                available: self.balance,
            });
        }

        self.balance -= how_much;
        Ok(())
    }

    /// Called by repositories once a conditional write has been applied
    pub(crate) fn advance_version(&mut self) {
        self.version = self.version.next();
    }

    fn validate(&self, how_much: Decimal, currency: Currency) -> Result<(), WalletError> {
        if currency != self.currency {
            return Err(WalletError::WrongCurrency {
                expected: self.currency,
                given: currency,
            });
        }
        if how_much < Decimal::ZERO {
            return Err(WalletError::InvalidAmount(how_much));
        }
        Ok(())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
