use rust_decimal::Decimal;

use super::value_objects::Currency;

// ============================================================================
// Wallet Business Rule Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WalletError {
    #[error("Can not decrease balance by `{requested}` because the current balance is `{available}`")]
    InsufficientBalance { requested: Decimal, available: Decimal },

    #[error("Given currency {given} is different than currency {expected} assigned to the wallet")]
    WrongCurrency { expected: Currency, given: Currency },

    #[error("Adding `{requested}` to the balance `{balance}` overflows")]
    BalanceOverflow { requested: Decimal, balance: Decimal },

    #[error("Amount must not be negative: {0}")]
    InvalidAmount(Decimal),

    #[error("Balance must not be negative: {0}")]
    NegativeBalance(Decimal),

    #[error("Version can not be smaller than 0: {0}")]
    NegativeVersion(i64),

    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),

    #[error("Unparsable balance: {0}")]
    UnparsableBalance(String),
}
