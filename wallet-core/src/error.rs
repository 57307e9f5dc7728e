//! Error types for the wallet core

use crate::types::UserId;
use rust_decimal::Decimal;
use thiserror::Error;

/// Result type for wallet operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wallet errors
///
/// Business-rule failures are ordinary values of this enum; nothing in the
/// core panics on user input. Provider failures keep the raw provider
/// message so callers can show it.
#[derive(Error, Debug)]
pub enum Error {
    /// Account not found
    #[error("Account not found: {0}")]
    AccountNotFound(UserId),

    /// Invoice not found
    #[error("Invoice not found: {0}")]
    InvoiceNotFound(String),

    /// Withdrawal not found
    #[error("Withdrawal not found: {0}")]
    WithdrawalNotFound(uuid::Uuid),

    /// Promo code not found
    #[error("Promo code not found: {0}")]
    PromoNotFound(String),

    /// Promo code already activated by this user
    #[error("Promo code already activated: {0}")]
    PromoAlreadyActivated(String),

    /// Promo code expired
    #[error("Promo code expired: {0}")]
    PromoExpired(String),

    /// Promo code activation cap exhausted
    #[error("Promo code activation limit reached: {0}")]
    PromoLimitReached(String),

    /// Caller-side funds check failed
    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        /// Balance available to the user
        available: Decimal,
        /// Amount the operation needed
        requested: Decimal,
    },

    /// Application float at the provider cannot cover the payout
    #[error("Provider float insufficient: available {available}, requested {requested}")]
    ProviderFloatInsufficient {
        /// Float available at the provider
        available: Decimal,
        /// Amount the transfer needed
        requested: Decimal,
    },

    /// Malformed amount, bet, or request parameter
    #[error("Validation error: {0}")]
    Validation(String),

    /// External provider failure (network or explicit error payload)
    #[error("Provider error: {0}")]
    Provider(#[from] provider::Error),

    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}
