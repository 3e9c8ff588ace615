//! Error types for the wallet cores
//!
//! Precondition failures are deterministic given the snapshot an operation
//! read and are never retried. Version conflicts are retried internally and
//! only surface as [`Error::TransientConflict`] once the retry ceiling is
//! exhausted. Store failures propagate as-is.

use thiserror::Error;

/// Result type for wallet operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wallet errors
#[derive(Error, Debug)]
pub enum Error {
    /// Amount is zero or would overflow a balance
    #[error("Invalid amount")]
    InvalidAmount,

    /// Sender and receiver are the same account
    #[error("Cannot transfer to self")]
    SelfTransfer,

    /// Account does not exist
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Account already exists
    #[error("Account already exists: {0}")]
    AccountExists(String),

    /// Item does not exist
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    /// Item name is empty after normalization
    #[error("Invalid item name: {0:?}")]
    InvalidItemName(String),

    /// Item has no stock codes left
    #[error("Item out of stock: {0}")]
    OutOfStock(String),

    /// Balance is below the required amount
    #[error("Insufficient funds: need {needed}, have {available}")]
    InsufficientFunds {
        /// Amount the operation required
        needed: u64,
        /// Balance at the snapshot
        available: u64,
    },

    /// Voucher code does not exist
    #[error("Voucher not found: {0}")]
    VoucherNotFound(String),

    /// Voucher usage limit reached
    #[error("Voucher fully used: {0}")]
    VoucherExhausted(String),

    /// Commit kept conflicting with concurrent writers up to the retry ceiling
    #[error("Operation {op} aborted after {attempts} conflicting commit attempts")]
    TransientConflict {
        /// Operation name
        op: &'static str,
        /// Attempts made before giving up
        attempts: u32,
    },

    /// Record store failure
    #[error("Store error: {0}")]
    Store(#[from] record_store::Error),

    /// Metrics registration failure
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
