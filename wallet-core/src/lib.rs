//! WalletRail Wallet Core
//!
//! Balance, voucher, and inventory mutation cores over a versioned
//! record store.
//!
//! # Architecture
//!
//! - **Optimistic concurrency**: every mutation is a read-validate-commit
//!   transaction conditioned on the versions it read; conflicts retry from
//!   a fresh snapshot, nothing ever locks across I/O
//! - **Atomic multi-record commits**: transfer, redeem, and purchase touch
//!   several records and apply all of their writes or none
//! - **Typed failures**: precondition violations are deterministic per
//!   snapshot and surface verbatim; only version conflicts retry
//!
//! # Invariants
//!
//! - Account balances are never observed negative
//! - A stock code leaves an item's stock list exactly once
//! - A voucher's used count never exceeds its limit
//! - Purchase history is append-only

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod config;
pub mod error;
pub mod inventory;
pub mod ledger;
pub mod metrics;
pub mod types;
pub mod voucher;
pub mod wallet;

mod txn;

// Re-exports
pub use config::{Config, RetryConfig};
pub use error::{Error, Result};
pub use inventory::InventoryCore;
pub use ledger::LedgerCore;
pub use metrics::Metrics;
pub use types::{
    Account, AccountId, AccountSummary, Credential, HistoryEntry, Item, ItemId, ItemSummary,
    Voucher,
};
pub use voucher::VoucherCore;
pub use wallet::Wallet;
