//! WalletRail Record Store
//!
//! Versioned key-value store adapter over RocksDB.
//!
//! Every stored record carries an opaque version token. Reads return the
//! token alongside the value; writers submit a [`Batch`] of preconditions
//! (expected versions, or expected absence) plus puts, and the store
//! applies the whole batch atomically only if every precondition still
//! holds. A rejected batch leaves the store untouched.
//!
//! # Invariants
//!
//! - Per-key linearizability: committed writes to one key form a total
//!   order, and each commit observed the latest prior version.
//! - All-or-nothing: a batch never applies partially.
//! - Malformed stored bytes surface as [`Error::Corruption`], never as a
//!   panic or a silent default.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod config;
pub mod error;
pub mod store;

// Re-exports
pub use config::StoreConfig;
pub use error::{Error, Result};
pub use store::{Batch, CommitOutcome, Keyspace, Store, Version, Versioned};
