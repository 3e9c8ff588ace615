//! Versioned storage layer using RocksDB
//!
//! # Column Families
//!
//! - `accounts` - Account records (key: normalized username)
//! - `items` - Inventory items (key: derived item id)
//! - `vouchers` - Redemption vouchers (key: voucher code)
//! - `history` - Purchase history (key: owner || 0x00 || timestamp)
//!
//! # Value encoding
//!
//! Every stored value is an 8-byte big-endian version counter followed by
//! the bincode payload. The version is the conditional-commit token: a
//! [`Batch`] precondition names the version a reader observed, and
//! [`Store::commit`] rejects the whole batch if any named key has moved on.

use crate::{
    config::StoreConfig,
    error::{Error, Result},
};
use parking_lot::Mutex;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, Direction, IteratorMode, Options, WriteBatch, DB,
};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

/// Column family names
const CF_ACCOUNTS: &str = "accounts";
const CF_ITEMS: &str = "items";
const CF_VOUCHERS: &str = "vouchers";
const CF_HISTORY: &str = "history";

/// Width of the version prefix on every stored value
const VERSION_PREFIX_LEN: usize = 8;

/// Logical keyspace, one per entity collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyspace {
    /// User accounts
    Accounts,
    /// Inventory items
    Items,
    /// Redemption vouchers
    Vouchers,
    /// Append-only purchase history
    History,
}

impl Keyspace {
    /// All keyspaces, in column-family declaration order
    pub const ALL: [Keyspace; 4] = [
        Keyspace::Accounts,
        Keyspace::Items,
        Keyspace::Vouchers,
        Keyspace::History,
    ];

    fn cf_name(self) -> &'static str {
        match self {
            Keyspace::Accounts => CF_ACCOUNTS,
            Keyspace::Items => CF_ITEMS,
            Keyspace::Vouchers => CF_VOUCHERS,
            Keyspace::History => CF_HISTORY,
        }
    }
}

/// Opaque version token observed at read time
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version(u64);

impl Version {
    /// Version assigned to the first write of a key
    const FIRST: Version = Version(1);

    fn next(self) -> Version {
        Version(self.0 + 1)
    }
}

/// A value together with the version it was read at
#[derive(Debug, Clone)]
pub struct Versioned<T> {
    /// Decoded record
    pub value: T,
    /// Version token for conditional commits
    pub version: Version,
}

/// Outcome of a conditional commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// All preconditions held; every put was applied atomically
    Committed,
    /// At least one precondition was stale; nothing was written
    Conflict,
}

struct Check {
    space: Keyspace,
    key: Vec<u8>,
    /// Expected current version; `None` means the key must be absent
    expected: Option<Version>,
}

struct Put {
    space: Keyspace,
    key: Vec<u8>,
    payload: Vec<u8>,
}

/// Builder for an atomic conditional commit
#[derive(Default)]
pub struct Batch {
    checks: Vec<Check>,
    puts: Vec<Put>,
}

impl Batch {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Require that `key` is still at `version` at commit time
    pub fn check(mut self, space: Keyspace, key: impl Into<Vec<u8>>, version: Version) -> Self {
        self.checks.push(Check {
            space,
            key: key.into(),
            expected: Some(version),
        });
        self
    }

    /// Require that `key` does not exist at commit time
    pub fn check_absent(mut self, space: Keyspace, key: impl Into<Vec<u8>>) -> Self {
        self.checks.push(Check {
            space,
            key: key.into(),
            expected: None,
        });
        self
    }

    /// Stage a write; applied only if every precondition holds
    pub fn put<T: Serialize>(
        mut self,
        space: Keyspace,
        key: impl Into<Vec<u8>>,
        value: &T,
    ) -> Result<Self> {
        let payload = bincode::serialize(value)?;
        self.puts.push(Put {
            space,
            key: key.into(),
            payload,
        });
        Ok(self)
    }

    /// True if the batch stages no writes
    pub fn is_empty(&self) -> bool {
        self.puts.is_empty()
    }
}

/// Versioned store over RocksDB
pub struct Store {
    db: Arc<DB>,

    /// Serializes the check-then-write section of [`Store::commit`].
    /// Reads never take this lock.
    commit_gate: Mutex<()>,
}

impl Store {
    /// Open or create the database
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let path = &config.data_dir;

        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_write_buffer_size(config.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.max_write_buffer_number);
        db_opts.set_max_background_jobs(config.max_background_jobs);

        if config.enable_statistics {
            db_opts.enable_statistics();
        }

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_ACCOUNTS, Self::cf_options_point()),
            ColumnFamilyDescriptor::new(CF_ITEMS, Self::cf_options_point()),
            ColumnFamilyDescriptor::new(CF_VOUCHERS, Self::cf_options_point()),
            ColumnFamilyDescriptor::new(CF_HISTORY, Self::cf_options_history()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!("Opened record store at {:?}", path);

        Ok(Self {
            db: Arc::new(db),
            commit_gate: Mutex::new(()),
        })
    }

    // Column family options

    fn cf_options_point() -> Options {
        let mut opts = Options::default();
        // Point-read heavy, use LZ4 for speed
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_history() -> Options {
        let mut opts = Options::default();
        // Append-only, scanned in ranges
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    fn cf_handle(&self, space: Keyspace) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(space.cf_name())
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", space.cf_name())))
    }

    // Point operations

    /// Read a record with its version, or `None` if absent
    pub fn get<T: DeserializeOwned>(
        &self,
        space: Keyspace,
        key: &[u8],
    ) -> Result<Option<Versioned<T>>> {
        let cf = self.cf_handle(space)?;

        let raw = match self.db.get_cf(&cf, key)? {
            Some(raw) => raw,
            None => return Ok(None),
        };

        let (version, payload) = Self::split_value(space, key, &raw)?;
        let value: T = bincode::deserialize(payload).map_err(|e| {
            Error::Corruption(format!(
                "undecodable {} record {:?}: {}",
                space.cf_name(),
                String::from_utf8_lossy(key),
                e
            ))
        })?;

        Ok(Some(Versioned { value, version }))
    }

    /// Scan a keyspace for all records whose key starts with `prefix`,
    /// in ascending key order
    pub fn scan_prefix<T: DeserializeOwned>(
        &self,
        space: Keyspace,
        prefix: &[u8],
    ) -> Result<Vec<(Vec<u8>, T)>> {
        let cf = self.cf_handle(space)?;
        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(prefix, Direction::Forward));

        let mut records = Vec::new();
        for item in iter {
            let (key, raw) = item?;
            if !key.starts_with(prefix) {
                break;
            }

            let (_, payload) = Self::split_value(space, &key, &raw)?;
            let value: T = bincode::deserialize(payload).map_err(|e| {
                Error::Corruption(format!(
                    "undecodable {} record {:?}: {}",
                    space.cf_name(),
                    String::from_utf8_lossy(&key),
                    e
                ))
            })?;
            records.push((key.to_vec(), value));
        }

        Ok(records)
    }

    // Conditional commit

    /// Apply `batch` atomically iff every precondition still holds.
    ///
    /// Verifies each check against the current stored version, then writes
    /// every put (with its version bumped) in one RocksDB `WriteBatch`.
    /// Returns [`CommitOutcome::Conflict`] without writing anything if any
    /// check fails.
    pub fn commit(&self, batch: Batch) -> Result<CommitOutcome> {
        let _gate = self.commit_gate.lock();

        for check in &batch.checks {
            let current = self.current_version(check.space, &check.key)?;
            if current != check.expected {
                tracing::debug!(
                    keyspace = check.space.cf_name(),
                    key = %String::from_utf8_lossy(&check.key),
                    "Commit rejected: stale version"
                );
                return Ok(CommitOutcome::Conflict);
            }
        }

        let mut wb = WriteBatch::default();
        for put in &batch.puts {
            let next = match self.current_version(put.space, &put.key)? {
                Some(version) => version.next(),
                None => Version::FIRST,
            };

            let mut value = Vec::with_capacity(VERSION_PREFIX_LEN + put.payload.len());
            value.extend_from_slice(&next.0.to_be_bytes());
            value.extend_from_slice(&put.payload);

            let cf = self.cf_handle(put.space)?;
            wb.put_cf(&cf, &put.key, &value);
        }

        self.db.write(wb)?;

        Ok(CommitOutcome::Committed)
    }

    /// Read only the version prefix of a key
    fn current_version(&self, space: Keyspace, key: &[u8]) -> Result<Option<Version>> {
        let cf = self.cf_handle(space)?;

        let raw = match self.db.get_pinned_cf(&cf, key)? {
            Some(raw) => raw,
            None => return Ok(None),
        };

        if raw.len() < VERSION_PREFIX_LEN {
            return Err(Error::Corruption(format!(
                "{} record {:?} shorter than version prefix",
                space.cf_name(),
                String::from_utf8_lossy(key)
            )));
        }

        let mut buf = [0u8; VERSION_PREFIX_LEN];
        buf.copy_from_slice(&raw[..VERSION_PREFIX_LEN]);
        Ok(Some(Version(u64::from_be_bytes(buf))))
    }

    fn split_value<'a>(space: Keyspace, key: &[u8], raw: &'a [u8]) -> Result<(Version, &'a [u8])> {
        if raw.len() < VERSION_PREFIX_LEN {
            return Err(Error::Corruption(format!(
                "{} record {:?} shorter than version prefix",
                space.cf_name(),
                String::from_utf8_lossy(key)
            )));
        }

        let mut buf = [0u8; VERSION_PREFIX_LEN];
        buf.copy_from_slice(&raw[..VERSION_PREFIX_LEN]);
        Ok((Version(u64::from_be_bytes(buf)), &raw[VERSION_PREFIX_LEN..]))
    }

    /// Close database (graceful shutdown)
    pub fn close(self) -> Result<()> {
        drop(self.db);
        tracing::info!("Record store closed");
        Ok(())
    }
}
