//! Core types for the wallet
//!
//! All records are plain serde data serialized with bincode by the record
//! store; identities are normalized newtypes so key derivation happens in
//! exactly one place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between owner and timestamp in history keys. Control
/// characters are stripped from account ids, so it cannot occur in one.
const HISTORY_KEY_SEPARATOR: u8 = 0x00;

/// Case-normalized account identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    /// Create an account id, trimming whitespace, lowercasing, and
    /// stripping control characters
    pub fn new(raw: impl AsRef<str>) -> Self {
        let normalized = raw
            .as_ref()
            .trim()
            .chars()
            .filter(|c| !c.is_control())
            .collect::<String>()
            .to_lowercase();
        Self(normalized)
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Store key for this account
    pub(crate) fn key(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Item identity, derived deterministically from the display name:
/// whitespace runs become `_`, the rest is lowercased
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(String);

impl ItemId {
    /// Derive the id for a display name
    pub fn from_name(name: &str) -> Self {
        let id = name
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_")
            .to_lowercase();
        Self(id)
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if the source name contained no usable characters
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Store key for this item
    pub(crate) fn key(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque credential material owned by the authentication shell.
/// The cores store it verbatim and never inspect it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Password hash (shell-defined encoding)
    pub hash: String,
    /// Salt used for the hash
    pub salt: String,
}

/// User account record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Normalized identity
    pub id: AccountId,

    /// Balance in the smallest currency unit
    pub balance: u64,

    /// Credential material (opaque to the cores)
    pub credential: Credential,
}

/// Inventory item record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    /// Display name
    pub name: String,

    /// Price in the smallest currency unit
    pub price: u64,

    /// Ordered list of unique redemption codes; purchases pop the front
    pub stock: Vec<String>,
}

/// Single-use (or bounded-use) credit voucher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Voucher {
    /// Balance credited per redemption
    pub amount: u64,

    /// Maximum number of redemptions
    pub limit: u32,

    /// Redemptions so far; never exceeds `limit`
    pub used: u32,
}

impl Voucher {
    /// True once the usage limit is reached
    pub fn exhausted(&self) -> bool {
        self.used >= self.limit
    }
}

/// Immutable record of one successful purchase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Item display name at purchase time
    pub item_name: String,

    /// Stock code handed to the purchaser
    pub code: String,

    /// Price paid
    pub price: u64,

    /// Purchase timestamp
    pub purchased_at: DateTime<Utc>,
}

/// Item listing row; stock codes are never exposed, only the count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemSummary {
    /// Display name
    pub name: String,
    /// Price in the smallest currency unit
    pub price: u64,
    /// Remaining stock count
    pub stock: usize,
}

/// Account listing row; credential material is never exposed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSummary {
    /// Normalized identity
    pub id: AccountId,
    /// Balance in the smallest currency unit
    pub balance: u64,
}

/// History key: owner bytes, a separator, then the big-endian timestamp
/// so per-owner entries iterate chronologically
pub(crate) fn history_key(owner: &AccountId, timestamp_nanos: i64) -> Vec<u8> {
    let mut key = owner.key().to_vec();
    key.push(HISTORY_KEY_SEPARATOR);
    key.extend_from_slice(&timestamp_nanos.to_be_bytes());
    key
}

/// Prefix selecting every history entry of one owner
pub(crate) fn history_prefix(owner: &AccountId) -> Vec<u8> {
    let mut prefix = owner.key().to_vec();
    prefix.push(HISTORY_KEY_SEPARATOR);
    prefix
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_id_normalization() {
        assert_eq!(AccountId::new("  Alice ").as_str(), "alice");
        assert_eq!(AccountId::new("BOB"), AccountId::new("bob"));
        assert_eq!(AccountId::new("ca\u{0}rol").as_str(), "carol");
    }

    #[test]
    fn test_item_id_derivation() {
        assert_eq!(ItemId::from_name("Gift Card").as_str(), "gift_card");
        assert_eq!(ItemId::from_name("  Steam   Key ").as_str(), "steam_key");
        assert_eq!(ItemId::from_name("UPPER").as_str(), "upper");
        assert!(ItemId::from_name("   ").is_empty());
    }

    #[test]
    fn test_voucher_exhaustion() {
        let mut voucher = Voucher {
            amount: 1000,
            limit: 2,
            used: 0,
        };
        assert!(!voucher.exhausted());
        voucher.used = 2;
        assert!(voucher.exhausted());
    }

    #[test]
    fn test_history_key_ordering() {
        let owner = AccountId::new("alice");
        let earlier = history_key(&owner, 1_000);
        let later = history_key(&owner, 2_000);
        assert!(earlier < later);
        assert!(earlier.starts_with(&history_prefix(&owner)));
    }

    #[test]
    fn test_history_prefix_does_not_capture_longer_names() {
        let alice = history_prefix(&AccountId::new("alice"));
        let alicia = history_key(&AccountId::new("alicia"), 1_000);
        assert!(!alicia.starts_with(&alice));
    }
}
