//! Inventory core: stock-list mutation
//!
//! A purchase pops the first stock code, debits the buyer, and appends a
//! history entry, all derived from one snapshot and committed in one batch
//! conditioned on the item's and the account's read versions. The history
//! key carries a check-absent precondition, so even the fresh-key write
//! cannot land unless the whole transaction does. Stock and balance checks
//! re-run on every retry.

use crate::{
    config::RetryConfig,
    error::{Error, Result},
    metrics::Metrics,
    txn,
    types::{history_key, history_prefix, Account, AccountId, HistoryEntry, Item, ItemId, ItemSummary},
};
use chrono::Utc;
use record_store::{Batch, Keyspace, Store, Versioned};
use std::sync::Arc;

/// Stock and purchase engine
pub struct InventoryCore {
    store: Arc<Store>,
    retry: RetryConfig,
    metrics: Metrics,
}

impl InventoryCore {
    /// Create new inventory core
    pub fn new(store: Arc<Store>, retry: RetryConfig, metrics: Metrics) -> Self {
        Self {
            store,
            retry,
            metrics,
        }
    }

    /// Create or replace an item (admin operation); returns the derived id
    pub async fn add_item(&self, name: &str, price: u64, stock: Vec<String>) -> Result<ItemId> {
        let id = ItemId::from_name(name);
        if id.is_empty() {
            return Err(Error::InvalidItemName(name.to_string()));
        }

        let item = Item {
            name: name.trim().to_string(),
            price,
            stock,
        };
        let stock_count = item.stock.len();
        let batch = Batch::new().put(Keyspace::Items, id.key().to_vec(), &item)?;
        self.store.commit(batch)?;

        tracing::info!(item = %id, price, stock = stock_count, "Item added");
        Ok(id)
    }

    /// List all items; stock codes are reduced to a count
    pub async fn list_items(&self) -> Result<Vec<ItemSummary>> {
        let records: Vec<(Vec<u8>, Item)> = self.store.scan_prefix(Keyspace::Items, b"")?;
        Ok(records
            .into_iter()
            .map(|(_, item)| ItemSummary {
                name: item.name,
                price: item.price,
                stock: item.stock.len(),
            })
            .collect())
    }

    /// Buy one unit of an item; returns the redemption code handed out.
    ///
    /// Exactly-once delivery of stock codes: the commit is conditioned on
    /// the item version, so two purchasers racing for the last code cannot
    /// both succeed.
    pub async fn purchase(&self, buyer: &AccountId, item_name: &str) -> Result<String> {
        let id = ItemId::from_name(item_name);

        let code = txn::run(&self.store, &self.retry, &self.metrics, "purchase", || {
            let Versioned {
                value: mut item,
                version: item_version,
            } = self
                .store
                .get::<Item>(Keyspace::Items, id.key())?
                .ok_or_else(|| Error::ItemNotFound(item_name.to_string()))?;

            // Re-validated on every retry
            if item.stock.is_empty() {
                return Err(Error::OutOfStock(item.name));
            }

            let Versioned {
                value: mut account,
                version: account_version,
            } = self
                .store
                .get::<Account>(Keyspace::Accounts, buyer.key())?
                .ok_or_else(|| Error::AccountNotFound(buyer.to_string()))?;

            if account.balance < item.price {
                return Err(Error::InsufficientFunds {
                    needed: item.price,
                    available: account.balance,
                });
            }

            let code = item.stock.remove(0);
            account.balance -= item.price;

            let purchased_at = Utc::now();
            let entry = HistoryEntry {
                item_name: item.name.clone(),
                code: code.clone(),
                price: item.price,
                purchased_at,
            };
            let entry_key = history_key(buyer, purchased_at.timestamp_nanos_opt().unwrap_or(0));

            let batch = Batch::new()
                .check(Keyspace::Items, id.key().to_vec(), item_version)
                .check(Keyspace::Accounts, buyer.key().to_vec(), account_version)
                .check_absent(Keyspace::History, entry_key.clone())
                .put(Keyspace::Items, id.key().to_vec(), &item)?
                .put(Keyspace::Accounts, buyer.key().to_vec(), &account)?
                .put(Keyspace::History, entry_key, &entry)?;
            Ok((batch, code))
        })
        .await?;

        tracing::debug!(buyer = %buyer, item = %id, code, "Purchase committed");
        Ok(code)
    }

    /// Purchase history for one owner, most recent first
    pub async fn history(&self, owner: &AccountId) -> Result<Vec<HistoryEntry>> {
        let records: Vec<(Vec<u8>, HistoryEntry)> = self
            .store
            .scan_prefix(Keyspace::History, &history_prefix(owner))?;
        Ok(records.into_iter().rev().map(|(_, entry)| entry).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::LedgerCore;
    use crate::types::Credential;
    use record_store::StoreConfig;
    use tempfile::TempDir;

    fn test_cores() -> (LedgerCore, InventoryCore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = StoreConfig {
            data_dir: temp_dir.path().to_path_buf(),
            ..Default::default()
        };
        let store = Arc::new(Store::open(&config).unwrap());
        let metrics = Metrics::new().unwrap();
        let ledger = LedgerCore::new(store.clone(), RetryConfig::default(), metrics.clone());
        let inventory = InventoryCore::new(store, RetryConfig::default(), metrics);
        (ledger, inventory, temp_dir)
    }

    fn credential() -> Credential {
        Credential {
            hash: "deadbeef".to_string(),
            salt: "0123".to_string(),
        }
    }

    async fn funded_account(ledger: &LedgerCore, name: &str, balance: u64) -> AccountId {
        let id = AccountId::new(name);
        ledger.create_account(&id, credential()).await.unwrap();
        if balance > 0 {
            ledger.top_up(&id, balance).await.unwrap();
        }
        id
    }

    #[tokio::test]
    async fn test_purchase_pops_code_debits_and_records_history() {
        let (ledger, inventory, _temp) = test_cores();
        let alice = funded_account(&ledger, "alice", 1000).await;

        inventory
            .add_item("Gift Card", 500, vec!["C1".to_string()])
            .await
            .unwrap();

        let code = inventory.purchase(&alice, "Gift Card").await.unwrap();
        assert_eq!(code, "C1");
        assert_eq!(ledger.get_account(&alice).await.unwrap().balance, 500);

        let items = inventory.list_items().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].stock, 0);

        let history = inventory.history(&alice).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].code, "C1");
        assert_eq!(history[0].item_name, "Gift Card");
        assert_eq!(history[0].price, 500);

        // Stock is gone
        let err = inventory.purchase(&alice, "Gift Card").await.unwrap_err();
        assert!(matches!(err, Error::OutOfStock(_)));
    }

    #[tokio::test]
    async fn test_purchase_preconditions_leave_state_untouched() {
        let (ledger, inventory, _temp) = test_cores();
        let alice = funded_account(&ledger, "alice", 100).await;

        let err = inventory.purchase(&alice, "Missing").await.unwrap_err();
        assert!(matches!(err, Error::ItemNotFound(_)));

        inventory
            .add_item("Steam Key", 500, vec!["K1".to_string()])
            .await
            .unwrap();

        let err = inventory.purchase(&alice, "Steam Key").await.unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientFunds {
                needed: 500,
                available: 100
            }
        ));

        assert_eq!(ledger.get_account(&alice).await.unwrap().balance, 100);
        assert_eq!(inventory.list_items().await.unwrap()[0].stock, 1);
        assert!(inventory.history(&alice).await.unwrap().is_empty());

        let err = inventory
            .purchase(&AccountId::new("ghost"), "Steam Key")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AccountNotFound(_)));
    }

    #[tokio::test]
    async fn test_item_lookup_by_display_name() {
        let (ledger, inventory, _temp) = test_cores();
        let alice = funded_account(&ledger, "alice", 1000).await;

        inventory
            .add_item("Gift Card", 100, vec!["A".to_string(), "B".to_string()])
            .await
            .unwrap();

        // Lookup normalizes the same way the id was derived
        let code = inventory.purchase(&alice, "  gift   CARD ").await.unwrap();
        assert_eq!(code, "A");
    }

    #[tokio::test]
    async fn test_add_item_rejects_blank_name() {
        let (_ledger, inventory, _temp) = test_cores();
        let err = inventory.add_item("   ", 100, vec![]).await.unwrap_err();
        assert!(matches!(err, Error::InvalidItemName(_)));
    }

    #[tokio::test]
    async fn test_history_is_reverse_chronological() {
        let (ledger, inventory, _temp) = test_cores();
        let alice = funded_account(&ledger, "alice", 1000).await;

        inventory
            .add_item(
                "Card",
                100,
                vec!["C1".to_string(), "C2".to_string(), "C3".to_string()],
            )
            .await
            .unwrap();

        for _ in 0..3 {
            inventory.purchase(&alice, "Card").await.unwrap();
        }

        let history = inventory.history(&alice).await.unwrap();
        let codes: Vec<&str> = history.iter().map(|e| e.code.as_str()).collect();
        assert_eq!(codes, vec!["C3", "C2", "C1"]);
        assert!(history[0].purchased_at >= history[2].purchased_at);
    }
}
