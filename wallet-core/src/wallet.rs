//! Wallet facade
//!
//! Owns the record-store handle (opened once, shared by reference with
//! every core) and delegates operations to the ledger, voucher, and
//! inventory engines. The authentication shell resolves identities and
//! maps the typed results and failures to its transport; the facade is
//! the whole surface it calls.
//!
//! # Example
//!
//! ```no_run
//! use wallet_core::{AccountId, Config, Credential, Wallet};
//!
//! #[tokio::main]
//! async fn main() -> wallet_core::Result<()> {
//!     let wallet = Wallet::open(Config::default())?;
//!
//!     let alice = AccountId::new("alice");
//!     wallet
//!         .create_account(
//!             &alice,
//!             Credential {
//!                 hash: "ab12".into(),
//!                 salt: "cd34".into(),
//!             },
//!         )
//!         .await?;
//!     let balance = wallet.top_up(&alice, 1_000).await?;
//!     assert_eq!(balance, 1_000);
//!
//!     wallet.shutdown()
//! }
//! ```

use crate::{
    config::Config,
    error::Result,
    inventory::InventoryCore,
    ledger::LedgerCore,
    metrics::Metrics,
    types::{Account, AccountId, AccountSummary, Credential, HistoryEntry, ItemId, ItemSummary},
    voucher::VoucherCore,
};
use record_store::Store;
use std::sync::Arc;

/// Main wallet interface
pub struct Wallet {
    ledger: LedgerCore,
    vouchers: VoucherCore,
    inventory: InventoryCore,
    metrics: Metrics,
    config: Config,
}

impl Wallet {
    /// Open the store and wire up the cores
    pub fn open(config: Config) -> Result<Self> {
        let store = Arc::new(Store::open(&config.store)?);
        let metrics = Metrics::new()?;

        let ledger = LedgerCore::new(store.clone(), config.retry.clone(), metrics.clone());
        let vouchers = VoucherCore::new(store.clone(), config.retry.clone(), metrics.clone());
        let inventory = InventoryCore::new(store, config.retry.clone(), metrics.clone());

        tracing::info!(service = %config.service_name, "Wallet core opened");

        Ok(Self {
            ledger,
            vouchers,
            inventory,
            metrics,
            config,
        })
    }

    // Ledger operations

    /// Create an account with zero balance
    pub async fn create_account(&self, id: &AccountId, credential: Credential) -> Result<()> {
        self.ledger.create_account(id, credential).await
    }

    /// Look up one account
    pub async fn get_account(&self, id: &AccountId) -> Result<Account> {
        self.ledger.get_account(id).await
    }

    /// Replace an account's credential material
    pub async fn update_credential(&self, id: &AccountId, credential: Credential) -> Result<()> {
        self.ledger.update_credential(id, credential).await
    }

    /// List all accounts as (id, balance) summaries
    pub async fn list_accounts(&self) -> Result<Vec<AccountSummary>> {
        self.ledger.list_accounts().await
    }

    /// Credit an account; returns the new balance
    pub async fn top_up(&self, id: &AccountId, amount: u64) -> Result<u64> {
        self.ledger.top_up(id, amount).await
    }

    /// Move funds between two accounts; returns the sender's new balance
    pub async fn transfer(
        &self,
        sender: &AccountId,
        receiver: &AccountId,
        amount: u64,
    ) -> Result<u64> {
        self.ledger.transfer(sender, receiver, amount).await
    }

    // Voucher operations

    /// Create or replace a voucher (admin operation)
    pub async fn create_voucher(&self, code: &str, amount: u64, limit: u32) -> Result<()> {
        self.vouchers.create_voucher(code, amount, limit).await
    }

    /// Redeem a voucher for an account; returns the credited amount
    pub async fn redeem(&self, account: &AccountId, code: &str) -> Result<u64> {
        self.vouchers.redeem(account, code).await
    }

    // Inventory operations

    /// Create or replace an item (admin operation)
    pub async fn add_item(&self, name: &str, price: u64, stock: Vec<String>) -> Result<ItemId> {
        self.inventory.add_item(name, price, stock).await
    }

    /// List all items with remaining stock counts
    pub async fn list_items(&self) -> Result<Vec<ItemSummary>> {
        self.inventory.list_items().await
    }

    /// Buy one unit of an item; returns the redemption code
    pub async fn purchase(&self, buyer: &AccountId, item_name: &str) -> Result<String> {
        self.inventory.purchase(buyer, item_name).await
    }

    /// Purchase history for one owner, most recent first
    pub async fn history(&self, owner: &AccountId) -> Result<Vec<HistoryEntry>> {
        self.inventory.history(owner).await
    }

    // Lifecycle

    /// Metrics for the shell to scrape
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Configuration the wallet was opened with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shutdown; the store closes when the last core drops its handle
    pub fn shutdown(self) -> Result<()> {
        tracing::info!(service = %self.config.service_name, "Wallet core shut down");
        Ok(())
    }
}
