//! Voucher core: bounded-use code redemption
//!
//! Redemption reads the voucher and the account in one snapshot and
//! commits the used-count increment together with the balance credit,
//! conditioned on both versions. The exhaustion check runs against every
//! fresh snapshot, so a retry that lands after a concurrent winner took
//! the last use reports `VoucherExhausted` instead of over-redeeming.

use crate::{
    config::RetryConfig,
    error::{Error, Result},
    metrics::Metrics,
    txn,
    types::{Account, AccountId, Voucher},
};
use record_store::{Batch, Keyspace, Store, Versioned};
use std::sync::Arc;

/// Voucher redemption engine
pub struct VoucherCore {
    store: Arc<Store>,
    retry: RetryConfig,
    metrics: Metrics,
}

impl VoucherCore {
    /// Create new voucher core
    pub fn new(store: Arc<Store>, retry: RetryConfig, metrics: Metrics) -> Self {
        Self {
            store,
            retry,
            metrics,
        }
    }

    /// Create or replace a voucher (admin operation)
    pub async fn create_voucher(&self, code: &str, amount: u64, limit: u32) -> Result<()> {
        if amount == 0 || limit == 0 {
            return Err(Error::InvalidAmount);
        }

        let voucher = Voucher {
            amount,
            limit,
            used: 0,
        };
        let batch = Batch::new().put(Keyspace::Vouchers, code.as_bytes().to_vec(), &voucher)?;
        self.store.commit(batch)?;

        tracing::info!(code, amount, limit, "Voucher created");
        Ok(())
    }

    /// Redeem one use of a voucher, crediting its amount to the account.
    /// Returns the credited amount.
    pub async fn redeem(&self, account: &AccountId, code: &str) -> Result<u64> {
        let amount = txn::run(&self.store, &self.retry, &self.metrics, "redeem", || {
            let Versioned {
                value: mut voucher,
                version: voucher_version,
            } = self
                .store
                .get::<Voucher>(Keyspace::Vouchers, code.as_bytes())?
                .ok_or_else(|| Error::VoucherNotFound(code.to_string()))?;

            // Re-validated on every retry: a concurrent winner may have
            // taken the last use since the previous snapshot
            if voucher.exhausted() {
                return Err(Error::VoucherExhausted(code.to_string()));
            }

            let Versioned {
                value: mut holder,
                version: holder_version,
            } = self
                .store
                .get::<Account>(Keyspace::Accounts, account.key())?
                .ok_or_else(|| Error::AccountNotFound(account.to_string()))?;

            voucher.used += 1;
            holder.balance = holder
                .balance
                .checked_add(voucher.amount)
                .ok_or(Error::InvalidAmount)?;
            let amount = voucher.amount;

            let batch = Batch::new()
                .check(Keyspace::Vouchers, code.as_bytes().to_vec(), voucher_version)
                .check(Keyspace::Accounts, account.key().to_vec(), holder_version)
                .put(Keyspace::Vouchers, code.as_bytes().to_vec(), &voucher)?
                .put(Keyspace::Accounts, account.key().to_vec(), &holder)?;
            Ok((batch, amount))
        })
        .await?;

        tracing::debug!(account = %account, code, amount, "Voucher redeemed");
        Ok(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::LedgerCore;
    use crate::types::Credential;
    use record_store::StoreConfig;
    use tempfile::TempDir;

    fn test_cores() -> (LedgerCore, VoucherCore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = StoreConfig {
            data_dir: temp_dir.path().to_path_buf(),
            ..Default::default()
        };
        let store = Arc::new(Store::open(&config).unwrap());
        let metrics = Metrics::new().unwrap();
        let ledger = LedgerCore::new(store.clone(), RetryConfig::default(), metrics.clone());
        let vouchers = VoucherCore::new(store, RetryConfig::default(), metrics);
        (ledger, vouchers, temp_dir)
    }

    fn credential() -> Credential {
        Credential {
            hash: "deadbeef".to_string(),
            salt: "0123".to_string(),
        }
    }

    #[tokio::test]
    async fn test_redeem_credits_balance_and_counts_use() {
        let (ledger, vouchers, _temp) = test_cores();
        let alice = AccountId::new("alice");
        ledger.create_account(&alice, credential()).await.unwrap();

        vouchers.create_voucher("WELCOME10", 1000, 1).await.unwrap();

        let credited = vouchers.redeem(&alice, "WELCOME10").await.unwrap();
        assert_eq!(credited, 1000);
        assert_eq!(ledger.get_account(&alice).await.unwrap().balance, 1000);
    }

    #[tokio::test]
    async fn test_exhausted_voucher_rejected() {
        let (ledger, vouchers, _temp) = test_cores();
        let alice = AccountId::new("alice");
        let bob = AccountId::new("bob");
        ledger.create_account(&alice, credential()).await.unwrap();
        ledger.create_account(&bob, credential()).await.unwrap();

        vouchers.create_voucher("WELCOME10", 1000, 1).await.unwrap();

        vouchers.redeem(&alice, "WELCOME10").await.unwrap();
        let err = vouchers.redeem(&bob, "WELCOME10").await.unwrap_err();
        assert!(matches!(err, Error::VoucherExhausted(_)));

        // Loser's balance untouched
        assert_eq!(ledger.get_account(&bob).await.unwrap().balance, 0);
    }

    #[tokio::test]
    async fn test_redeem_preconditions() {
        let (ledger, vouchers, _temp) = test_cores();
        let alice = AccountId::new("alice");
        ledger.create_account(&alice, credential()).await.unwrap();

        let err = vouchers.redeem(&alice, "NOPE").await.unwrap_err();
        assert!(matches!(err, Error::VoucherNotFound(_)));

        vouchers.create_voucher("CODE", 500, 2).await.unwrap();
        let err = vouchers
            .redeem(&AccountId::new("ghost"), "CODE")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AccountNotFound(_)));
    }

    #[tokio::test]
    async fn test_create_voucher_rejects_zero() {
        let (_ledger, vouchers, _temp) = test_cores();

        let err = vouchers.create_voucher("Z", 0, 1).await.unwrap_err();
        assert!(matches!(err, Error::InvalidAmount));
        let err = vouchers.create_voucher("Z", 100, 0).await.unwrap_err();
        assert!(matches!(err, Error::InvalidAmount));
    }

    #[tokio::test]
    async fn test_multi_use_voucher_honors_limit() {
        let (ledger, vouchers, _temp) = test_cores();
        let alice = AccountId::new("alice");
        ledger.create_account(&alice, credential()).await.unwrap();

        vouchers.create_voucher("TRIPLE", 100, 3).await.unwrap();

        for _ in 0..3 {
            vouchers.redeem(&alice, "TRIPLE").await.unwrap();
        }
        let err = vouchers.redeem(&alice, "TRIPLE").await.unwrap_err();
        assert!(matches!(err, Error::VoucherExhausted(_)));
        assert_eq!(ledger.get_account(&alice).await.unwrap().balance, 300);
    }
}
