//! Ledger core: balance mutations
//!
//! Top-up and transfer are optimistic read-modify-write transactions.
//! Transfer stages the debit and the credit in one batch conditioned on
//! both accounts' read versions, so partial transfers cannot commit.

use crate::{
    config::RetryConfig,
    error::{Error, Result},
    metrics::Metrics,
    txn,
    types::{Account, AccountId, AccountSummary, Credential},
};
use record_store::{Batch, Keyspace, Store, Versioned};
use std::sync::Arc;

/// Balance mutation engine
pub struct LedgerCore {
    store: Arc<Store>,
    retry: RetryConfig,
    metrics: Metrics,
}

impl LedgerCore {
    /// Create new ledger core
    pub fn new(store: Arc<Store>, retry: RetryConfig, metrics: Metrics) -> Self {
        Self {
            store,
            retry,
            metrics,
        }
    }

    /// Create an account with zero balance.
    ///
    /// The credential material comes pre-hashed from the authentication
    /// shell; the cores never inspect it.
    pub async fn create_account(&self, id: &AccountId, credential: Credential) -> Result<()> {
        txn::run(&self.store, &self.retry, &self.metrics, "create_account", || {
            if self
                .store
                .get::<Account>(Keyspace::Accounts, id.key())?
                .is_some()
            {
                return Err(Error::AccountExists(id.to_string()));
            }

            let account = Account {
                id: id.clone(),
                balance: 0,
                credential: credential.clone(),
            };
            let batch = Batch::new()
                .check_absent(Keyspace::Accounts, id.key().to_vec())
                .put(Keyspace::Accounts, id.key().to_vec(), &account)?;
            Ok((batch, ()))
        })
        .await?;

        tracing::info!(account = %id, "Account created");
        Ok(())
    }

    /// Replace an account's credential material.
    ///
    /// Version-checked like every other mutation so a concurrent balance
    /// change is never overwritten by a stale snapshot.
    pub async fn update_credential(&self, id: &AccountId, credential: Credential) -> Result<()> {
        txn::run(
            &self.store,
            &self.retry,
            &self.metrics,
            "update_credential",
            || {
                let Versioned {
                    value: mut account,
                    version,
                } = self
                    .store
                    .get::<Account>(Keyspace::Accounts, id.key())?
                    .ok_or_else(|| Error::AccountNotFound(id.to_string()))?;

                account.credential = credential.clone();

                let batch = Batch::new()
                    .check(Keyspace::Accounts, id.key().to_vec(), version)
                    .put(Keyspace::Accounts, id.key().to_vec(), &account)?;
                Ok((batch, ()))
            },
        )
        .await?;

        tracing::info!(account = %id, "Credential updated");
        Ok(())
    }

    /// Look up one account
    pub async fn get_account(&self, id: &AccountId) -> Result<Account> {
        let account = self
            .store
            .get::<Account>(Keyspace::Accounts, id.key())?
            .ok_or_else(|| Error::AccountNotFound(id.to_string()))?;
        Ok(account.value)
    }

    /// List all accounts as (id, balance) summaries.
    /// Credential material is deliberately not exposed.
    pub async fn list_accounts(&self) -> Result<Vec<AccountSummary>> {
        let records: Vec<(Vec<u8>, Account)> = self.store.scan_prefix(Keyspace::Accounts, b"")?;
        Ok(records
            .into_iter()
            .map(|(_, account)| AccountSummary {
                id: account.id,
                balance: account.balance,
            })
            .collect())
    }

    /// Credit `amount` to an account; returns the new balance.
    ///
    /// Semantically the delta applies to whatever the balance is at the
    /// instant the conditional commit succeeds: a conflicting concurrent
    /// writer forces a fresh read, never a lost update.
    pub async fn top_up(&self, id: &AccountId, amount: u64) -> Result<u64> {
        if amount == 0 {
            return Err(Error::InvalidAmount);
        }

        let new_balance = txn::run(&self.store, &self.retry, &self.metrics, "top_up", || {
            let Versioned {
                value: mut account,
                version,
            } = self
                .store
                .get::<Account>(Keyspace::Accounts, id.key())?
                .ok_or_else(|| Error::AccountNotFound(id.to_string()))?;

            account.balance = account
                .balance
                .checked_add(amount)
                .ok_or(Error::InvalidAmount)?;
            let new_balance = account.balance;

            let batch = Batch::new()
                .check(Keyspace::Accounts, id.key().to_vec(), version)
                .put(Keyspace::Accounts, id.key().to_vec(), &account)?;
            Ok((batch, new_balance))
        })
        .await?;

        tracing::debug!(account = %id, amount, new_balance, "Top-up committed");
        Ok(new_balance)
    }

    /// Move `amount` from `sender` to `receiver`; returns the sender's new
    /// balance. Debit and credit commit atomically against both accounts'
    /// read versions: both apply or neither does.
    pub async fn transfer(
        &self,
        sender: &AccountId,
        receiver: &AccountId,
        amount: u64,
    ) -> Result<u64> {
        if amount == 0 {
            return Err(Error::InvalidAmount);
        }
        if sender == receiver {
            return Err(Error::SelfTransfer);
        }

        let sender_balance =
            txn::run(&self.store, &self.retry, &self.metrics, "transfer", || {
                let Versioned {
                    value: mut from,
                    version: from_version,
                } = self
                    .store
                    .get::<Account>(Keyspace::Accounts, sender.key())?
                    .ok_or_else(|| Error::AccountNotFound(sender.to_string()))?;

                let Versioned {
                    value: mut to,
                    version: to_version,
                } = self
                    .store
                    .get::<Account>(Keyspace::Accounts, receiver.key())?
                    .ok_or_else(|| Error::AccountNotFound(receiver.to_string()))?;

                if from.balance < amount {
                    return Err(Error::InsufficientFunds {
                        needed: amount,
                        available: from.balance,
                    });
                }

                from.balance -= amount;
                to.balance = to.balance.checked_add(amount).ok_or(Error::InvalidAmount)?;
                let sender_balance = from.balance;

                let batch = Batch::new()
                    .check(Keyspace::Accounts, sender.key().to_vec(), from_version)
                    .check(Keyspace::Accounts, receiver.key().to_vec(), to_version)
                    .put(Keyspace::Accounts, sender.key().to_vec(), &from)?
                    .put(Keyspace::Accounts, receiver.key().to_vec(), &to)?;
                Ok((batch, sender_balance))
            })
            .await?;

        tracing::debug!(
            sender = %sender,
            receiver = %receiver,
            amount,
            "Transfer committed"
        );
        Ok(sender_balance)
    }
}
