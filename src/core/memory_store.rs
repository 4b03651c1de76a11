//! In-memory ledger store
//!
//! This module provides the `InMemoryLedgerStore`, the default [`LedgerStore`]
//! implementation. Accounts live in a `DashMap`, each behind its own
//! `tokio::sync::RwLock`, so that:
//! - a unit of work holds the account's write lock from
//!   `lock_account_for_update` until commit or rollback
//! - statement reads take the shared read lock and therefore see either the
//!   state before or after a unit of work, never half of it
//! - accounts never contend with each other; the map's shard lock is only
//!   held long enough to clone the account's `Arc`
//!
//! # Transaction History
//!
//! Each account keeps its transactions in a vector sorted by `created_at`,
//! with equal timestamps kept in insertion order. Reading the vector backwards
//! yields the "most recent first" order the statement needs.
//!
//! Writes made through a unit of work are staged and only applied at commit,
//! so dropping the unit of work (or a cancelled future holding it) discards
//! them.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

use super::traits::{validate_seed, LedgerStore, UnitOfWork};
use crate::types::{
    Account, AccountBalance, AccountId, AccountSeed, LedgerEntry, LedgerError, Transaction,
};

/// Account row plus its transaction history
#[derive(Debug)]
struct AccountRecord {
    name: String,
    balance: i64,
    balance_limit: i64,
    history: Vec<Transaction>,
}

impl AccountRecord {
    fn from_seed(seed: &AccountSeed) -> Self {
        Self {
            name: seed.name.clone(),
            balance: seed.balance,
            balance_limit: seed.balance_limit,
            history: Vec::new(),
        }
    }

    fn balance(&self) -> AccountBalance {
        AccountBalance::new(self.balance, self.balance_limit)
    }

    fn insert_transaction(&mut self, transaction: Transaction) {
        // Upper bound: a timestamp tie lands after the existing rows
        let position = self
            .history
            .partition_point(|existing| existing.created_at <= transaction.created_at);
        self.history.insert(position, transaction);
    }

    fn recent(&self, limit: usize) -> Vec<Transaction> {
        self.history.iter().rev().take(limit).cloned().collect()
    }
}

type AccountSlot = Arc<RwLock<AccountRecord>>;

/// Thread-safe, in-process ledger store
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
#[derive(Debug)]
pub struct InMemoryLedgerStore {
    accounts: DashMap<AccountId, AccountSlot>,
    next_transaction_id: Arc<AtomicI64>,
}

impl InMemoryLedgerStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
            next_transaction_id: Arc::new(AtomicI64::new(1)),
        }
    }

    fn slot(&self, account_id: AccountId) -> Result<AccountSlot, LedgerError> {
        self.accounts
            .get(&account_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| LedgerError::account_not_found(account_id))
    }
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerStore for InMemoryLedgerStore {
    type Unit = InMemoryUnitOfWork;

    async fn lock_account_for_update(
        &self,
        account_id: AccountId,
    ) -> Result<InMemoryUnitOfWork, LedgerError> {
        let slot = self.slot(account_id)?;
        let guard = slot.write_owned().await;

        Ok(InMemoryUnitOfWork {
            account_id,
            guard,
            staged_balance: None,
            staged_entries: Vec::new(),
            next_transaction_id: Arc::clone(&self.next_transaction_id),
        })
    }

    async fn recent_transactions(
        &self,
        account_id: AccountId,
        limit: usize,
    ) -> Result<Vec<Transaction>, LedgerError> {
        let slot = self.slot(account_id)?;
        let record = slot.read().await;
        Ok(record.recent(limit))
    }

    async fn statement_snapshot(
        &self,
        account_id: AccountId,
        limit: usize,
    ) -> Result<(AccountBalance, Vec<Transaction>), LedgerError> {
        let slot = self.slot(account_id)?;
        let record = slot.read().await;
        Ok((record.balance(), record.recent(limit)))
    }

    async fn seed_account(&self, seed: &AccountSeed) -> Result<(), LedgerError> {
        validate_seed(seed)?;

        let mut inserted = false;
        self.accounts.entry(seed.id).or_insert_with(|| {
            inserted = true;
            Arc::new(RwLock::new(AccountRecord::from_seed(seed)))
        });

        if !inserted {
            return Err(LedgerError::duplicate_account(seed.id));
        }
        tracing::debug!(account = seed.id, limit = seed.balance_limit, "Account seeded");
        Ok(())
    }

    async fn accounts(&self) -> Result<Vec<Account>, LedgerError> {
        // Clone the slots first so no map guard is held across an await
        let slots: Vec<(AccountId, AccountSlot)> = self
            .accounts
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();

        let mut accounts = Vec::with_capacity(slots.len());
        for (id, slot) in slots {
            let record = slot.read().await;
            accounts.push(Account {
                id,
                name: record.name.clone(),
                balance: record.balance,
                balance_limit: record.balance_limit,
            });
        }
        accounts.sort_by_key(|account| account.id);

        Ok(accounts)
    }
}

/// Write-locked account with staged changes
///
/// Holds the account's write lock for its whole life. Nothing is visible to
/// other callers until [`UnitOfWork::commit`].
#[derive(Debug)]
pub struct InMemoryUnitOfWork {
    account_id: AccountId,
    guard: OwnedRwLockWriteGuard<AccountRecord>,
    staged_balance: Option<i64>,
    staged_entries: Vec<(LedgerEntry, DateTime<Utc>)>,
    next_transaction_id: Arc<AtomicI64>,
}

impl UnitOfWork for InMemoryUnitOfWork {
    fn account_id(&self) -> AccountId {
        self.account_id
    }

    fn current(&self) -> AccountBalance {
        AccountBalance::new(
            self.staged_balance.unwrap_or(self.guard.balance),
            self.guard.balance_limit,
        )
    }

    async fn write_balance(&mut self, new_balance: i64) -> Result<AccountBalance, LedgerError> {
        self.staged_balance = Some(new_balance);
        Ok(self.current())
    }

    async fn append_transaction(
        &mut self,
        entry: &LedgerEntry,
        created_at: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        self.staged_entries.push((entry.clone(), created_at));
        Ok(())
    }

    async fn commit(mut self) -> Result<(), LedgerError> {
        if let Some(balance) = self.staged_balance.take() {
            self.guard.balance = balance;
        }

        for (entry, created_at) in std::mem::take(&mut self.staged_entries) {
            let id = self.next_transaction_id.fetch_add(1, Ordering::SeqCst);
            self.guard.insert_transaction(Transaction {
                id,
                account_id: self.account_id,
                amount: entry.amount.get(),
                kind: entry.kind,
                description: entry.description.as_str().to_string(),
                created_at,
            });
        }

        Ok(())
    }

    async fn rollback(self) -> Result<(), LedgerError> {
        tracing::trace!(account = self.account_id, "Unit of work discarded");
        Ok(())
    }
}
