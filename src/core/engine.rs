//! Ledger engine
//!
//! This module provides the `LedgerEngine`, the entry point the request
//! façade talks to. It wires a shared [`LedgerStore`] into a
//! [`BalanceMutator`] (write path) and a [`StatementReader`] (read path) and
//! adds the account-table plumbing the driver needs: seeding and listing.
//!
//! # Architecture
//!
//! ```text
//! LedgerEngine<S>
//!     ├── Arc<S: LedgerStore>
//!     ├── BalanceMutator<S>   (apply_transaction)
//!     └── StatementReader<S>  (get_statement)
//! ```
//!
//! The engine is cloneable; clones share the same store.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use super::balance_mutator::BalanceMutator;
use super::statement_reader::StatementReader;
use super::traits::LedgerStore;
use crate::types::{
    Account, AccountBalance, AccountId, AccountSeed, LedgerError, Statement, TransactionRequest,
};

/// Engine tuning
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineConfig {
    /// Deadline for acquiring an account lock; `None` waits indefinitely
    pub lock_timeout: Option<Duration>,
}

impl EngineConfig {
    /// Build a config from a lock timeout in milliseconds (`0` disables it)
    pub fn with_lock_timeout_ms(lock_timeout_ms: Option<u64>) -> Self {
        Self {
            lock_timeout: lock_timeout_ms
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis),
        }
    }
}

/// Credit/debit and statement operations over one store
#[derive(Debug)]
pub struct LedgerEngine<S> {
    store: Arc<S>,
    mutator: BalanceMutator<S>,
    reader: StatementReader<S>,
}

impl<S> Clone for LedgerEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            mutator: self.mutator.clone(),
            reader: self.reader.clone(),
        }
    }
}

impl<S: LedgerStore> LedgerEngine<S> {
    pub fn new(store: Arc<S>, config: EngineConfig) -> Self {
        Self {
            mutator: BalanceMutator::new(Arc::clone(&store), config.lock_timeout),
            reader: StatementReader::new(Arc::clone(&store)),
            store,
        }
    }

    /// The underlying store
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// See [`BalanceMutator::apply_transaction`]
    pub async fn apply_transaction(
        &self,
        request: &TransactionRequest,
    ) -> Result<AccountBalance, LedgerError> {
        self.mutator.apply_transaction(request).await
    }

    /// See [`StatementReader::get_statement`]
    pub async fn get_statement(&self, account_id: AccountId) -> Result<Statement, LedgerError> {
        self.reader.get_statement(account_id).await
    }

    /// Create every account in `seeds`, stopping at the first failure
    pub async fn seed_accounts(&self, seeds: &[AccountSeed]) -> Result<(), LedgerError> {
        for seed in seeds {
            self.store.seed_account(seed).await?;
        }
        info!(count = seeds.len(), "Accounts seeded");
        Ok(())
    }

    /// Every account, ordered by id
    pub async fn accounts(&self) -> Result<Vec<Account>, LedgerError> {
        self.store.accounts().await
    }

    /// One statement per account, ordered by account id
    ///
    /// Each statement is its own snapshot; the set as a whole is not.
    pub async fn statements(&self) -> Result<Vec<Statement>, LedgerError> {
        let accounts = self.store.accounts().await?;
        let mut statements = Vec::with_capacity(accounts.len());
        for account in accounts {
            statements.push(self.reader.get_statement(account.id).await?);
        }
        Ok(statements)
    }
}
