//! The credit/debit write path
//!
//! `BalanceMutator` is the only component that changes balances. Each call
//! runs as one unit of work against a [`LedgerStore`]:
//!
//! ```text
//! validate request            (no lock, no side effects)
//!   └── lock_account_for_update   ── NotFound / LockTimeout
//!         ├── candidate = balance ± amount
//!         ├── debit below -limit?  ── rollback, InsufficientFunds
//!         ├── write_balance(candidate)
//!         ├── append_transaction(entry, now)
//!         └── commit
//! ```
//!
//! # Concurrency
//!
//! The account lock is held from the read in `lock_account_for_update` until
//! commit or rollback, so a second caller on the same account always reads
//! the first caller's committed balance. Two debits that each fit the limit
//! in isolation can therefore never jointly breach it. Callers on different
//! accounts never wait on each other.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};

use super::traits::{LedgerStore, UnitOfWork};
use crate::types::{AccountBalance, AccountId, LedgerEntry, LedgerError, TransactionKind, TransactionRequest};

/// Atomic credit/debit operation over a shared store
#[derive(Debug)]
pub struct BalanceMutator<S> {
    store: Arc<S>,

    /// Deadline for acquiring the account lock (`None` waits indefinitely)
    lock_timeout: Option<Duration>,
}

impl<S> Clone for BalanceMutator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            lock_timeout: self.lock_timeout,
        }
    }
}

impl<S: LedgerStore> BalanceMutator<S> {
    /// Create a mutator over `store`
    ///
    /// # Arguments
    ///
    /// * `store` - Shared ledger store
    /// * `lock_timeout` - Optional bound on the wait for the account lock
    pub fn new(store: Arc<S>, lock_timeout: Option<Duration>) -> Self {
        Self {
            store,
            lock_timeout,
        }
    }

    /// Apply a credit or debit to an account
    ///
    /// # Returns
    ///
    /// * `Ok(AccountBalance)` - The committed `(balance, balance_limit)`
    /// * `Err(LedgerError::InvalidTransactionType)` - Unknown kind code; no lock taken
    /// * `Err(LedgerError::InvalidAmount)` / `Err(LedgerError::InvalidDescription)` -
    ///   Malformed request; no lock taken
    /// * `Err(LedgerError::AccountNotFound)` - No such account; nothing written
    /// * `Err(LedgerError::InsufficientFunds)` - Debit would breach the limit;
    ///   account unchanged
    /// * `Err(LedgerError::LockTimeout)` - Deadline expired while waiting; nothing written
    /// * `Err(LedgerError::StoreUnavailable)` - Persistence failure; rolled back
    pub async fn apply_transaction(
        &self,
        request: &TransactionRequest,
    ) -> Result<AccountBalance, LedgerError> {
        let entry = request.validate()?;
        let mut unit = self.lock(entry.account_id).await?;

        let current = unit.current();
        let candidate = match entry.apply_to(current.balance) {
            Some(candidate) => candidate,
            None => {
                let err = LedgerError::arithmetic_overflow(operation(&entry), entry.account_id);
                return Err(abort(unit, err).await);
            }
        };

        if entry.kind == TransactionKind::Debit && !current.permits(candidate) {
            let err = LedgerError::insufficient_funds(
                entry.account_id,
                current.balance,
                current.balance_limit,
                entry.amount.get(),
            );
            return Err(abort(unit, err).await);
        }

        let written = match write(&mut unit, &entry, candidate).await {
            Ok(written) => written,
            Err(err) => return Err(abort(unit, err).await),
        };
        unit.commit().await?;

        debug!(
            account = entry.account_id,
            kind = %entry.kind,
            amount = entry.amount.get(),
            balance = written.balance,
            "Transaction committed"
        );
        Ok(written)
    }

    async fn lock(&self, account_id: AccountId) -> Result<S::Unit, LedgerError> {
        let acquire = self.store.lock_account_for_update(account_id);
        match self.lock_timeout {
            // Dropping the pending acquire on expiry leaves no lock behind
            Some(timeout) => tokio::time::timeout(timeout, acquire)
                .await
                .map_err(|_| LedgerError::lock_timeout(account_id, timeout.as_millis() as u64))?,
            None => acquire.await,
        }
    }
}

fn operation(entry: &LedgerEntry) -> &'static str {
    match entry.kind {
        TransactionKind::Credit => "credit",
        TransactionKind::Debit => "debit",
    }
}

async fn write<U: UnitOfWork>(
    unit: &mut U,
    entry: &LedgerEntry,
    new_balance: i64,
) -> Result<AccountBalance, LedgerError> {
    let written = unit.write_balance(new_balance).await?;
    unit.append_transaction(entry, Utc::now()).await?;
    Ok(written)
}

/// Roll back `unit` and hand back the error that caused it
async fn abort<U: UnitOfWork>(unit: U, err: LedgerError) -> LedgerError {
    let account = unit.account_id();
    if let Err(rollback_err) = unit.rollback().await {
        // The store discards the unit of work on drop anyway
        warn!(account, error = %rollback_err, "Rollback failed");
    }
    err
}
