//! Core traits for ledger persistence
//!
//! This module defines the seam between the engine and its persistence
//! layer, so the in-memory and PostgreSQL stores can be used interchangeably.
//!
//! A [`LedgerStore`] hands out [`UnitOfWork`] values. A unit of work is the
//! exclusive hold on one account: it is created by
//! [`LedgerStore::lock_account_for_update`], stages a balance write and a
//! transaction row, and either commits both or neither. Dropping a unit of
//! work without committing rolls it back and releases the hold.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::types::{Account, AccountBalance, AccountId, AccountSeed, LedgerEntry, LedgerError, Transaction};

/// Durable table of accounts plus the append-only transaction history
///
/// Implementations must guarantee that:
/// - at most one unit of work per account exists at a time; a second caller
///   waits in `lock_account_for_update` until the first commits or aborts
/// - units of work on different accounts never wait on each other
/// - readers observe either the state before or after a unit of work,
///   never a mix of the two
pub trait LedgerStore: Send + Sync + 'static {
    /// Exclusive hold on one account
    type Unit: UnitOfWork;

    /// Acquire the exclusive hold on an account and read its balance/limit
    ///
    /// # Returns
    ///
    /// * `Ok(Self::Unit)` holding the lock; read the locked values with
    ///   [`UnitOfWork::current`]
    /// * `Err(LedgerError::AccountNotFound)` if no such account exists
    /// * `Err(LedgerError::LockTimeout)` / `Err(LedgerError::StoreUnavailable)`
    ///   on transient failures
    fn lock_account_for_update(
        &self,
        account_id: AccountId,
    ) -> impl Future<Output = Result<Self::Unit, LedgerError>> + Send;

    /// Up to `limit` transactions for the account, newest first
    ///
    /// Ordered by `created_at` descending; equal timestamps are ordered by
    /// insertion, newest-inserted first. An existing account with no history
    /// yields an empty vector; a missing account is `AccountNotFound`.
    fn recent_transactions(
        &self,
        account_id: AccountId,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Transaction>, LedgerError>> + Send;

    /// Balance/limit plus recent transactions, read as one snapshot
    ///
    /// Does not take the exclusive hold.
    fn statement_snapshot(
        &self,
        account_id: AccountId,
        limit: usize,
    ) -> impl Future<Output = Result<(AccountBalance, Vec<Transaction>), LedgerError>> + Send;

    /// Create an account from a seed record
    fn seed_account(
        &self,
        seed: &AccountSeed,
    ) -> impl Future<Output = Result<(), LedgerError>> + Send;

    /// Every account, ordered by id
    fn accounts(&self) -> impl Future<Output = Result<Vec<Account>, LedgerError>> + Send;
}

/// Exclusive, all-or-nothing scope over a single account
pub trait UnitOfWork: Send {
    /// The locked account
    fn account_id(&self) -> AccountId;

    /// Balance and limit as read under the lock (including staged writes)
    fn current(&self) -> AccountBalance;

    /// Stage an unconditional balance write
    ///
    /// # Returns
    ///
    /// The post-write `(balance, balance_limit)`
    fn write_balance(
        &mut self,
        new_balance: i64,
    ) -> impl Future<Output = Result<AccountBalance, LedgerError>> + Send;

    /// Stage an immutable transaction row
    fn append_transaction(
        &mut self,
        entry: &LedgerEntry,
        created_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), LedgerError>> + Send;

    /// Make every staged write visible and release the lock
    fn commit(self) -> impl Future<Output = Result<(), LedgerError>> + Send;

    /// Discard every staged write and release the lock
    fn rollback(self) -> impl Future<Output = Result<(), LedgerError>> + Send;
}

/// Seed invariants shared by every store
pub(crate) fn validate_seed(seed: &AccountSeed) -> Result<(), LedgerError> {
    if seed.balance_limit < 0 {
        return Err(LedgerError::invalid_account_seed(
            seed.id,
            "limit must not be negative",
        ));
    }
    if !seed.to_account().balance().permits(seed.balance) {
        return Err(LedgerError::invalid_account_seed(
            seed.id,
            "opening balance is below the overdraft limit",
        ));
    }
    Ok(())
}
