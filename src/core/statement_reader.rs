//! The read path: balance plus recent activity
//!
//! A statement never takes the exclusive account hold. It reads through
//! [`LedgerStore::statement_snapshot`], which observes either the state
//! before or after any concurrent unit of work, never a mix.

use std::sync::Arc;

use chrono::Utc;

use super::traits::LedgerStore;
use crate::types::{AccountId, LedgerError, Statement};

/// Number of transactions included in a statement
pub const STATEMENT_SIZE: usize = 10;

/// Produces point-in-time [`Statement`]s
#[derive(Debug)]
pub struct StatementReader<S> {
    store: Arc<S>,
}

impl<S> Clone for StatementReader<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: LedgerStore> StatementReader<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Balance, limit and the [`STATEMENT_SIZE`] most recent transactions
    ///
    /// # Returns
    ///
    /// * `Ok(Statement)` - `recent_transactions` is newest first and may be empty
    /// * `Err(LedgerError::AccountNotFound)` - No such account
    pub async fn get_statement(&self, account_id: AccountId) -> Result<Statement, LedgerError> {
        let (balance, recent_transactions) = self
            .store
            .statement_snapshot(account_id, STATEMENT_SIZE)
            .await?;

        Ok(Statement {
            account_id,
            balance,
            as_of: Utc::now(),
            recent_transactions,
        })
    }
}
