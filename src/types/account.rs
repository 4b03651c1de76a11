//! Account-related types for the ledger engine
//!
//! This module defines the Account row, the `(balance, limit)` pair returned
//! by every successful mutation, and the seed record used to create accounts.

use serde::Deserialize;

/// Account identifier
///
/// Matches the `INTEGER` primary key of the PostgreSQL accounts table.
pub type AccountId = i32;

/// Account state as persisted by a ledger store
///
/// `balance` may go negative but never below `-balance_limit`. The limit is
/// fixed when the account is created; nothing in the engine mutates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Stable account identifier
    pub id: AccountId,

    /// Display name given when the account was seeded
    pub name: String,

    /// Current balance (negative when overdrawn)
    pub balance: i64,

    /// Maximum amount the balance may go below zero
    pub balance_limit: i64,
}

impl Account {
    /// The `(balance, limit)` view of this account
    pub fn balance(&self) -> AccountBalance {
        AccountBalance {
            balance: self.balance,
            balance_limit: self.balance_limit,
        }
    }
}

/// Post-commit `(balance, balance_limit)` pair
///
/// Returned by the balance mutator on success and read by the statement
/// reader. The façade turns it into its response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountBalance {
    /// Current balance
    pub balance: i64,

    /// Overdraft limit
    pub balance_limit: i64,
}

impl AccountBalance {
    /// Create a new balance pair
    pub fn new(balance: i64, balance_limit: i64) -> Self {
        Self {
            balance,
            balance_limit,
        }
    }

    /// Lowest balance the account may hold
    pub fn floor(&self) -> i64 {
        -self.balance_limit
    }

    /// Whether `candidate` respects the overdraft limit of this account
    pub fn permits(&self, candidate: i64) -> bool {
        candidate >= self.floor()
    }
}

/// Account creation record
///
/// Read from the seed CSV (`id,name,limit,balance`) or taken from
/// [`default_seeds`]. The `balance` column is optional and defaults to zero.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccountSeed {
    pub id: AccountId,
    pub name: String,
    #[serde(rename = "limit")]
    pub balance_limit: i64,
    #[serde(default)]
    pub balance: i64,
}

impl AccountSeed {
    pub fn new(id: AccountId, name: &str, balance_limit: i64) -> Self {
        Self {
            id,
            name: name.to_string(),
            balance_limit,
            balance: 0,
        }
    }

    /// Materialize the seed into an account row
    pub fn to_account(&self) -> Account {
        Account {
            id: self.id,
            name: self.name.clone(),
            balance: self.balance,
            balance_limit: self.balance_limit,
        }
    }
}

/// The five accounts the ledger starts with when no seed file is given
pub fn default_seeds() -> Vec<AccountSeed> {
    vec![
        AccountSeed::new(1, "o barato sai caro", 100_000),
        AccountSeed::new(2, "zan corp ltda", 80_000),
        AccountSeed::new(3, "les cruders", 1_000_000),
        AccountSeed::new(4, "padaria joia de cocaia", 10_000_000),
        AccountSeed::new(5, "kid mais", 500_000),
    ]
}
