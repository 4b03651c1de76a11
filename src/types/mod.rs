//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `account`: Account rows, balance pairs, and seeds
//! - `transaction`: Requests, validated entries, stored transactions, statements
//! - `error`: Error types for the ledger engine

pub mod account;
pub mod error;
pub mod transaction;

pub use account::{default_seeds, Account, AccountBalance, AccountId, AccountSeed};
pub use error::LedgerError;
pub use transaction::{
    Amount, Description, LedgerEntry, Statement, Transaction, TransactionId, TransactionKind,
    TransactionRequest, MAX_DESCRIPTION_LEN,
};
