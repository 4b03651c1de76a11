//! Rust Ledger Engine Library
//! # Overview
//!
//! An account ledger: every account has a balance and an overdraft limit,
//! credits and debits are applied atomically, and a statement shows the
//! balance together with the most recent transactions.
//!
//! # Architecture
//!
//! - [`types`] - Core data types (Account, TransactionRequest, Statement, LedgerError)
//! - [`core`] - The ledger transaction engine:
//!   - [`core::traits`] - The `LedgerStore` / `UnitOfWork` seam
//!   - [`core::memory_store`] / [`core::postgres_store`] - Store implementations
//!   - [`core::balance_mutator`] - Atomic credit/debit under a per-account lock
//!   - [`core::statement_reader`] - Balance plus the ten most recent transactions
//!   - [`core::engine`] - `LedgerEngine`, the handle the façade talks to
//! - [`io`] - CSV request reading and result writing
//! - [`strategy`] - Sequential and concurrent replay pipelines
//! - [`cli`] / [`logging`] - Command-line façade
//!
//! # Invariants
//!
//! - `balance >= -limit` after every committed mutation, and never visibly
//!   violated in between
//! - A failed call leaves the account and its history untouched
//! - Requests on the same account are serialised; different accounts never
//!   wait on each other

pub mod cli;
pub mod core;
pub mod io;
pub mod logging;
pub mod strategy;
pub mod types;

pub use crate::core::{EngineConfig, InMemoryLedgerStore, LedgerEngine, LedgerStore, PostgresLedgerStore};
pub use crate::io::{write_accounts_csv, write_statements_csv};
pub use crate::types::{
    Account, AccountBalance, AccountId, AccountSeed, LedgerError, Statement, Transaction,
    TransactionKind, TransactionRequest,
};
