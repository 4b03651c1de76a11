//! Core business logic module
//!
//! This module contains the ledger transaction engine:
//! - `traits` - The store seam (`LedgerStore`, `UnitOfWork`)
//! - `memory_store` - In-process store with per-account locks
//! - `postgres_store` - PostgreSQL store using `SELECT ... FOR UPDATE`
//! - `balance_mutator` - The atomic credit/debit write path
//! - `statement_reader` - The balance plus recent activity read path
//! - `engine` - Wiring of the above behind one handle
//! - `batch_processor` - Concurrent, account-partitioned batch application

pub mod balance_mutator;
pub mod batch_processor;
pub mod engine;
pub mod memory_store;
pub mod postgres_store;
pub mod statement_reader;
pub mod traits;

pub use balance_mutator::BalanceMutator;
pub use batch_processor::{BatchProcessor, ProcessingResult};
pub use engine::{EngineConfig, LedgerEngine};
pub use memory_store::{InMemoryLedgerStore, InMemoryUnitOfWork};
pub use postgres_store::{DatabaseSettings, PostgresLedgerStore, PostgresUnitOfWork};
pub use statement_reader::{StatementReader, STATEMENT_SIZE};
pub use traits::{LedgerStore, UnitOfWork};
