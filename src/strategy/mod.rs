//! Processing strategy module
//!
//! This module defines the Strategy pattern for complete replay pipelines:
//! open the store, seed it, stream the request CSV through the ledger
//! engine, and write the final account table or statements. Two
//! implementations can be selected at runtime:
//!
//! - `sequential` - one request at a time, in file order
//! - `concurrent` - batches fanned out with one task per account
//!
//! Both share the store setup and output handling in [`pipeline`].

use std::io::Write;
use std::path::Path;

use crate::cli::{OutputFormat, StrategyType};
use crate::core::{DatabaseSettings, EngineConfig};
use crate::types::{default_seeds, AccountSeed, LedgerError};

pub mod concurrent;
mod pipeline;
pub mod sequential;

pub use concurrent::{BatchConfig, ConcurrentProcessingStrategy};
pub use pipeline::RunSummary;
pub use sequential::SequentialProcessingStrategy;

/// Which ledger store a run uses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    /// Fresh in-process store, discarded when the run ends
    Memory,

    /// PostgreSQL database; the schema is created if missing
    Postgres(DatabaseSettings),
}

/// Everything a run needs besides the input file
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub store: StoreConfig,

    /// Accounts to create before replaying; `None` skips seeding
    pub seeds: Option<Vec<AccountSeed>>,

    pub output: OutputFormat,

    pub engine: EngineConfig,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            store: StoreConfig::Memory,
            seeds: Some(default_seeds()),
            output: OutputFormat::Accounts,
            engine: EngineConfig::default(),
        }
    }
}

/// Processing strategy trait for complete replay pipelines
pub trait ProcessingStrategy: Send + Sync {
    /// Replay the requests in `input_path` and write the result to `output`
    ///
    /// # Returns
    ///
    /// * `Ok(RunSummary)` - Counts of applied, rejected, and skipped rows
    /// * `Err(LedgerError)` - A fatal error: missing input, unreachable store,
    ///   failed seeding, or failed output
    ///
    /// Rejected requests and malformed rows are logged and counted; they do
    /// not stop the run.
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<RunSummary, LedgerError>;
}

/// Create a processing strategy
///
/// # Arguments
///
/// * `strategy_type` - Sequential or concurrent
/// * `config` - Batch configuration (ignored by the sequential strategy)
/// * `options` - Store, seeding, output, and engine settings
pub fn create_strategy(
    strategy_type: StrategyType,
    config: Option<BatchConfig>,
    options: RunOptions,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sequential => Box::new(SequentialProcessingStrategy::new(options)),
        StrategyType::Concurrent => Box::new(ConcurrentProcessingStrategy::new(
            config.unwrap_or_default(),
            options,
        )),
    }
}
