use crate::core::{DatabaseSettings, EngineConfig};
use crate::io::read_account_seeds;
use crate::strategy::{BatchConfig, RunOptions, StoreConfig};
use crate::types::{default_seeds, LedgerError};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Replay credit/debit requests against an account ledger
#[derive(Parser, Debug)]
#[command(name = "ledger-engine")]
#[command(about = "Replay credit/debit requests against an account ledger", long_about = None)]
pub struct CliArgs {
    /// Input CSV file path containing transaction requests
    #[arg(value_name = "INPUT", help = "Path to the input CSV file (account,kind,amount,description)")]
    pub input_file: PathBuf,

    /// Processing strategy
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "concurrent",
        help = "Processing strategy: 'sequential' or 'concurrent'"
    )]
    pub strategy: StrategyType,

    /// Number of requests per batch (concurrent mode only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of requests per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Runtime worker threads (concurrent mode only)
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Number of runtime worker threads (default: CPU cores)"
    )]
    pub max_concurrent: Option<usize>,

    /// Ledger store backend
    #[arg(long = "store", value_name = "STORE", default_value = "memory")]
    pub store: StoreType,

    /// PostgreSQL connection URL (overrides DATABASE_URL and DB_* variables)
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Seed accounts CSV with columns id,name,limit[,balance]
    #[arg(long = "accounts", value_name = "FILE", conflicts_with = "skip_seed")]
    pub accounts_file: Option<PathBuf>,

    /// Do not create any accounts before replaying
    #[arg(long = "skip-seed")]
    pub skip_seed: bool,

    /// Give up on an account lock after this many milliseconds (0 waits forever)
    #[arg(long = "lock-timeout-ms", value_name = "MS")]
    pub lock_timeout_ms: Option<u64>,

    /// What to print once the run is over
    #[arg(long = "output", value_name = "OUTPUT", default_value = "accounts")]
    pub output: OutputFormat,

    /// Log filter, e.g. 'debug' or 'rust_ledger_engine=trace' (default: RUST_LOG, then 'info')
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long = "log-json")]
    pub log_json: bool,
}

/// Available processing strategies
#[derive(Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Sequential,
    Concurrent,
}

/// Available ledger stores
#[derive(Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum StoreType {
    Memory,
    Postgres,
}

/// Available result formats
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// account,balance,limit
    Accounts,
    /// Balance plus the ten most recent transactions of every account
    Statements,
}

impl CliArgs {
    /// Create a BatchConfig from CLI arguments, falling back to defaults
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_some() || self.max_concurrent.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.max_concurrent.unwrap_or(default.max_concurrent),
            )
        } else {
            BatchConfig::default()
        }
    }

    /// Connection settings: `--database-url`, else the environment
    pub fn database_settings(&self) -> DatabaseSettings {
        match &self.database_url {
            Some(url) => DatabaseSettings::new(url),
            None => DatabaseSettings::from_env(),
        }
    }

    /// Build the run options, loading the seed file if one was given
    pub fn to_run_options(&self) -> Result<RunOptions, LedgerError> {
        let store = match self.store {
            StoreType::Memory => StoreConfig::Memory,
            StoreType::Postgres => StoreConfig::Postgres(self.database_settings()),
        };

        let seeds = match (&self.accounts_file, self.skip_seed) {
            (_, true) => None,
            (Some(path), false) => Some(read_account_seeds(path)?),
            (None, false) => Some(default_seeds()),
        };

        Ok(RunOptions {
            store,
            seeds,
            output: self.output,
            engine: EngineConfig::with_lock_timeout_ms(self.lock_timeout_ms),
        })
    }
}
