//! Concurrent batch processing strategy
//!
//! ```text
//! ConcurrentProcessingStrategy
//!     ├── BatchConfig (batch_size, max_concurrent)
//!     ├── AsyncReader (batch CSV reading)
//!     └── BatchProcessor (account partitioning, one task per account)
//!         └── LedgerEngine (BalanceMutator + StatementReader over Arc<S>)
//! ```
//!
//! Batches are processed one after another so that an account whose
//! requests span several batches still sees them in file order. Within a
//! batch, accounts proceed in parallel on a multi-threaded runtime.

use std::io::Write;
use std::path::Path;

use tracing::warn;

use super::pipeline::{run_pipeline, Pipeline, RunSummary};
use super::{ProcessingStrategy, RunOptions};
use crate::core::{BatchProcessor, LedgerEngine, LedgerStore};
use crate::io::AsyncReader;
use crate::types::LedgerError;

/// Configuration for batch processing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchConfig {
    /// Number of requests per batch
    pub batch_size: usize,

    /// Runtime worker threads
    pub max_concurrent: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a BatchConfig, replacing zero values with the defaults
    pub fn new(batch_size: usize, max_concurrent: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            warn!(
                batch_size,
                default = default.batch_size,
                "Invalid batch size, using default"
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent = if max_concurrent == 0 {
            warn!(
                max_concurrent,
                default = default.max_concurrent,
                "Invalid worker count, using default"
            );
            default.max_concurrent
        } else {
            max_concurrent
        };

        Self {
            batch_size,
            max_concurrent,
        }
    }
}

/// Concurrent batch processing strategy
#[derive(Debug, Clone)]
pub struct ConcurrentProcessingStrategy {
    config: BatchConfig,
    options: RunOptions,
}

impl ConcurrentProcessingStrategy {
    pub fn new(config: BatchConfig, options: RunOptions) -> Self {
        Self { config, options }
    }
}

impl Pipeline for ConcurrentProcessingStrategy {
    async fn drive<S: LedgerStore>(
        &self,
        engine: &LedgerEngine<S>,
        input_path: &Path,
    ) -> Result<RunSummary, LedgerError> {
        let mut reader = AsyncReader::open(input_path).await?;
        let processor = BatchProcessor::new(engine.clone());
        let mut summary = RunSummary::default();

        loop {
            let batch = reader.read_batch(self.config.batch_size).await?;
            if batch.is_empty() {
                break;
            }

            // Wait for the whole batch before reading the next one
            for outcome in processor.process_batch(batch).await {
                summary.record(&outcome);
            }
        }

        summary.skipped = reader.skipped();
        Ok(summary)
    }
}

impl ProcessingStrategy for ConcurrentProcessingStrategy {
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<RunSummary, LedgerError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.max_concurrent)
            .enable_all()
            .build()
            .map_err(|e| LedgerError::IoError {
                message: format!("Failed to create tokio runtime: {}", e),
            })?;

        runtime.block_on(run_pipeline(self, &self.options, input_path, output))
    }
}
