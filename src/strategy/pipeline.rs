//! Store setup, result accounting, and output shared by both strategies

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{RunOptions, StoreConfig};
use crate::cli::OutputFormat;
use crate::core::{InMemoryLedgerStore, LedgerEngine, LedgerStore, PostgresLedgerStore, ProcessingResult};
use crate::io::{write_accounts_csv, write_statements_csv};
use crate::types::LedgerError;

/// Outcome counts of one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Requests committed
    pub applied: usize,

    /// Requests the engine refused
    pub rejected: usize,

    /// Rows that could not be parsed into a request
    pub skipped: usize,
}

impl RunSummary {
    /// Count and log one processed request
    pub(crate) fn record(&mut self, outcome: &ProcessingResult) {
        let request = &outcome.request;
        match &outcome.result {
            Ok(balance) => {
                self.applied += 1;
                debug!(
                    account = request.account_id,
                    kind = %request.kind,
                    amount = request.amount,
                    balance = balance.balance,
                    limit = balance.balance_limit,
                    "Request applied"
                );
            }
            Err(err) => {
                self.rejected += 1;
                warn!(
                    account = request.account_id,
                    kind = %request.kind,
                    amount = request.amount,
                    reason = err.rejection_reason(),
                    error = %err,
                    "Request rejected"
                );
            }
        }
    }
}

/// The request-replay half of a strategy
pub(crate) trait Pipeline {
    async fn drive<S: LedgerStore>(
        &self,
        engine: &LedgerEngine<S>,
        input_path: &Path,
    ) -> Result<RunSummary, LedgerError>;
}

/// Open the configured store and run `pipeline` against it
pub(crate) async fn run_pipeline<P: Pipeline>(
    pipeline: &P,
    options: &RunOptions,
    input_path: &Path,
    output: &mut dyn Write,
) -> Result<RunSummary, LedgerError> {
    match &options.store {
        StoreConfig::Memory => {
            let store = InMemoryLedgerStore::new();
            run_with_store(pipeline, store, options, input_path, output).await
        }
        StoreConfig::Postgres(settings) => {
            let store = PostgresLedgerStore::connect(settings)
                .await?
                .with_lock_timeout(options.engine.lock_timeout);
            store.migrate().await?;
            run_with_store(pipeline, store, options, input_path, output).await
        }
    }
}

async fn run_with_store<P: Pipeline, S: LedgerStore>(
    pipeline: &P,
    store: S,
    options: &RunOptions,
    input_path: &Path,
    output: &mut dyn Write,
) -> Result<RunSummary, LedgerError> {
    let engine = LedgerEngine::new(Arc::new(store), options.engine);

    if let Some(seeds) = &options.seeds {
        engine.seed_accounts(seeds).await?;
    }

    let summary = pipeline.drive(&engine, input_path).await?;

    match options.output {
        OutputFormat::Accounts => write_accounts_csv(&engine.accounts().await?, output)?,
        OutputFormat::Statements => write_statements_csv(&engine.statements().await?, output)?,
    }

    info!(
        applied = summary.applied,
        rejected = summary.rejected,
        skipped = summary.skipped,
        "Run complete"
    );
    Ok(summary)
}
