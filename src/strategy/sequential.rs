//! Sequential processing strategy
//!
//! Applies requests one at a time in file order on a current-thread tokio
//! runtime. Rows are streamed through [`SyncReader`], so memory stays
//! constant whatever the file size.
//!
//! With every request applied in file order, the output is fully
//! deterministic, including transaction ids.

use std::io::Write;
use std::path::Path;

use tracing::warn;

use super::pipeline::{run_pipeline, Pipeline, RunSummary};
use super::{ProcessingStrategy, RunOptions};
use crate::core::{LedgerEngine, LedgerStore, ProcessingResult};
use crate::io::SyncReader;
use crate::types::LedgerError;

/// Sequential processing strategy
#[derive(Debug, Clone)]
pub struct SequentialProcessingStrategy {
    options: RunOptions,
}

impl SequentialProcessingStrategy {
    pub fn new(options: RunOptions) -> Self {
        Self { options }
    }
}

impl Pipeline for SequentialProcessingStrategy {
    async fn drive<S: LedgerStore>(
        &self,
        engine: &LedgerEngine<S>,
        input_path: &Path,
    ) -> Result<RunSummary, LedgerError> {
        let reader = SyncReader::new(input_path)?;
        let mut summary = RunSummary::default();

        for item in reader {
            match item {
                Ok(request) => {
                    let result = engine.apply_transaction(&request).await;
                    summary.record(&ProcessingResult { request, result });
                }
                Err(e @ LedgerError::IoError { .. }) => return Err(e),
                Err(e) => {
                    warn!(error = %e, "Skipping malformed row");
                    summary.skipped += 1;
                }
            }
        }

        Ok(summary)
    }
}

impl ProcessingStrategy for SequentialProcessingStrategy {
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<RunSummary, LedgerError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| LedgerError::IoError {
                message: format!("Failed to create tokio runtime: {}", e),
            })?;

        runtime.block_on(run_pipeline(self, &self.options, input_path, output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OutputFormat;
    use crate::types::AccountSeed;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Helper function to create a temporary CSV file for testing
    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    fn run(options: RunOptions, content: &str) -> (RunSummary, String) {
        let file = create_temp_csv(content);
        let strategy = SequentialProcessingStrategy::new(options);
        let mut output = Vec::new();

        let summary = strategy.process(file.path(), &mut output).unwrap();

        (summary, String::from_utf8(output).unwrap())
    }

    #[test]
    fn test_sequential_strategy_applies_in_order() {
        let options = RunOptions {
            seeds: Some(vec![AccountSeed::new(1, "one", 100)]),
            ..RunOptions::default()
        };

        let (summary, output) = run(
            options,
            "account,kind,amount,description\n\
             1,d,100,all\n\
             1,d,1,over\n\
             1,c,30,back\n",
        );

        assert_eq!(summary.applied, 2);
        assert_eq!(summary.rejected, 1);
        assert_eq!(output, "account,balance,limit\n1,-70,100\n");
    }

    #[test]
    fn test_sequential_strategy_default_seeds() {
        let (_, output) = run(RunOptions::default(), "account,kind,amount,description\n");

        assert_eq!(
            output,
            "account,balance,limit\n\
             1,0,100000\n\
             2,0,80000\n\
             3,0,1000000\n\
             4,0,10000000\n\
             5,0,500000\n"
        );
    }

    #[test]
    fn test_sequential_strategy_counts_skipped_rows() {
        let (summary, _) = run(
            RunOptions::default(),
            "account,kind,amount,description\n\
             1,c,1.5,frac\n\
             1,c,10,ok\n",
        );

        assert_eq!(
            summary,
            RunSummary {
                applied: 1,
                rejected: 0,
                skipped: 1
            }
        );
    }

    #[test]
    fn test_sequential_strategy_unreadable_input_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let strategy = SequentialProcessingStrategy::new(RunOptions::default());
        let mut output = Vec::new();

        let result = strategy.process(dir.path(), &mut output);

        assert!(matches!(result, Err(LedgerError::IoError { .. })));
        assert!(output.is_empty());
    }

    #[test]
    fn test_sequential_strategy_short_row_reaches_engine() {
        let (summary, output) = run(
            RunOptions::default(),
            "account,kind,amount,description\n\
             1,c,1\n\
             1,c,10,ok\n",
        );

        // A missing description is rejected by validation, not skipped
        assert_eq!(
            summary,
            RunSummary {
                applied: 1,
                rejected: 1,
                skipped: 0
            }
        );
        assert!(output.contains("1,10,100000\n"));
    }

    #[test]
    fn test_sequential_strategy_statements_output() {
        let options = RunOptions {
            seeds: Some(vec![AccountSeed::new(1, "one", 10)]),
            output: OutputFormat::Statements,
            ..RunOptions::default()
        };

        let (_, output) = run(options, "account,kind,amount,description\n1,c,5,tip\n");

        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("1,5,10,1,c,5,tip,"), "got {}", lines[1]);
    }

    #[test]
    fn test_sequential_strategy_handles_missing_file() {
        let strategy = SequentialProcessingStrategy::new(RunOptions::default());
        let mut output = Vec::new();

        let result = strategy.process(Path::new("nonexistent.csv"), &mut output);

        assert!(matches!(result, Err(LedgerError::FileNotFound { .. })));
    }

    #[test]
    fn test_sequential_strategy_rejects_bad_seed() {
        let mut seed = AccountSeed::new(1, "one", 10);
        seed.balance = -11;
        let options = RunOptions {
            seeds: Some(vec![seed]),
            ..RunOptions::default()
        };
        let file = create_temp_csv("account,kind,amount,description\n");
        let strategy = SequentialProcessingStrategy::new(options);
        let mut output = Vec::new();

        let result = strategy.process(file.path(), &mut output);

        assert!(matches!(result, Err(LedgerError::InvalidAccountSeed { .. })));
    }

    #[test]
    fn test_sequential_strategy_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SequentialProcessingStrategy>();
    }
}
