//! Batch processing with account-based partitioning
//!
//! This module provides the `BatchProcessor`, which applies a batch of
//! transaction requests through a [`LedgerEngine`] with one tokio task per
//! account.
//!
//! # Design
//!
//! Requests for different accounts run in parallel. Requests for the same
//! account run one after the other in input order, so whether a debit is
//! rejected depends only on the input, never on scheduling. The account lock
//! in the store still serialises anything else touching the same account.

use std::collections::HashMap;

use tracing::error;

use super::engine::LedgerEngine;
use super::traits::LedgerStore;
use crate::types::{AccountBalance, AccountId, LedgerError, TransactionRequest};

/// Result of processing a single request
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    /// The request that was processed
    pub request: TransactionRequest,

    /// The committed balance, or why the request was rejected
    pub result: Result<AccountBalance, LedgerError>,
}

/// Concurrent batch processor
#[derive(Debug)]
pub struct BatchProcessor<S> {
    engine: LedgerEngine<S>,
}

impl<S> Clone for BatchProcessor<S> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
        }
    }
}

impl<S: LedgerStore> BatchProcessor<S> {
    pub fn new(engine: LedgerEngine<S>) -> Self {
        Self { engine }
    }

    /// Split a batch into per-account sub-batches, keeping input order within each
    pub fn partition_by_account(
        &self,
        batch: Vec<TransactionRequest>,
    ) -> HashMap<AccountId, Vec<TransactionRequest>> {
        let mut account_batches: HashMap<AccountId, Vec<TransactionRequest>> = HashMap::new();

        for request in batch {
            account_batches
                .entry(request.account_id)
                .or_default()
                .push(request);
        }

        account_batches
    }

    /// Apply one account's requests in order
    ///
    /// A rejected request is recorded in its result and does not stop the rest.
    pub async fn process_account_requests(
        &self,
        requests: Vec<TransactionRequest>,
    ) -> Vec<ProcessingResult> {
        let mut results = Vec::with_capacity(requests.len());

        for request in requests {
            let result = self.engine.apply_transaction(&request).await;
            results.push(ProcessingResult { request, result });
        }

        results
    }

    /// Apply a batch with one task per account and wait for all of them
    ///
    /// Results are grouped by account; the order across accounts is
    /// unspecified.
    pub async fn process_batch(&self, batch: Vec<TransactionRequest>) -> Vec<ProcessingResult> {
        let account_batches = self.partition_by_account(batch);

        let mut tasks = Vec::with_capacity(account_batches.len());
        for (_account_id, requests) in account_batches {
            let processor = self.clone();
            tasks.push(tokio::spawn(async move {
                processor.process_account_requests(requests).await
            }));
        }

        let mut results = Vec::new();
        for task in tasks {
            match task.await {
                Ok(account_results) => results.extend(account_results),
                Err(e) => error!(error = %e, "Account task failed"),
            }
        }

        results
    }
}
