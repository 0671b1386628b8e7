//! Asynchronous batch processing strategy
//!
//! This module provides a concurrent implementation of the
//! ProcessingStrategy trait. Transfers are read in batches and applied in
//! parallel, partitioned by sender.
//!
//! # Architecture
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── BatchConfig (batch_size, max_concurrent_batches)
//!     ├── AsyncReader (batch CSV reading)
//!     ├── BatchProcessor (sender partitioning on the blocking pool)
//!     │       └── TransferEngine ──► InMemoryAccountStore
//!     └── AccrualScheduler (optional background task + final passes)
//! ```
//!
//! # Ordering
//!
//! - Batches are processed one after another, so a sender's transfers keep
//!   file order across the whole file
//! - Within a batch, different senders run concurrently; transfers from
//!   different senders that touch the same account may commit in any order
//! - With background accrual enabled, passes interleave with transfers at
//!   per-account granularity and the final balances depend on timing

use crate::core::{
    AccountStore, AccrualScheduler, BatchProcessor, InMemoryAccountStore, TransferEngine,
};
use crate::io::async_reader::AsyncReader;
use crate::io::csv_format::write_accounts_csv;
use crate::io::sync_reader::open_error;
use crate::strategy::{PipelineConfig, ProcessingStrategy, RunSummary};
use crate::types::{AccountSeed, LedgerError, TransferRecord};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};
use tracing::{info, warn};

/// Configuration for batch processing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchConfig {
    /// Number of transfers per batch
    pub batch_size: usize,
    /// Number of runtime worker threads
    pub max_concurrent_batches: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent_batches: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a new BatchConfig; zero values fall back to the defaults
    pub fn new(batch_size: usize, max_concurrent_batches: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            warn!(
                batch_size,
                default = default.batch_size,
                "Invalid batch_size, using default"
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent_batches = if max_concurrent_batches == 0 {
            warn!(
                max_concurrent_batches,
                default = default.max_concurrent_batches,
                "Invalid max_concurrent_batches, using default"
            );
            default.max_concurrent_batches
        } else {
            max_concurrent_batches
        };

        Self {
            batch_size,
            max_concurrent_batches,
        }
    }
}

/// Asynchronous batch processing strategy
///
/// # Configuration
///
/// - `batch_size`: transfers per batch (default: 1000)
/// - `max_concurrent_batches`: worker threads (default: CPU cores)
#[derive(Debug, Clone)]
pub struct AsyncProcessingStrategy {
    pipeline: PipelineConfig,
    batch: BatchConfig,
}

async fn open_csv(path: &Path) -> Result<Compat<tokio::fs::File>, LedgerError> {
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|e| open_error(path, e))?;
    Ok(file.compat())
}

impl AsyncProcessingStrategy {
    pub fn new(pipeline: PipelineConfig, batch: BatchConfig) -> Self {
        Self { pipeline, batch }
    }

    /// Seeding and transfer phases, run inside the runtime
    async fn run_pipeline(
        &self,
        store: &Arc<InMemoryAccountStore>,
        scheduler: &AccrualScheduler<InMemoryAccountStore>,
        accounts_path: &Path,
        transfers_path: Option<&Path>,
        summary: &mut RunSummary,
    ) -> Result<(), LedgerError> {
        self.seed_accounts(store, accounts_path, summary).await?;
        info!(accounts = summary.accounts_opened, "Accounts loaded");

        let Some(path) = transfers_path else {
            return Ok(());
        };

        let background = self
            .pipeline
            .background_accrual
            .then(|| scheduler.clone().spawn());

        let processor = BatchProcessor::new(TransferEngine::new(
            Arc::clone(store),
            self.pipeline.ledger.retry.clone(),
        ));
        let applied = self.apply_transfers(&processor, path, summary).await;

        if let Some(handle) = background {
            summary.accrual_passes += handle.shutdown().await as usize;
        }
        applied
    }

    async fn seed_accounts(
        &self,
        store: &InMemoryAccountStore,
        path: &Path,
        summary: &mut RunSummary,
    ) -> Result<(), LedgerError> {
        let mut reader: AsyncReader<_, AccountSeed> = AsyncReader::new(open_csv(path).await?);

        loop {
            let batch = reader.read_batch(self.batch.batch_size).await;
            if batch.is_empty() {
                break;
            }
            for seed in batch {
                summary.record_open(store.insert(seed));
            }
        }

        summary.rows_skipped += reader.skipped();
        Ok(())
    }

    async fn apply_transfers(
        &self,
        processor: &BatchProcessor<InMemoryAccountStore>,
        path: &Path,
        summary: &mut RunSummary,
    ) -> Result<(), LedgerError> {
        let mut reader: AsyncReader<_, TransferRecord> = AsyncReader::new(open_csv(path).await?);

        // Each batch completes before the next is read, so a sender whose
        // transfers span batches still sees them in file order
        loop {
            let batch = reader.read_batch(self.batch.batch_size).await;
            if batch.is_empty() {
                break;
            }
            for outcome in processor.process_batch(batch).await {
                summary.record_transfer(&outcome.record, &outcome.result);
            }
        }

        summary.rows_skipped += reader.skipped();
        Ok(())
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    fn process(
        &self,
        accounts_path: &Path,
        transfers_path: Option<&Path>,
        output: &mut dyn Write,
    ) -> Result<RunSummary, LedgerError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.batch.max_concurrent_batches)
            .enable_time()
            .build()
            .map_err(|e| LedgerError::IoError {
                message: format!("Failed to create tokio runtime: {}", e),
            })?;

        let ledger = &self.pipeline.ledger;
        let store = Arc::new(InMemoryAccountStore::with_lock_timeout(ledger.lock_timeout));
        let scheduler = AccrualScheduler::new(Arc::clone(&store), ledger.accrual.clone());
        let mut summary = RunSummary::default();

        runtime.block_on(self.run_pipeline(
            &store,
            &scheduler,
            accounts_path,
            transfers_path,
            &mut summary,
        ))?;

        for _ in 0..self.pipeline.accrual_passes {
            scheduler.run_accrual_pass();
            summary.accrual_passes += 1;
        }

        write_accounts_csv(&store.snapshot()?, output)?;

        Ok(summary)
    }
}
