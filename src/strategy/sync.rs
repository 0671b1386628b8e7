//! Synchronous processing strategy
//!
//! This module provides a sequential implementation of the
//! ProcessingStrategy trait. It orchestrates the pipeline by coordinating
//! the SyncReader (CSV input), the TransferEngine and AccrualScheduler
//! (ledger logic) and `write_accounts_csv` (output).
//!
//! # Design
//!
//! Rows are streamed one at a time. Transfers are applied in file order, so
//! for a given input the result is fully deterministic. Accrual passes run
//! inline after the last transfer; the background scheduler is not used.

use crate::core::{AccountStore, AccrualScheduler, InMemoryAccountStore, TransferEngine};
use crate::io::csv_format::write_accounts_csv;
use crate::io::sync_reader::SyncReader;
use crate::strategy::{PipelineConfig, ProcessingStrategy, RunSummary};
use crate::types::{AccountSeed, LedgerError, TransferRecord};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Synchronous processing strategy
///
/// # Examples
///
/// ```no_run
/// use rust_ledger_engine::strategy::{PipelineConfig, ProcessingStrategy, SyncProcessingStrategy};
/// use std::io;
/// use std::path::Path;
///
/// let strategy = SyncProcessingStrategy::new(PipelineConfig::default());
/// let mut output = io::stdout();
///
/// strategy
///     .process(Path::new("accounts.csv"), Some(Path::new("transfers.csv")), &mut output)
///     .expect("Processing failed");
/// ```
#[derive(Debug, Clone, Default)]
pub struct SyncProcessingStrategy {
    config: PipelineConfig,
}

impl SyncProcessingStrategy {
    pub fn new(config: PipelineConfig) -> Self {
        if config.background_accrual {
            warn!("Background accrual is only available with the async strategy; ignoring");
        }
        Self { config }
    }
}

impl ProcessingStrategy for SyncProcessingStrategy {
    fn process(
        &self,
        accounts_path: &Path,
        transfers_path: Option<&Path>,
        output: &mut dyn Write,
    ) -> Result<RunSummary, LedgerError> {
        let ledger = &self.config.ledger;
        let store = Arc::new(InMemoryAccountStore::with_lock_timeout(ledger.lock_timeout));
        let mut summary = RunSummary::default();

        for row in SyncReader::<AccountSeed>::open(accounts_path)? {
            match row {
                Ok(seed) => summary.record_open(store.insert(seed)),
                Err(e) => summary.record_skipped(&e),
            }
        }
        info!(accounts = summary.accounts_opened, "Accounts loaded");

        if let Some(path) = transfers_path {
            let engine = TransferEngine::new(Arc::clone(&store), ledger.retry.clone());
            for row in SyncReader::<TransferRecord>::open(path)? {
                match row {
                    Ok(record) => {
                        let result = engine.process(&record);
                        summary.record_transfer(&record, &result);
                    }
                    Err(e) => summary.record_skipped(&e),
                }
            }
        }

        let scheduler = AccrualScheduler::new(Arc::clone(&store), ledger.accrual.clone());
        for _ in 0..self.config.accrual_passes {
            scheduler.run_accrual_pass();
            summary.accrual_passes += 1;
        }

        write_accounts_csv(&store.snapshot()?, output)?;

        Ok(summary)
    }
}
