//! Processing strategy module for ledger replay
//!
//! This module defines the Strategy pattern for complete ledger pipelines:
//! seeding accounts from CSV, applying a transfers CSV, running accrual
//! passes and writing the final account states. Different implementations
//! (sequential, concurrent batch) can be selected at runtime.

use crate::cli::StrategyType;
use crate::config::LedgerConfig;
use crate::types::{Account, LedgerError, TransferReceipt, TransferRecord};
use std::io::Write;
use std::path::Path;
use tracing::warn;

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use sync::SyncProcessingStrategy;

/// Settings shared by every strategy
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineConfig {
    pub ledger: LedgerConfig,
    /// Accrual passes to run after all transfers are applied
    pub accrual_passes: usize,
    /// Run the periodic scheduler while transfers are in flight (async only)
    pub background_accrual: bool,
}

/// Counts of what a pipeline run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub accounts_opened: usize,
    pub accounts_rejected: usize,
    pub transfers_applied: usize,
    pub transfers_failed: usize,
    /// Rows that could not be parsed
    pub rows_skipped: usize,
    /// Accrual passes that ran, scheduled ones included
    pub accrual_passes: usize,
}

impl RunSummary {
    pub(crate) fn record_open(&mut self, result: Result<Account, LedgerError>) {
        match result {
            Ok(_) => self.accounts_opened += 1,
            Err(e) => {
                warn!(error = %e, "Account rejected");
                self.accounts_rejected += 1;
            }
        }
    }

    pub(crate) fn record_transfer(
        &mut self,
        record: &TransferRecord,
        result: &Result<TransferReceipt, LedgerError>,
    ) {
        match result {
            Ok(_) => self.transfers_applied += 1,
            Err(e) => {
                // Insufficient funds is already reported by the engine
                if !matches!(e, LedgerError::InsufficientFunds { .. }) {
                    warn!(from = record.from, to = record.to, amount = %record.amount, error = %e, "Transfer rejected");
                }
                self.transfers_failed += 1;
            }
        }
    }

    pub(crate) fn record_skipped(&mut self, error: &LedgerError) {
        warn!(error = %error, "Skipping malformed row");
        self.rows_skipped += 1;
    }
}

/// Processing strategy trait for complete ledger pipelines
pub trait ProcessingStrategy: Send + Sync {
    /// Seed accounts, apply transfers, accrue and write the final state
    ///
    /// # Arguments
    ///
    /// * `accounts_path` - CSV with `owner,initial_deposit[,balance]` rows
    /// * `transfers_path` - Optional CSV with `from,to,amount` rows
    /// * `output` - Writer receiving the `account,owner,balance,initial_deposit` CSV
    ///
    /// # Errors
    ///
    /// Returns an error only for fatal conditions: an input file that cannot
    /// be opened, an unreadable store or an output write failure. Malformed
    /// rows and rejected accounts or transfers are logged and counted in the
    /// returned `RunSummary`.
    fn process(
        &self,
        accounts_path: &Path,
        transfers_path: Option<&Path>,
        output: &mut dyn Write,
    ) -> Result<RunSummary, LedgerError>;
}

/// Create a processing strategy based on the specified strategy type
///
/// # Arguments
///
/// * `strategy_type` - The type of processing strategy to create (Sync or Async)
/// * `pipeline` - Ledger and accrual settings
/// * `batch` - Optional batch configuration (ignored for sync)
pub fn create_strategy(
    strategy_type: StrategyType,
    pipeline: PipelineConfig,
    batch: Option<BatchConfig>,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy::new(pipeline)),
        StrategyType::Async => Box::new(AsyncProcessingStrategy::new(
            pipeline,
            batch.unwrap_or_default(),
        )),
    }
}
