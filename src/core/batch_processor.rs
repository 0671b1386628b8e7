//! Batch processing with sender-based partitioning
//!
//! This module provides the `BatchProcessor` struct, which applies a batch of
//! transfer requests concurrently while keeping each sender's requests in
//! their original order.
//!
//! # Design
//!
//! A batch is partitioned by the sender's owner id. Each partition runs on its
//! own blocking task and processes its transfers one after another through the
//! shared `TransferEngine`. Partitions touching the same receiver simply
//! contend on that receiver's record lock; the engine's ordered locking and
//! retry policy take care of the rest.
//!
//! # Architecture
//!
//! ```text
//! BatchProcessor
//!     └── TransferEngine<S>   (shared, cloneable)
//!             ├── Arc<S: AccountStore>
//!             └── RetryPolicy
//! ```
//!
//! # Thread Safety
//!
//! The processor is cloneable and can be shared across tasks. Transfers block
//! on record locks and retry backoff, so partitions run on tokio's blocking
//! pool rather than on the async workers.

use std::collections::HashMap;

use super::traits::AccountStore;
use super::transfer::TransferEngine;
use crate::types::{LedgerError, OwnerId, TransferReceipt, TransferRecord};
use tracing::{debug, error};

/// Result of processing a single transfer request
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    /// The transfer request that was processed
    pub record: TransferRecord,

    /// Committed balances, or the reason nothing was committed
    pub result: Result<TransferReceipt, LedgerError>,
}

/// Batch processor with sender-based partitioning
#[derive(Debug)]
pub struct BatchProcessor<S> {
    engine: TransferEngine<S>,
}

impl<S> Clone for BatchProcessor<S> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
        }
    }
}

impl<S: AccountStore + 'static> BatchProcessor<S> {
    /// Create a new BatchProcessor
    ///
    /// # Arguments
    ///
    /// * `engine` - Transfer engine shared by every partition
    pub fn new(engine: TransferEngine<S>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &TransferEngine<S> {
        &self.engine
    }

    /// Partition a batch of transfers by sender
    ///
    /// # Guarantees
    ///
    /// - Each transfer appears in exactly one partition
    /// - Transfers of each sender keep their original order
    pub fn partition_by_sender(
        &self,
        batch: Vec<TransferRecord>,
    ) -> HashMap<OwnerId, Vec<TransferRecord>> {
        let mut sender_batches: HashMap<OwnerId, Vec<TransferRecord>> = HashMap::new();

        for record in batch {
            sender_batches.entry(record.from).or_default().push(record);
        }

        sender_batches
    }

    /// Process one sender's transfers sequentially
    ///
    /// Failures are captured in the results and never stop the partition.
    pub fn process_sender_transfers(&self, transfers: Vec<TransferRecord>) -> Vec<ProcessingResult> {
        let mut results = Vec::with_capacity(transfers.len());

        for record in transfers {
            let result = self.engine.process(&record);
            results.push(ProcessingResult { record, result });
        }

        results
    }

    /// Process a batch with sender-based partitioning
    ///
    /// Spawns one blocking task per sender and waits for all of them. Results
    /// are grouped by sender; the order between senders is unspecified.
    pub async fn process_batch(&self, batch: Vec<TransferRecord>) -> Vec<ProcessingResult> {
        let sender_batches = self.partition_by_sender(batch);
        debug!(partitions = sender_batches.len(), "Processing transfer batch");

        let mut tasks = Vec::with_capacity(sender_batches.len());
        for (_sender, transfers) in sender_batches {
            let processor = self.clone();
            tasks.push(tokio::task::spawn_blocking(move || {
                processor.process_sender_transfers(transfers)
            }));
        }

        let mut results = Vec::new();
        for task in tasks {
            match task.await {
                Ok(sender_results) => results.extend(sender_results),
                Err(e) => error!(error = %e, "Transfer partition task panicked"),
            }
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryPolicy;
    use crate::core::store::InMemoryAccountStore;
    use rust_decimal::Decimal;
    use std::sync::Arc;
    use std::time::Duration;

    fn processor_with(owners: &[(OwnerId, i64)]) -> BatchProcessor<InMemoryAccountStore> {
        let store = Arc::new(InMemoryAccountStore::with_lock_timeout(Duration::from_secs(5)));
        for (owner, cents) in owners {
            store.open_account(*owner, Decimal::new(*cents, 2)).unwrap();
        }
        BatchProcessor::new(TransferEngine::new(store, RetryPolicy::default()))
    }

    fn transfer(from: OwnerId, to: OwnerId, cents: i64) -> TransferRecord {
        TransferRecord::new(from, to, Decimal::new(cents, 2))
    }

    #[test]
    fn test_partition_by_sender_empty_batch() {
        let processor = processor_with(&[]);

        assert!(processor.partition_by_sender(vec![]).is_empty());
    }

    #[test]
    fn test_partition_by_sender_maintains_order() {
        let processor = processor_with(&[]);
        let batch = vec![
            transfer(1, 2, 100),
            transfer(2, 1, 200),
            transfer(1, 3, 300),
            transfer(3, 1, 400),
            transfer(1, 2, 500),
        ];

        let partitioned = processor.partition_by_sender(batch);

        assert_eq!(partitioned.len(), 3);
        let amounts: Vec<i64> = partitioned[&1]
            .iter()
            .map(|r| r.amount.mantissa() as i64)
            .collect();
        assert_eq!(amounts, vec![100, 300, 500]);
        assert_eq!(partitioned[&2].len(), 1);
        assert_eq!(partitioned[&3].len(), 1);
        let total: usize = partitioned.values().map(Vec::len).sum();
        assert_eq!(total, 5);
    }

    #[test]
    fn test_sender_transfers_continue_after_failure() {
        let processor = processor_with(&[(1, 10_000), (2, 0)]);

        let results = processor.process_sender_transfers(vec![
            transfer(1, 2, 6_000),
            transfer(1, 2, 6_000),
            transfer(1, 2, 4_000),
        ]);

        assert!(results[0].result.is_ok());
        assert!(matches!(
            results[1].result,
            Err(LedgerError::InsufficientFunds { .. })
        ));
        assert!(results[2].result.is_ok());
        let engine = processor.engine();
        assert_eq!(engine.get_balance(1).unwrap(), Decimal::ZERO);
        assert_eq!(engine.get_balance(2).unwrap(), Decimal::new(10_000, 2));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_process_batch_conserves_total() {
        let owners: Vec<(OwnerId, i64)> = (1..=8).map(|owner| (owner, 10_000)).collect();
        let processor = processor_with(&owners);

        let mut batch = Vec::new();
        for round in 0..25 {
            for from in 1..=8u64 {
                let to = (from + round % 7) % 8 + 1;
                if to != from {
                    batch.push(transfer(from, to, 1_000 + round as i64));
                }
            }
        }
        let submitted = batch.len();

        let results = processor.process_batch(batch).await;

        assert_eq!(results.len(), submitted);
        let total: Decimal = (1..=8)
            .map(|owner| processor.engine().get_balance(owner).unwrap())
            .sum();
        assert_eq!(total, Decimal::new(80_000, 2));
        for owner in 1..=8 {
            assert!(processor.engine().get_balance(owner).unwrap() >= Decimal::ZERO);
        }
    }

    #[tokio::test]
    async fn test_process_batch_reports_every_failure() {
        let processor = processor_with(&[(1, 1_000)]);

        let results = processor
            .process_batch(vec![transfer(1, 9, 100), transfer(9, 1, 100)])
            .await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.result.is_err()));
        assert_eq!(
            processor.engine().get_balance(1).unwrap(),
            Decimal::new(1_000, 2)
        );
    }
}
