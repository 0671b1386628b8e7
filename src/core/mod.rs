//! Core business logic module
//!
//! This module contains the ledger components:
//! - `traits` - The `AccountStore` abstraction with per-record locking
//! - `store` - In-memory store with versioned records
//! - `guard` - Money rules: validation, rounding, transfer arithmetic, cap
//! - `transfer` - Atomic transfers with bounded retries
//! - `accrual` - Periodic bounded growth and its scheduler
//! - `batch_processor` - Concurrent replay of transfer batches

pub mod accrual;
pub mod batch_processor;
pub mod guard;
pub mod store;
pub mod traits;
pub mod transfer;

#[cfg(test)]
pub(crate) mod testing;

pub use accrual::{AccrualReport, AccrualScheduler, SchedulerHandle};
pub use batch_processor::{BatchProcessor, ProcessingResult};
pub use store::InMemoryAccountStore;
pub use traits::AccountStore;
pub use transfer::TransferEngine;
