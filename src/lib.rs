//! Rust Ledger Engine Library
//! # Overview
//!
//! This library keeps a set of single-owner accounts consistent under
//! concurrent transfers and a periodic, capped balance accrual job.
//!
//! # Architecture
//!
//! - [`types`] - Core data types (Account, TransferRecord, LedgerError)
//! - [`config`] - Accrual constants, retry policy and lock timeout
//! - [`core`] - Ledger components:
//!   - [`core::store`] - Account records behind per-record locks
//!   - [`core::transfer`] - Atomic two-account transfers with retry
//!   - [`core::accrual`] - Periodic bounded growth and its scheduler
//!   - [`core::guard`] - Money validation and arithmetic
//! - [`io`] - CSV seed and transfer readers, account writer
//! - [`strategy`] - Sequential and concurrent replay pipelines
//! - [`cli`] - CLI arguments parsing
//!
//! # Invariants
//!
//! - A transfer changes both balances or neither, and preserves their sum
//! - No committed balance is ever negative
//! - Accrual never raises a balance above `initial_deposit * cap_ratio`
//! - Readers never observe a half-applied transfer on a consistent snapshot

pub mod cli;
pub mod config;
pub mod core;
pub mod io;
pub mod strategy;
pub mod types;

pub use config::{AccrualConfig, LedgerConfig, RetryPolicy};
pub use core::{
    AccountStore, AccrualReport, AccrualScheduler, InMemoryAccountStore, SchedulerHandle,
    TransferEngine,
};
pub use io::write_accounts_csv;
pub use types::{
    Account, AccountId, AccountSeed, ErrorKind, LedgerError, OwnerId, TransferReceipt,
    TransferRecord, Version,
};
