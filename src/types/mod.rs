//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `account`: Account record and identifiers
//! - `transfer`: Transfer requests and receipts
//! - `error`: Error types for the ledger engine

pub mod account;
pub mod error;
pub mod transfer;

pub use account::{Account, AccountId, AccountSeed, OwnerId, Version};
pub use error::{ErrorKind, LedgerError};
pub use transfer::{TransferReceipt, TransferRecord};
