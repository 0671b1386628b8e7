//! Error types for the Rust Ledger Engine
//!
//! This module defines all error types that can occur in the ledger core and
//! in the CSV pipeline around it.
//!
//! # Error Categories
//!
//! - **Validation**: self-transfers, non-positive or over-precise amounts
//! - **Not found**: unknown owners or account records
//! - **Insufficient funds**: sender balance below the requested amount
//! - **Conflict**: contention on account records (lock timeouts, version
//!   mismatches) and exhausted transfer retries
//! - **Internal**: storage failures, arithmetic overflow, file and CSV errors
//!
//! None of these are produced after a partial mutation: whenever an operation
//! returns an error, the store is exactly as it was before the call.

use super::account::{AccountId, OwnerId, Version};
use rust_decimal::Decimal;
use thiserror::Error;

/// Coarse error classification exposed to the API layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    InsufficientFunds,
    Conflict,
    Internal,
}

/// Main error type for the ledger engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// File not found at the specified path
    #[error("File not found: {path}")]
    FileNotFound {
        /// The path that was not found
        path: String,
    },

    /// I/O error occurred while reading or writing files
    #[error("I/O error: {message}")]
    IoError {
        /// Description of the I/O error
        message: String,
    },

    /// CSV parsing error occurred
    ///
    /// Recoverable in the CSV pipeline: the malformed row is skipped.
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    ParseError {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        /// Description of the parsing error
        message: String,
    },

    /// Malformed request: self-transfer, bad amount, bad deposit
    #[error("{message}")]
    InvalidArgument {
        /// Human-readable reason
        message: String,
    },

    /// The sending owner has no account
    #[error("Sender account not found for owner {owner}")]
    SenderNotFound { owner: OwnerId },

    /// The receiving owner has no account
    #[error("Receiver account not found for owner {owner}")]
    ReceiverNotFound { owner: OwnerId },

    /// Lookup by owner found no account
    #[error("Account not found for owner {owner}")]
    AccountNotFound { owner: OwnerId },

    /// Lookup by account id found no record
    #[error("Account record {account} not found")]
    RecordNotFound { account: AccountId },

    /// An account already exists for this owner
    #[error("Owner {owner} already has an account")]
    DuplicateOwner { owner: OwnerId },

    /// Sender balance is below the requested amount
    ///
    /// The transfer is rejected and neither account changes.
    #[error("Insufficient funds for owner {owner}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        owner: OwnerId,
        balance: Decimal,
        requested: Decimal,
    },

    /// A write would leave a negative balance
    #[error("Rejected write leaving account {account} with negative balance {balance}")]
    NegativeBalance { account: AccountId, balance: Decimal },

    /// Arithmetic overflow would occur
    #[error("Arithmetic overflow in {operation} for account {account}")]
    ArithmeticOverflow {
        /// Operation that would overflow
        operation: String,
        account: AccountId,
    },

    /// The record changed since it was read
    #[error("Version conflict on account {account}: expected version {expected}, found {actual}")]
    VersionConflict {
        account: AccountId,
        expected: Version,
        actual: Version,
    },

    /// Exclusive access to a record was not obtained within the bounded wait
    #[error("Timed out waiting for lock on account {account}")]
    LockTimeout { account: AccountId },

    /// Contention persisted through every retry
    ///
    /// Nothing was written; the caller may retry the whole operation.
    #[error("Transfer aborted after {attempts} attempts due to concurrent modification")]
    Conflict { attempts: u32 },

    /// Underlying storage failure unrelated to contention
    #[error("Storage error: {message}")]
    Storage { message: String },
}

// Conversion from io::Error to LedgerError
impl From<std::io::Error> for LedgerError {
    fn from(error: std::io::Error) -> Self {
        LedgerError::IoError {
            message: error.to_string(),
        }
    }
}

// Conversion from csv::Error to LedgerError
impl From<csv::Error> for LedgerError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        LedgerError::ParseError {
            line,
            message: error.to_string(),
        }
    }
}

impl LedgerError {
    /// Classify this error into the taxonomy exposed to callers
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::InvalidArgument { .. }
            | LedgerError::DuplicateOwner { .. }
            | LedgerError::NegativeBalance { .. } => ErrorKind::Validation,
            LedgerError::SenderNotFound { .. }
            | LedgerError::ReceiverNotFound { .. }
            | LedgerError::AccountNotFound { .. }
            | LedgerError::RecordNotFound { .. } => ErrorKind::NotFound,
            LedgerError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            LedgerError::VersionConflict { .. }
            | LedgerError::LockTimeout { .. }
            | LedgerError::Conflict { .. } => ErrorKind::Conflict,
            LedgerError::FileNotFound { .. }
            | LedgerError::IoError { .. }
            | LedgerError::ParseError { .. }
            | LedgerError::ArithmeticOverflow { .. }
            | LedgerError::Storage { .. } => ErrorKind::Internal,
        }
    }

    /// Whether the operation may succeed if retried as-is
    ///
    /// `Conflict` is deliberately excluded: it is what a retry loop returns
    /// once it has given up.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LedgerError::VersionConflict { .. } | LedgerError::LockTimeout { .. }
        )
    }

    /// Create an InvalidArgument error
    pub fn invalid_argument(message: &str) -> Self {
        LedgerError::InvalidArgument {
            message: message.to_string(),
        }
    }

    /// Create an InsufficientFunds error
    pub fn insufficient_funds(owner: OwnerId, balance: Decimal, requested: Decimal) -> Self {
        LedgerError::InsufficientFunds {
            owner,
            balance,
            requested,
        }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(operation: &str, account: AccountId) -> Self {
        LedgerError::ArithmeticOverflow {
            operation: operation.to_string(),
            account,
        }
    }

    /// Create a VersionConflict error
    pub fn version_conflict(account: AccountId, expected: Version, actual: Version) -> Self {
        LedgerError::VersionConflict {
            account,
            expected,
            actual,
        }
    }

    /// Create a Storage error
    pub fn storage(message: &str) -> Self {
        LedgerError::Storage {
            message: message.to_string(),
        }
    }
}
