//! Transfer-related types for the Rust Ledger Engine

use super::account::{AccountId, OwnerId};
use rust_decimal::Decimal;

/// A requested balance movement between two owners
///
/// Comes either from the authenticated API layer (sender is the caller) or
/// from a transfers CSV replayed by the CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    /// Owner whose account is debited
    pub from: OwnerId,

    /// Owner whose account is credited
    pub to: OwnerId,

    /// Amount to move, positive with at most 2 fractional digits
    pub amount: Decimal,
}

impl TransferRecord {
    pub fn new(from: OwnerId, to: OwnerId, amount: Decimal) -> Self {
        TransferRecord { from, to, amount }
    }
}

/// Committed balances of both accounts after a successful transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    pub sender: AccountId,
    pub receiver: AccountId,
    pub sender_balance: Decimal,
    pub receiver_balance: Decimal,
    pub amount: Decimal,
    /// Number of attempts it took to commit (1 when uncontended)
    pub attempts: u32,
}
