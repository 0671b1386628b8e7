//! Account-related types for the Rust Ledger Engine
//!
//! This module defines the Account record held by the account store and the
//! identifiers used to reach it.

use rust_decimal::Decimal;

/// Account identifier
///
/// Allocated by the store in ascending order. The ordering of account ids is
/// the global lock order used for two-account operations.
pub type AccountId = u64;

/// Owner (user) identifier
///
/// Resolved by the surrounding authentication layer; the ledger only uses it
/// as a lookup key. Each owner holds exactly one account.
pub type OwnerId = u64;

/// Record version used for conditioned writes
pub type Version = u64;

/// Balance-holding record associated with exactly one owner
///
/// `id`, `owner`, `initial_deposit` and `version` are fixed by the store and
/// exposed read-only. `balance` can be changed on a working copy with
/// [`Account::set_balance`], but the change only becomes visible once the
/// store commits it.
///
/// The balance is never negative. It is not bounded by the accrual cap:
/// accrual never raises a balance above `initial_deposit * cap_ratio`, but a
/// seeded balance or an incoming transfer can leave it higher until the next
/// pass clamps it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    id: AccountId,
    owner: OwnerId,
    balance: Decimal,
    initial_deposit: Decimal,
    version: Version,
}

impl Account {
    /// Create a freshly stored account record at version 0
    ///
    /// Only the store builds records; callers receive copies.
    pub(crate) fn new(
        id: AccountId,
        owner: OwnerId,
        initial_deposit: Decimal,
        balance: Decimal,
    ) -> Self {
        Account {
            id,
            owner,
            balance,
            initial_deposit,
            version: 0,
        }
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    /// Current funds, 2 fractional digits
    pub fn balance(&self) -> Decimal {
        self.balance
    }

    /// Deposit made when the account was opened; never changes afterwards
    pub fn initial_deposit(&self) -> Decimal {
        self.initial_deposit
    }

    /// Version of the record this copy was read at
    pub fn version(&self) -> Version {
        self.version
    }

    /// Replace the balance on this working copy
    pub fn set_balance(&mut self, balance: Decimal) {
        self.balance = balance;
    }

    pub(crate) fn bump_version(&mut self) {
        self.version += 1;
    }
}

/// Initial state of an account to be inserted into a store
///
/// Used both for opening new accounts (`balance == initial_deposit`) and for
/// restoring previously persisted records whose balance has since moved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSeed {
    pub owner: OwnerId,
    pub initial_deposit: Decimal,
    pub balance: Decimal,
}

impl AccountSeed {
    /// Seed for a brand-new account: the balance starts at the deposit
    pub fn opening(owner: OwnerId, initial_deposit: Decimal) -> Self {
        AccountSeed {
            owner,
            initial_deposit,
            balance: initial_deposit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_account_starts_at_version_zero() {
        let account = Account::new(7, 42, Decimal::new(50000, 2), Decimal::new(100000, 2));

        assert_eq!(account.id(), 7);
        assert_eq!(account.owner(), 42);
        assert_eq!(account.initial_deposit(), Decimal::new(50000, 2));
        assert_eq!(account.balance(), Decimal::new(100000, 2));
        assert_eq!(account.version(), 0);
    }

    #[test]
    fn test_set_balance_leaves_version_alone() {
        let mut account = Account::new(1, 1, Decimal::new(100, 2), Decimal::new(100, 2));

        account.set_balance(Decimal::new(250, 2));

        assert_eq!(account.balance(), Decimal::new(250, 2));
        assert_eq!(account.version(), 0);
    }

    #[test]
    fn test_opening_seed_balance_equals_deposit() {
        let seed = AccountSeed::opening(3, Decimal::new(12345, 2));

        assert_eq!(seed.balance, seed.initial_deposit);
        assert_eq!(seed.owner, 3);
    }
}
