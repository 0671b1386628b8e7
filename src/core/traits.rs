//! Core trait for account storage
//!
//! `AccountStore` is the narrow repository contract the ledger core is built
//! on. The transfer engine and the accrual scheduler are generic over it, so
//! a durable backend (or a fault-injecting test double) can stand in for the
//! in-memory store without touching either.

use crate::types::{Account, AccountId, AccountSeed, LedgerError, OwnerId, Version};
use rust_decimal::Decimal;

/// Keyed account storage with per-record atomic updates
///
/// # Locking contract
///
/// - `with_lock` and `with_ordered_lock` are the only blocking operations, and
///   they only block on the specific records they name. Point reads return
///   the last committed copy without waiting on record locks.
/// - Two-record access always acquires the lower account id first. Any two
///   operations needing the same pair therefore request locks in the same
///   global order and cannot deadlock.
/// - Lock waits are bounded; exceeding the bound yields `LockTimeout` and
///   nothing is written.
/// - Closures receive working copies. Their changes are committed (with a
///   version bump per record) only if the closure returns `Ok`, and for the
///   two-record case both records are committed together or not at all.
///
/// Stores keep balances non-negative. They do not enforce the accrual cap
/// (`initial_deposit * cap_ratio`): a seeded balance or an incoming transfer
/// may exceed it, and only an accrual pass brings the balance back down.
pub trait AccountStore: Send + Sync {
    /// Insert a new account record and index it by owner
    ///
    /// Fails with `DuplicateOwner` if the owner already holds an account.
    fn insert(&self, seed: AccountSeed) -> Result<Account, LedgerError>;

    /// Open the single account of a new owner with `balance == initial_deposit`
    fn open_account(&self, owner: OwnerId, initial_deposit: Decimal) -> Result<Account, LedgerError> {
        self.insert(AccountSeed::opening(owner, initial_deposit))
    }

    /// Remove the account of an owner (cascade of the owner's deletion)
    fn close_account(&self, owner: OwnerId) -> Result<Account, LedgerError>;

    /// Resolve an owner to its account id from the owner index alone
    fn account_id(&self, owner: OwnerId) -> Result<AccountId, LedgerError>;

    /// Ids of all stored accounts in ascending order
    fn account_ids(&self) -> Vec<AccountId>;

    /// Point lookup by account id
    fn get(&self, id: AccountId) -> Result<Account, LedgerError>;

    /// Point lookup by owner
    fn get_by_owner(&self, owner: OwnerId) -> Result<Account, LedgerError>;

    /// Lazily iterate over all accounts
    ///
    /// The set of ids is fixed when the iterator is created; each record's
    /// last committed copy is read when reached. Records removed in between are skipped. There is no
    /// consistent cut across records.
    fn get_all(&self) -> Box<dyn Iterator<Item = Account> + '_>;

    /// Write `account` only if the stored record is still at `expected_version`
    ///
    /// Returns the committed record (with its new version).
    fn compare_and_save(
        &self,
        account: &Account,
        expected_version: Version,
    ) -> Result<Account, LedgerError>;

    /// Run `f` with exclusive access to one record and commit its changes
    ///
    /// `f` works on a copy. Nothing is written if `f` fails or leaves the
    /// copy unchanged.
    fn with_lock<F, R>(&self, id: AccountId, f: F) -> Result<R, LedgerError>
    where
        F: FnOnce(&mut Account) -> Result<R, LedgerError>;

    /// Run `f` with exclusive access to two distinct records and commit both
    ///
    /// Locks are taken in ascending id order regardless of argument order;
    /// `f` receives the records in argument order.
    fn with_ordered_lock<F, R>(&self, a: AccountId, b: AccountId, f: F) -> Result<R, LedgerError>
    where
        F: FnOnce(&mut Account, &mut Account) -> Result<R, LedgerError>;
}
