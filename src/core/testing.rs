//! Fault-injecting store double for unit tests

use super::store::InMemoryAccountStore;
use super::traits::AccountStore;
use crate::types::{Account, AccountId, AccountSeed, LedgerError, OwnerId, Version};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Wraps an `InMemoryAccountStore` and injects failures
///
/// - the next `contended_pair_locks` calls to `with_ordered_lock` fail with
///   `LockTimeout` before touching anything
/// - `with_lock` on any id in `broken_accounts` fails with a storage error
#[derive(Debug, Default)]
pub(crate) struct FaultyStore {
    pub inner: InMemoryAccountStore,
    pub contended_pair_locks: AtomicU32,
    pub pair_lock_calls: AtomicU32,
    pub broken_accounts: HashSet<AccountId>,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self {
            inner: InMemoryAccountStore::with_lock_timeout(Duration::from_secs(5)),
            ..Self::default()
        }
    }

    pub fn contended(self, failures: u32) -> Self {
        self.contended_pair_locks.store(failures, Ordering::SeqCst);
        self
    }

    pub fn broken(mut self, ids: &[AccountId]) -> Self {
        self.broken_accounts.extend(ids.iter().copied());
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl AccountStore for FaultyStore {
    fn insert(&self, seed: AccountSeed) -> Result<Account, LedgerError> {
        self.inner.insert(seed)
    }

    fn close_account(&self, owner: OwnerId) -> Result<Account, LedgerError> {
        self.inner.close_account(owner)
    }

    fn account_id(&self, owner: OwnerId) -> Result<AccountId, LedgerError> {
        self.inner.account_id(owner)
    }

    fn account_ids(&self) -> Vec<AccountId> {
        self.inner.account_ids()
    }

    fn get(&self, id: AccountId) -> Result<Account, LedgerError> {
        self.inner.get(id)
    }

    fn get_by_owner(&self, owner: OwnerId) -> Result<Account, LedgerError> {
        self.inner.get_by_owner(owner)
    }

    fn get_all(&self) -> Box<dyn Iterator<Item = Account> + '_> {
        self.inner.get_all()
    }

    fn compare_and_save(
        &self,
        account: &Account,
        expected_version: Version,
    ) -> Result<Account, LedgerError> {
        self.inner.compare_and_save(account, expected_version)
    }

    fn with_lock<F, R>(&self, id: AccountId, f: F) -> Result<R, LedgerError>
    where
        F: FnOnce(&mut Account) -> Result<R, LedgerError>,
    {
        if self.broken_accounts.contains(&id) {
            return Err(LedgerError::storage("injected write failure"));
        }
        self.inner.with_lock(id, f)
    }

    fn with_ordered_lock<F, R>(&self, a: AccountId, b: AccountId, f: F) -> Result<R, LedgerError>
    where
        F: FnOnce(&mut Account, &mut Account) -> Result<R, LedgerError>,
    {
        self.pair_lock_calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.contended_pair_locks.load(Ordering::SeqCst);
        if remaining > 0 {
            self.contended_pair_locks
                .store(remaining - 1, Ordering::SeqCst);
            return Err(LedgerError::LockTimeout { account: a.min(b) });
        }
        self.inner.with_ordered_lock(a, b, f)
    }
}
