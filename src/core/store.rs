//! Thread-safe in-memory account store
//!
//! This module provides `InMemoryAccountStore`, the reference `AccountStore`.
//!
//! # Design
//!
//! Records live in a `DashMap` keyed by account id. Each record pairs the
//! authoritative state behind a `parking_lot::Mutex` with a published copy
//! behind a `parking_lot::RwLock` (shared through an `Arc` so the map shard
//! lock is never held while waiting on a record). Updates take the mutex and
//! refresh the published copy when they commit; point reads only clone the
//! published copy and never wait on the mutex. A second `DashMap` indexes
//! account ids by owner. Mutex waits use `try_lock_for`, which bounds every
//! blocking path.
//!
//! # Lock order
//!
//! - Record mutexes are acquired in ascending account id order.
//! - The published copy is write-locked only while its record mutex is held.
//! - Map shard guards are never held while waiting on a record mutex.
//! - A map shard may be touched while holding a record mutex (presence checks,
//!   removal), never the other way round.

use super::guard::{ensure_non_negative, validate_deposit};
use super::traits::AccountStore;
use crate::config::DEFAULT_LOCK_TIMEOUT;
use crate::types::{Account, AccountId, AccountSeed, LedgerError, OwnerId, Version};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Debug)]
struct Record {
    state: Mutex<Account>,
    published: RwLock<Account>,
}

impl Record {
    fn new(account: Account) -> Self {
        Self {
            published: RwLock::new(account.clone()),
            state: Mutex::new(account),
        }
    }

    /// Last committed copy
    fn read(&self) -> Account {
        self.published.read().clone()
    }

    /// Replace the stored state; only call after `check_commit` succeeded
    fn write(&self, stored: &mut Account, mut working: Account) {
        working.bump_version();
        *self.published.write() = working.clone();
        *stored = working;
    }
}

type SharedRecord = Arc<Record>;

/// Concurrent keyed account storage with per-record locks
#[derive(Debug)]
pub struct InMemoryAccountStore {
    records: DashMap<AccountId, SharedRecord>,
    owners: DashMap<OwnerId, AccountId>,
    next_id: AtomicU64,
    lock_timeout: Duration,
}

impl InMemoryAccountStore {
    /// Create an empty store with the default lock timeout
    pub fn new() -> Self {
        Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT)
    }

    /// Create an empty store whose lock waits give up after `lock_timeout`
    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            records: DashMap::new(),
            owners: DashMap::new(),
            next_id: AtomicU64::new(1),
            lock_timeout,
        }
    }

    /// Number of accounts currently stored
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Consistent copy of every account
    ///
    /// Locks all records in ascending id order, so the result reflects a
    /// single point in time: no transfer is ever seen half-applied.
    pub fn snapshot(&self) -> Result<Vec<Account>, LedgerError> {
        let records: Vec<(AccountId, SharedRecord)> = self
            .account_ids()
            .into_iter()
            .filter_map(|id| self.record(id).ok().map(|record| (id, record)))
            .collect();

        let mut guards = Vec::with_capacity(records.len());
        for (id, record) in &records {
            guards.push(self.lock(*id, record)?);
        }

        Ok(guards
            .iter()
            .filter(|guard| self.records.contains_key(&guard.id()))
            .map(|guard| (**guard).clone())
            .collect())
    }

    fn record(&self, id: AccountId) -> Result<SharedRecord, LedgerError> {
        self.records
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(LedgerError::RecordNotFound { account: id })
    }

    fn lock<'a>(
        &self,
        id: AccountId,
        record: &'a Record,
    ) -> Result<MutexGuard<'a, Account>, LedgerError> {
        record.state.try_lock_for(self.lock_timeout).ok_or_else(|| {
            debug!(account = id, "Record lock wait timed out");
            LedgerError::LockTimeout { account: id }
        })
    }

    /// A record can be removed between fetching its handle and locking it
    fn ensure_present(&self, id: AccountId) -> Result<(), LedgerError> {
        if self.records.contains_key(&id) {
            Ok(())
        } else {
            Err(LedgerError::RecordNotFound { account: id })
        }
    }
}

impl Default for InMemoryAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Check that a working copy may replace the stored record
fn check_commit(stored: &Account, working: &Account, expected: Version) -> Result<(), LedgerError> {
    if working.id() != stored.id() {
        return Err(LedgerError::storage(&format!(
            "working copy of account {} cannot replace account {}",
            working.id(),
            stored.id()
        )));
    }
    if stored.version() != expected {
        return Err(LedgerError::version_conflict(
            stored.id(),
            expected,
            stored.version(),
        ));
    }
    ensure_non_negative(working)
}

impl AccountStore for InMemoryAccountStore {
    fn insert(&self, seed: AccountSeed) -> Result<Account, LedgerError> {
        validate_deposit(seed.initial_deposit, "Initial deposit")?;
        validate_deposit(seed.balance, "Balance")?;

        match self.owners.entry(seed.owner) {
            Entry::Occupied(_) => Err(LedgerError::DuplicateOwner { owner: seed.owner }),
            Entry::Vacant(vacant) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let account = Account::new(id, seed.owner, seed.initial_deposit, seed.balance);
                self.records
                    .insert(id, Arc::new(Record::new(account.clone())));
                vacant.insert(id);
                debug!(account = id, owner = seed.owner, "Account opened");
                Ok(account)
            }
        }
    }

    fn close_account(&self, owner: OwnerId) -> Result<Account, LedgerError> {
        let id = self.account_id(owner)?;
        let record = self
            .record(id)
            .map_err(|_| LedgerError::AccountNotFound { owner })?;

        let guard = self.lock(id, &record)?;
        if self.records.remove(&id).is_none() {
            return Err(LedgerError::AccountNotFound { owner });
        }
        self.owners.remove(&owner);
        debug!(account = id, owner, "Account closed");

        Ok(guard.clone())
    }

    fn account_id(&self, owner: OwnerId) -> Result<AccountId, LedgerError> {
        self.owners
            .get(&owner)
            .map(|entry| *entry.value())
            .ok_or(LedgerError::AccountNotFound { owner })
    }

    fn account_ids(&self) -> Vec<AccountId> {
        let mut ids: Vec<AccountId> = self.records.iter().map(|entry| *entry.key()).collect();
        ids.sort_unstable();
        ids
    }

    fn get(&self, id: AccountId) -> Result<Account, LedgerError> {
        Ok(self.record(id)?.read())
    }

    fn get_by_owner(&self, owner: OwnerId) -> Result<Account, LedgerError> {
        let id = self.account_id(owner)?;

        self.get(id).map_err(|e| match e {
            LedgerError::RecordNotFound { .. } => LedgerError::AccountNotFound { owner },
            other => other,
        })
    }

    fn get_all(&self) -> Box<dyn Iterator<Item = Account> + '_> {
        // `record` only fails for ids closed since enumeration
        Box::new(
            self.account_ids()
                .into_iter()
                .filter_map(move |id| self.record(id).ok().map(|record| record.read())),
        )
    }

    fn compare_and_save(
        &self,
        account: &Account,
        expected_version: Version,
    ) -> Result<Account, LedgerError> {
        let record = self.record(account.id())?;
        let mut guard = self.lock(account.id(), &record)?;
        self.ensure_present(account.id())?;

        check_commit(&guard, account, expected_version)?;
        record.write(&mut guard, account.clone());

        Ok(guard.clone())
    }

    fn with_lock<F, R>(&self, id: AccountId, f: F) -> Result<R, LedgerError>
    where
        F: FnOnce(&mut Account) -> Result<R, LedgerError>,
    {
        let record = self.record(id)?;
        let mut guard = self.lock(id, &record)?;
        self.ensure_present(id)?;

        let expected = guard.version();
        let mut working = guard.clone();
        let result = f(&mut working)?;
        if working == *guard {
            return Ok(result);
        }

        check_commit(&guard, &working, expected)?;
        record.write(&mut guard, working);

        Ok(result)
    }

    fn with_ordered_lock<F, R>(&self, a: AccountId, b: AccountId, f: F) -> Result<R, LedgerError>
    where
        F: FnOnce(&mut Account, &mut Account) -> Result<R, LedgerError>,
    {
        if a == b {
            return Err(LedgerError::invalid_argument(
                "Cannot lock the same account twice",
            ));
        }

        let record_a = self.record(a)?;
        let record_b = self.record(b)?;

        // Ascending id order, whatever order the caller named them in
        let (mut guard_a, mut guard_b) = if a < b {
            let guard_a = self.lock(a, &record_a)?;
            let guard_b = self.lock(b, &record_b)?;
            (guard_a, guard_b)
        } else {
            let guard_b = self.lock(b, &record_b)?;
            let guard_a = self.lock(a, &record_a)?;
            (guard_a, guard_b)
        };
        self.ensure_present(a)?;
        self.ensure_present(b)?;

        let (expected_a, expected_b) = (guard_a.version(), guard_b.version());
        let mut working_a = guard_a.clone();
        let mut working_b = guard_b.clone();
        let result = f(&mut working_a, &mut working_b)?;

        // Validate both before writing either
        check_commit(&guard_a, &working_a, expected_a)?;
        check_commit(&guard_b, &working_b, expected_b)?;
        record_a.write(&mut guard_a, working_a);
        record_b.write(&mut guard_b, working_b);

        Ok(result)
    }
}
