//! Two-account balance movement
//!
//! This module provides `TransferEngine`, which moves funds between the
//! accounts of two owners as a single atomic, conservation-preserving step.
//!
//! # Algorithm
//!
//! 1. Validate the request (distinct owners, positive 2-digit amount).
//! 2. Resolve both owners to account ids through the owner index.
//! 3. Enter `with_ordered_lock` on the two ids. This is the serialization
//!    point: transfers sharing an account run one after another, transfers on
//!    disjoint pairs run in parallel.
//! 4. Under the locks, re-read balances, re-check funds, debit and credit,
//!    and let the store commit both records together.
//! 5. On transient contention (lock timeout, version conflict) back off and
//!    retry from step 3, up to the policy's attempt limit.
//!
//! Either both balances change or neither does.

use super::guard::{apply_transfer, validate_amount};
use super::traits::AccountStore;
use crate::config::RetryPolicy;
use crate::types::{AccountId, LedgerError, OwnerId, TransferReceipt, TransferRecord};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::thread;
use tracing::{info, warn};

/// Executes transfers against a shared account store
///
/// Cheap to clone; clones share the same store.
#[derive(Debug)]
pub struct TransferEngine<S> {
    store: Arc<S>,
    retry: RetryPolicy,
}

impl<S> Clone for TransferEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            retry: self.retry.clone(),
        }
    }
}

impl<S: AccountStore> TransferEngine<S> {
    /// Create a new TransferEngine over `store`
    pub fn new(store: Arc<S>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Move `amount` from `from`'s account to `to`'s account
    ///
    /// # Returns
    ///
    /// * `Ok(TransferReceipt)` with both committed balances
    /// * `Err(InvalidArgument)` for a self-transfer or a bad amount
    /// * `Err(SenderNotFound)` / `Err(ReceiverNotFound)` for unknown owners
    /// * `Err(InsufficientFunds)` if the sender's balance, read under lock, is
    ///   below `amount`
    /// * `Err(Conflict)` when contention outlasted every retry
    /// * any storage error, unchanged
    ///
    /// Every error leaves both accounts untouched.
    pub fn transfer(
        &self,
        from: OwnerId,
        to: OwnerId,
        amount: Decimal,
    ) -> Result<TransferReceipt, LedgerError> {
        info!(%amount, from, to, "Initiating transfer");

        if from == to {
            return Err(LedgerError::invalid_argument(
                "Cannot transfer to the same user",
            ));
        }
        validate_amount(amount)?;

        // Ids only; balances are read under the pair lock
        let sender = self.store.account_id(from).map_err(|e| match e {
            LedgerError::AccountNotFound { .. } => LedgerError::SenderNotFound { owner: from },
            other => other,
        })?;
        let receiver = self.store.account_id(to).map_err(|e| match e {
            LedgerError::AccountNotFound { .. } => LedgerError::ReceiverNotFound { owner: to },
            other => other,
        })?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.commit(sender, receiver, amount) {
                Ok((sender_balance, receiver_balance)) => {
                    info!(%amount, from, to, attempts = attempt, "Transfer completed");
                    return Ok(TransferReceipt {
                        sender,
                        receiver,
                        sender_balance,
                        receiver_balance,
                        amount,
                        attempts: attempt,
                    });
                }
                Err(e) if e.is_transient() => {
                    if attempt >= self.retry.max_attempts {
                        warn!(from, to, attempts = attempt, error = %e, "Transfer gave up under contention");
                        return Err(LedgerError::Conflict { attempts: attempt });
                    }
                    let delay = self.retry.backoff(attempt - 1);
                    warn!(
                        from,
                        to,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transfer contended, retrying"
                    );
                    thread::sleep(delay);
                }
                Err(LedgerError::RecordNotFound { account }) => {
                    // Closed between resolution and locking
                    return Err(if account == sender {
                        LedgerError::SenderNotFound { owner: from }
                    } else {
                        LedgerError::ReceiverNotFound { owner: to }
                    });
                }
                Err(e @ LedgerError::InsufficientFunds { .. }) => {
                    warn!(from, %amount, "Insufficient funds");
                    return Err(e);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Apply a transfer described by a record
    pub fn process(&self, record: &TransferRecord) -> Result<TransferReceipt, LedgerError> {
        self.transfer(record.from, record.to, record.amount)
    }

    /// Current balance of an owner's account
    ///
    /// Reads the last committed copy; never waits on a transfer or accrual
    /// step holding the account's lock.
    pub fn get_balance(&self, owner: OwnerId) -> Result<Decimal, LedgerError> {
        self.store.get_by_owner(owner).map(|account| account.balance())
    }

    /// One locked attempt; returns the balances it committed
    fn commit(
        &self,
        sender: AccountId,
        receiver: AccountId,
        amount: Decimal,
    ) -> Result<(Decimal, Decimal), LedgerError> {
        self.store
            .with_ordered_lock(sender, receiver, |sender, receiver| {
                apply_transfer(sender, receiver, amount)?;
                Ok((sender.balance(), receiver.balance()))
            })
    }
}
