//! Periodic bounded growth of every account
//!
//! This module provides `AccrualScheduler`, which runs accrual passes over
//! the whole store, and `SchedulerHandle`, which owns the recurring tokio
//! task that triggers them.
//!
//! # Pass semantics
//!
//! Each account is updated in its own `with_lock` step:
//! `new = min(round(balance * growth_factor), initial_deposit * cap_ratio)`,
//! written only if it differs from the current balance. No store-wide lock is
//! ever held, so transfers interleave freely with a running pass and
//! serialize with it only on the account currently being updated.
//!
//! A failure on one account is logged and recorded in the pass report; the
//! pass moves on. The next pass picks the account up again.
//!
//! # Lifecycle
//!
//! ```text
//! AccrualScheduler::spawn ──► tokio task ──(every interval)──► spawn_blocking(pass)
//!        │                                                          │
//! SchedulerHandle::shutdown ──► CancellationToken ──(between accounts)┘
//! ```

use super::guard::accrued_balance;
use super::traits::AccountStore;
use crate::config::AccrualConfig;
use crate::types::{AccountId, LedgerError};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Outcome of one accrual pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccrualReport {
    /// Accounts the pass reached
    pub examined: usize,
    /// Accounts whose balance was written
    pub updated: usize,
    /// Accounts already at their fixed point (cap reached or zero balance)
    pub unchanged: usize,
    /// Accounts that could not be updated this pass
    pub failed: Vec<(AccountId, LedgerError)>,
    /// The pass was stopped before reaching every account
    pub interrupted: bool,
}

/// Applies bounded multiplicative growth to all accounts of a store
#[derive(Debug)]
pub struct AccrualScheduler<S> {
    store: Arc<S>,
    config: AccrualConfig,
}

impl<S> Clone for AccrualScheduler<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
        }
    }
}

impl<S: AccountStore> AccrualScheduler<S> {
    pub fn new(store: Arc<S>, config: AccrualConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &AccrualConfig {
        &self.config
    }

    /// Run one complete pass over every account
    pub fn run_accrual_pass(&self) -> AccrualReport {
        self.run_pass_until(&CancellationToken::new())
    }

    /// Run one pass, stopping between accounts once `cancel` fires
    pub fn run_pass_until(&self, cancel: &CancellationToken) -> AccrualReport {
        info!("Starting balance accrual pass");
        let mut report = AccrualReport::default();

        for id in self.store.account_ids() {
            if cancel.is_cancelled() {
                report.interrupted = true;
                break;
            }

            match self.accrue(id) {
                Ok(true) => report.updated += 1,
                Ok(false) => report.unchanged += 1,
                // Closed since the pass enumerated it
                Err(LedgerError::RecordNotFound { .. }) => continue,
                Err(e) => {
                    warn!(account = id, error = %e, "Accrual failed, will retry next pass");
                    report.failed.push((id, e));
                }
            }
            report.examined += 1;
        }

        info!(
            examined = report.examined,
            updated = report.updated,
            unchanged = report.unchanged,
            failed = report.failed.len(),
            interrupted = report.interrupted,
            "Balance accrual pass completed"
        );
        report
    }

    /// Accrue a single account under its record lock
    ///
    /// Returns whether a new balance was written.
    fn accrue(&self, id: AccountId) -> Result<bool, LedgerError> {
        let config = &self.config;
        let changed = self.store.with_lock(id, |account| {
            let new_balance = accrued_balance(account, config)?;
            if new_balance == account.balance() {
                return Ok(false);
            }
            debug!(account = id, from = %account.balance(), to = %new_balance, "Accruing balance");
            account.set_balance(new_balance);
            Ok(true)
        })?;

        Ok(changed)
    }
}

impl<S: AccountStore + 'static> AccrualScheduler<S> {
    /// Start the recurring accrual task on the current tokio runtime
    ///
    /// The first pass runs one full interval after start. Passes never
    /// overlap: a pass that outlasts the interval delays the next tick.
    pub fn spawn(self) -> SchedulerHandle {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            let mut ticker = interval(self.config.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            let mut passes = 0u64;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let scheduler = self.clone();
                let pass_token = token.clone();
                match tokio::task::spawn_blocking(move || scheduler.run_pass_until(&pass_token))
                    .await
                {
                    Ok(_) => passes += 1,
                    Err(e) => warn!(error = %e, "Accrual pass panicked"),
                }
            }

            info!(passes, "Accrual scheduler stopped");
            passes
        });

        SchedulerHandle { cancel, task }
    }
}

/// Owner of a running accrual task
///
/// Dropping the handle does not stop the task; call `shutdown`.
#[derive(Debug)]
pub struct SchedulerHandle {
    cancel: CancellationToken,
    task: JoinHandle<u64>,
}

impl SchedulerHandle {
    /// Stop the scheduler and wait for it to exit
    ///
    /// A pass in progress stops before its next account; no account is left
    /// half-updated. Returns the number of passes that ran.
    pub async fn shutdown(self) -> u64 {
        self.cancel.cancel();
        match self.task.await {
            Ok(passes) => passes,
            Err(e) => {
                warn!(error = %e, "Accrual scheduler task failed");
                0
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
