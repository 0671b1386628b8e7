//! Balance invariants shared by transfers and accrual
//!
//! These checks run inline at every mutation site before a write is handed to
//! the store:
//!
//! - balances are never negative (rejected)
//! - accrual never takes a balance above `initial_deposit * cap_ratio`
//!   (clamped, not rejected)
//! - a transfer debits and credits the same amount (both sides are computed
//!   here together, so a one-sided delta cannot be expressed)
//!
//! All money is kept at 2 fractional digits.

use crate::config::AccrualConfig;
use crate::types::{Account, LedgerError};
use rust_decimal::{Decimal, RoundingStrategy};

/// Fractional digits carried by every balance
pub const MONEY_SCALE: u32 = 2;

/// Round a computed amount to money precision (half away from zero)
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Check that an amount is representable as money: at most 2 fractional digits
pub fn is_money(value: Decimal) -> bool {
    value.normalize().scale() <= MONEY_SCALE
}

/// Validate a requested transfer amount
pub fn validate_amount(amount: Decimal) -> Result<(), LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::invalid_argument(
            "Transfer amount must be positive",
        ));
    }
    if !is_money(amount) {
        return Err(LedgerError::invalid_argument(
            "Transfer amount must have at most 2 decimal places",
        ));
    }
    Ok(())
}

/// Validate an initial deposit or restored balance
pub fn validate_deposit(value: Decimal, what: &str) -> Result<(), LedgerError> {
    if value < Decimal::ZERO {
        return Err(LedgerError::invalid_argument(&format!(
            "{what} must not be negative"
        )));
    }
    if !is_money(value) {
        return Err(LedgerError::invalid_argument(&format!(
            "{what} must have at most 2 decimal places"
        )));
    }
    Ok(())
}

/// Reject a working copy whose balance went negative
pub fn ensure_non_negative(account: &Account) -> Result<(), LedgerError> {
    if account.balance() < Decimal::ZERO {
        return Err(LedgerError::NegativeBalance {
            account: account.id(),
            balance: account.balance(),
        });
    }
    Ok(())
}

/// Maximum balance accrual may produce for an account
///
/// Rounded toward zero so the committed cap never exceeds the exact product.
pub fn balance_cap(account: &Account, cap_ratio: Decimal) -> Result<Decimal, LedgerError> {
    account
        .initial_deposit()
        .checked_mul(cap_ratio)
        .map(|cap| cap.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::ToZero))
        .ok_or_else(|| LedgerError::arithmetic_overflow("cap", account.id()))
}

/// Balance an account should hold after one accrual step
///
/// `min(round(balance * growth_factor), cap)`. Equal to the current balance
/// once the account sits at its cap, which makes further passes no-ops.
pub fn accrued_balance(account: &Account, config: &AccrualConfig) -> Result<Decimal, LedgerError> {
    let cap = balance_cap(account, config.cap_ratio)?;
    let candidate = account
        .balance()
        .checked_mul(config.growth_factor)
        .map(round_money)
        .ok_or_else(|| LedgerError::arithmetic_overflow("accrual", account.id()))?;

    Ok(candidate.min(cap))
}

/// Apply a transfer to working copies of both accounts
///
/// Re-validates funds against the balances passed in (which must be the ones
/// read under lock), then debits and credits together. On error neither copy
/// is modified.
pub fn apply_transfer(
    sender: &mut Account,
    receiver: &mut Account,
    amount: Decimal,
) -> Result<(), LedgerError> {
    if sender.balance() < amount {
        return Err(LedgerError::insufficient_funds(
            sender.owner(),
            sender.balance(),
            amount,
        ));
    }

    let debited = sender
        .balance()
        .checked_sub(amount)
        .ok_or_else(|| LedgerError::arithmetic_overflow("transfer debit", sender.id()))?;
    let credited = receiver
        .balance()
        .checked_add(amount)
        .ok_or_else(|| LedgerError::arithmetic_overflow("transfer credit", receiver.id()))?;

    sender.set_balance(debited);
    receiver.set_balance(credited);

    ensure_non_negative(sender)?;
    ensure_non_negative(receiver)
}
