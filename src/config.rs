//! Process-wide ledger configuration
//!
//! Holds the accrual constants, the retry policy used under lock contention
//! and the bounded lock wait. Every value has a documented default; the
//! validating constructors fall back to that default (with a warning) rather
//! than fail, so a bad flag never prevents the ledger from starting.

use rust_decimal::Decimal;
use std::time::Duration;
use tracing::warn;

/// Default growth applied per accrual pass (10%)
pub const DEFAULT_GROWTH_FACTOR: Decimal = Decimal::from_parts(110, 0, 0, false, 2);

/// Default ceiling as a multiple of the initial deposit (207%)
pub const DEFAULT_CAP_RATIO: Decimal = Decimal::from_parts(207, 0, 0, false, 2);

/// Default period between accrual passes
pub const DEFAULT_ACCRUAL_INTERVAL: Duration = Duration::from_secs(30);

/// Default bounded wait for a single record lock
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(250);

/// Configuration for the periodic accrual job
#[derive(Debug, Clone, PartialEq)]
pub struct AccrualConfig {
    /// Multiplier applied to the balance on each pass, before capping
    pub growth_factor: Decimal,
    /// Multiplier applied to the initial deposit to obtain the cap
    pub cap_ratio: Decimal,
    /// Time between passes
    pub interval: Duration,
}

impl Default for AccrualConfig {
    fn default() -> Self {
        Self {
            growth_factor: DEFAULT_GROWTH_FACTOR,
            cap_ratio: DEFAULT_CAP_RATIO,
            interval: DEFAULT_ACCRUAL_INTERVAL,
        }
    }
}

impl AccrualConfig {
    /// Create a new AccrualConfig with custom values
    ///
    /// A growth factor below 1, a non-positive cap ratio or a zero interval
    /// is replaced by its default.
    pub fn new(growth_factor: Decimal, cap_ratio: Decimal, interval: Duration) -> Self {
        let default = Self::default();

        let growth_factor = if growth_factor < Decimal::ONE {
            warn!(
                %growth_factor,
                default = %default.growth_factor,
                "Invalid growth factor, using default"
            );
            default.growth_factor
        } else {
            growth_factor
        };

        let cap_ratio = if cap_ratio <= Decimal::ZERO {
            warn!(%cap_ratio, default = %default.cap_ratio, "Invalid cap ratio, using default");
            default.cap_ratio
        } else {
            cap_ratio
        };

        let interval = if interval.is_zero() {
            warn!(
                default_ms = default.interval.as_millis() as u64,
                "Invalid accrual interval (0), using default"
            );
            default.interval
        } else {
            interval
        };

        Self {
            growth_factor,
            cap_ratio,
            interval,
        }
    }
}

/// Bounded retry with exponential backoff for transient contention
///
/// Attempt `n` (0-based) that fails transiently waits
/// `min(initial_backoff * 2^n, max_backoff)` before the next one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// Create a new RetryPolicy; zero attempts falls back to the default
    pub fn new(max_attempts: u32, initial_backoff: Duration, max_backoff: Duration) -> Self {
        let max_attempts = if max_attempts == 0 {
            let default = Self::default().max_attempts;
            warn!(default, "Invalid max_attempts (0), using default");
            default
        } else {
            max_attempts
        };

        Self {
            max_attempts,
            initial_backoff,
            max_backoff: max_backoff.max(initial_backoff),
        }
    }

    /// Delay to wait after the given failed attempt (0-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial_backoff
            .checked_mul(factor)
            .map_or(self.max_backoff, |delay| delay.min(self.max_backoff))
    }
}

/// Complete ledger configuration
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerConfig {
    pub accrual: AccrualConfig,
    pub retry: RetryPolicy,
    /// Maximum time to wait for any single record lock
    pub lock_timeout: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            accrual: AccrualConfig::default(),
            retry: RetryPolicy::default(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }
}

impl LedgerConfig {
    pub fn new(accrual: AccrualConfig, retry: RetryPolicy, lock_timeout: Duration) -> Self {
        let lock_timeout = if lock_timeout.is_zero() {
            warn!(
                default_ms = DEFAULT_LOCK_TIMEOUT.as_millis() as u64,
                "Invalid lock timeout (0), using default"
            );
            DEFAULT_LOCK_TIMEOUT
        } else {
            lock_timeout
        };

        Self {
            accrual,
            retry,
            lock_timeout,
        }
    }
}
