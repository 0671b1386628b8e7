use crate::config::{AccrualConfig, LedgerConfig, RetryPolicy, DEFAULT_LOCK_TIMEOUT};
use crate::strategy::{BatchConfig, PipelineConfig};
use clap::{Parser, ValueEnum};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::time::Duration;

/// Replay a ledger: seed accounts, apply transfers, accrue balances
#[derive(Parser, Debug)]
#[command(name = "ledger-engine")]
#[command(about = "Replay account transfers and bounded balance accrual", long_about = None)]
pub struct CliArgs {
    /// CSV file with `owner,initial_deposit[,balance]` rows
    #[arg(value_name = "ACCOUNTS", help = "Path to the accounts CSV file")]
    pub accounts_file: PathBuf,

    /// CSV file with `from,to,amount` rows
    #[arg(
        long = "transfers",
        value_name = "FILE",
        help = "Path to a transfers CSV file to apply"
    )]
    pub transfers_file: Option<PathBuf>,

    /// Processing strategy
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "async",
        help = "Processing strategy: 'sync' applies transfers in file order, 'async' in concurrent batches"
    )]
    pub strategy: StrategyType,

    /// Number of transfers per batch (async mode only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of transfers per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Number of worker threads (async mode only)
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Number of worker threads (default: CPU cores)"
    )]
    pub max_concurrent_batches: Option<usize>,

    /// Accrual passes to run after the transfers
    #[arg(long = "accrual-passes", value_name = "N", default_value_t = 0)]
    pub accrual_passes: usize,

    /// Run the accrual scheduler in the background at this period (async mode only)
    #[arg(
        long = "accrual-interval-ms",
        value_name = "MILLIS",
        env = "LEDGER_ACCRUAL_INTERVAL_MS"
    )]
    pub accrual_interval_ms: Option<u64>,

    /// Multiplier applied per accrual pass
    #[arg(
        long = "growth-factor",
        value_name = "FACTOR",
        env = "LEDGER_GROWTH_FACTOR",
        default_value = "1.10"
    )]
    pub growth_factor: Decimal,

    /// Balance cap as a multiple of the initial deposit
    #[arg(
        long = "cap-ratio",
        value_name = "RATIO",
        env = "LEDGER_CAP_RATIO",
        default_value = "2.07"
    )]
    pub cap_ratio: Decimal,

    /// Bounded wait for a single account lock
    #[arg(long = "lock-timeout-ms", value_name = "MILLIS")]
    pub lock_timeout_ms: Option<u64>,

    /// Attempts per transfer under contention
    #[arg(long = "max-attempts", value_name = "COUNT")]
    pub max_attempts: Option<u32>,
}

/// Available processing strategies
#[derive(Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

impl CliArgs {
    /// Create a BatchConfig from CLI arguments
    ///
    /// Missing values use the defaults; invalid ones fall back with a warning.
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_some() || self.max_concurrent_batches.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.max_concurrent_batches
                    .unwrap_or(default.max_concurrent_batches),
            )
        } else {
            BatchConfig::default()
        }
    }

    /// Build the ledger configuration from CLI arguments and environment
    pub fn to_ledger_config(&self) -> LedgerConfig {
        let accrual_defaults = AccrualConfig::default();
        let interval = self
            .accrual_interval_ms
            .map_or(accrual_defaults.interval, Duration::from_millis);
        let accrual = AccrualConfig::new(self.growth_factor, self.cap_ratio, interval);

        let retry_defaults = RetryPolicy::default();
        let retry = RetryPolicy::new(
            self.max_attempts.unwrap_or(retry_defaults.max_attempts),
            retry_defaults.initial_backoff,
            retry_defaults.max_backoff,
        );

        let lock_timeout = self
            .lock_timeout_ms
            .map_or(DEFAULT_LOCK_TIMEOUT, Duration::from_millis);

        LedgerConfig::new(accrual, retry, lock_timeout)
    }

    /// Build the pipeline configuration from CLI arguments
    pub fn to_pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            ledger: self.to_ledger_config(),
            accrual_passes: self.accrual_passes,
            background_accrual: self.accrual_interval_ms.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    // Strategy parsing tests
    #[rstest]
    #[case::default_strategy(&["program", "accounts.csv"], StrategyType::Async)]
    #[case::explicit_sync(&["program", "--strategy", "sync", "accounts.csv"], StrategyType::Sync)]
    #[case::explicit_async(&["program", "--strategy", "async", "accounts.csv"], StrategyType::Async)]
    fn test_strategy_parsing(#[case] args: &[&str], #[case] expected: StrategyType) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert_eq!(parsed.strategy, expected);
    }

    #[rstest]
    #[case::no_options(&["program", "accounts.csv"], None, 0)]
    #[case::transfers(&["program", "--transfers", "t.csv", "accounts.csv"], Some("t.csv"), 0)]
    #[case::passes(&["program", "--accrual-passes", "3", "accounts.csv"], None, 3)]
    fn test_input_options(
        #[case] args: &[&str],
        #[case] transfers: Option<&str>,
        #[case] passes: usize,
    ) {
        let parsed = CliArgs::try_parse_from(args).unwrap();

        assert_eq!(parsed.accounts_file, PathBuf::from("accounts.csv"));
        assert_eq!(parsed.transfers_file, transfers.map(PathBuf::from));
        assert_eq!(parsed.accrual_passes, passes);
    }

    // BatchConfig conversion tests
    #[rstest]
    #[case::all_defaults(&["program", "accounts.csv"], 1000, num_cpus::get())]
    #[case::custom_batch_size(&["program", "--batch-size", "2000", "accounts.csv"], 2000, num_cpus::get())]
    #[case::custom_max_concurrent(&["program", "--max-concurrent", "8", "accounts.csv"], 1000, 8)]
    #[case::zero_batch_size(&["program", "--batch-size", "0", "accounts.csv"], 1000, num_cpus::get())]
    fn test_batch_config_conversion(
        #[case] args: &[&str],
        #[case] expected_batch_size: usize,
        #[case] expected_max_concurrent: usize,
    ) {
        let config = CliArgs::try_parse_from(args).unwrap().to_batch_config();

        assert_eq!(config.batch_size, expected_batch_size);
        assert_eq!(config.max_concurrent_batches, expected_max_concurrent);
    }

    #[test]
    fn test_ledger_config_defaults() {
        let parsed = CliArgs::try_parse_from(["program", "accounts.csv"]).unwrap();

        // Holds unless LEDGER_* variables are set in the test environment
        if std::env::vars().any(|(key, _)| key.starts_with("LEDGER_")) {
            return;
        }
        assert_eq!(parsed.to_ledger_config(), LedgerConfig::default());
        assert!(!parsed.to_pipeline_config().background_accrual);
    }

    #[test]
    fn test_ledger_config_from_flags() {
        let parsed = CliArgs::try_parse_from([
            "program",
            "--growth-factor",
            "1.5",
            "--cap-ratio",
            "3",
            "--accrual-interval-ms",
            "250",
            "--lock-timeout-ms",
            "40",
            "--max-attempts",
            "2",
            "accounts.csv",
        ])
        .unwrap();

        let pipeline = parsed.to_pipeline_config();

        assert_eq!(pipeline.ledger.accrual.growth_factor, Decimal::new(15, 1));
        assert_eq!(pipeline.ledger.accrual.cap_ratio, Decimal::new(3, 0));
        assert_eq!(pipeline.ledger.accrual.interval, Duration::from_millis(250));
        assert_eq!(pipeline.ledger.lock_timeout, Duration::from_millis(40));
        assert_eq!(pipeline.ledger.retry.max_attempts, 2);
        assert!(pipeline.background_accrual);
    }

    #[rstest]
    #[case::shrinking_growth(&["program", "--growth-factor", "0.5", "accounts.csv"])]
    #[case::zero_cap(&["program", "--cap-ratio", "0", "accounts.csv"])]
    fn test_invalid_accrual_values_fall_back(#[case] args: &[&str]) {
        let parsed = CliArgs::try_parse_from(args).unwrap();

        let accrual = parsed.to_ledger_config().accrual;

        assert!(accrual.growth_factor >= Decimal::ONE);
        assert!(accrual.cap_ratio > Decimal::ZERO);
    }

    // Error handling tests
    #[rstest]
    #[case::missing_accounts(&["program"])]
    #[case::invalid_strategy(&["program", "--strategy", "invalid", "accounts.csv"])]
    #[case::invalid_factor(&["program", "--growth-factor", "fast", "accounts.csv"])]
    fn test_parsing_errors(#[case] args: &[&str]) {
        let result = CliArgs::try_parse_from(args);
        assert!(result.is_err());
    }
}
