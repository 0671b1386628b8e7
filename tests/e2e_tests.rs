//! End-to-end integration tests
//!
//! These tests validate the complete ledger pipeline using predefined CSV
//! fixtures. Each test:
//! 1. Seeds the store from accounts.csv in a fixture directory
//! 2. Applies transfers.csv when the fixture has one
//! 3. Runs the requested number of accrual passes
//! 4. Compares the account CSV output with expected.csv
//!
//! Fixtures live in tests/fixtures/ and only contain scenarios whose result
//! does not depend on the interleaving of different senders, so each one is
//! run with both the sequential and the concurrent strategy.

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use rust_ledger_engine::cli::StrategyType;
    use rust_ledger_engine::strategy::{create_strategy, BatchConfig, PipelineConfig};
    use std::fs;
    use std::io::Write;
    use std::path::Path;
    use tempfile::NamedTempFile;

    /// Run a fixture and compare its output with expected.csv
    ///
    /// # Arguments
    ///
    /// * `fixture_name` - Name of the fixture directory (e.g., "happy_path")
    /// * `accrual_passes` - Accrual passes to run after the transfers
    /// * `strategy_type` - Processing strategy to use (Sync or Async)
    fn run_test_fixture(fixture_name: &str, accrual_passes: usize, strategy_type: StrategyType) {
        let fixture_dir = format!("tests/fixtures/{}", fixture_name);
        let accounts_path = format!("{}/accounts.csv", fixture_dir);
        let transfers_path = format!("{}/transfers.csv", fixture_dir);
        let expected_path = format!("{}/expected.csv", fixture_dir);

        assert!(
            Path::new(&accounts_path).exists(),
            "Accounts file not found: {}",
            accounts_path
        );
        assert!(
            Path::new(&expected_path).exists(),
            "Expected file not found: {}",
            expected_path
        );
        let transfers = Some(Path::new(&transfers_path)).filter(|path| path.exists());

        let pipeline = PipelineConfig {
            accrual_passes,
            ..PipelineConfig::default()
        };
        // Small batches so fixtures span several of them
        let strategy = create_strategy(strategy_type.clone(), pipeline, Some(BatchConfig::new(2, 4)));

        let mut temp_output = NamedTempFile::new().expect("Failed to create temp file");
        strategy
            .process(Path::new(&accounts_path), transfers, &mut temp_output)
            .unwrap_or_else(|e| panic!("Failed to process ledger: {}", e));
        temp_output.flush().expect("Failed to flush temp file");

        let actual_output = fs::read_to_string(temp_output.path())
            .unwrap_or_else(|e| panic!("Failed to read temp output file: {}", e));
        let expected_output = fs::read_to_string(&expected_path)
            .unwrap_or_else(|e| panic!("Failed to read expected file {}: {}", expected_path, e));

        assert_eq!(
            actual_output, expected_output,
            "\n\nOutput mismatch for fixture: {} (strategy: {:?})\n\nActual output:\n{}\n\nExpected output:\n{}\n",
            fixture_name, strategy_type, actual_output, expected_output
        );
    }

    /// End-to-end test for all fixtures with both strategies
    #[rstest]
    #[case("accounts_only", 0)]
    #[case("happy_path", 0)]
    #[case("insufficient_funds", 0)]
    #[case("invalid_transfers", 0)]
    #[case("malformed_accounts", 0)]
    #[case("accrual_cap", 6)]
    #[case("transfers_then_accrual", 1)]
    fn test_fixtures(
        #[case] fixture: &str,
        #[case] accrual_passes: usize,
        #[values(StrategyType::Sync, StrategyType::Async)] strategy: StrategyType,
    ) {
        run_test_fixture(fixture, accrual_passes, strategy);
    }

    #[rstest]
    fn test_missing_accounts_file_is_fatal(
        #[values(StrategyType::Sync, StrategyType::Async)] strategy: StrategyType,
    ) {
        let strategy = create_strategy(strategy, PipelineConfig::default(), None);
        let mut output = Vec::new();

        let result = strategy.process(Path::new("tests/fixtures/missing/accounts.csv"), None, &mut output);

        assert!(result.is_err());
        assert!(output.is_empty());
    }
}
