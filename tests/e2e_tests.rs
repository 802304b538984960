//! End-to-end integration tests
//!
//! These tests validate the complete replay pipeline using predefined CSV
//! fixtures. Each test:
//! 1. Reads input.csv from a fixture directory
//! 2. Replays all operations against a fresh ledger
//! 3. Generates output CSV
//! 4. Compares actual output with expected.csv
//!
//! Test fixtures are located in tests/fixtures/ and cover:
//! - Happy path transfers and alias transfers
//! - Debit and credit card purchases with invoice payment
//! - Account rules (blocking, deactivation, limits, duplicates)
//! - Step-up authorization and alias resolution failures
//! - Malformed rows (unknown types, bad amounts, bad references)
//!
//! Each test is run twice: once with the sequential strategy and once with the
//! concurrent one.

#[cfg(test)]
mod tests {
    use bank_ledger::cli::StrategyType;
    use bank_ledger::core::LedgerConfig;
    use bank_ledger::strategy::{create_strategy, BatchConfig};
    use rstest::rstest;
    use std::fs;
    use std::io::Write;
    use std::path::Path;
    use tempfile::NamedTempFile;

    /// Replay tests/fixtures/{fixture_name}/input.csv and compare with expected.csv
    ///
    /// # Panics
    ///
    /// Panics if the fixture files cannot be read or the output differs.
    fn run_test_fixture(
        fixture_name: &str,
        strategy_type: StrategyType,
        batch: Option<BatchConfig>,
    ) {
        let fixture_dir = format!("tests/fixtures/{}", fixture_name);
        let input_path = format!("{}/input.csv", fixture_dir);
        let expected_path = format!("{}/expected.csv", fixture_dir);

        assert!(
            Path::new(&input_path).exists(),
            "Input file not found: {}",
            input_path
        );

        let strategy = create_strategy(strategy_type.clone(), batch, LedgerConfig::default());
        let mut temp_output = NamedTempFile::new().expect("Failed to create temp file");

        strategy
            .process(Path::new(&input_path), &mut temp_output)
            .unwrap_or_else(|e| panic!("Failed to replay operations: {}", e));
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

    #[rstest]
    #[case("happy_path")]
    #[case("card_purchases")]
    #[case("account_rules")]
    #[case("step_up_and_pix")]
    #[case("malformed_data")]
    fn test_fixtures(
        #[case] fixture: &str,
        #[values(StrategyType::Sync, StrategyType::Async)] strategy: StrategyType,
    ) {
        run_test_fixture(fixture, strategy, None);
    }

    /// Tiny batches and waves must not change the outcome
    #[rstest]
    #[case("happy_path")]
    #[case("card_purchases")]
    #[case("account_rules")]
    #[case("step_up_and_pix")]
    fn test_fixtures_with_small_batches(#[case] fixture: &str) {
        run_test_fixture(fixture, StrategyType::Async, Some(BatchConfig::new(3, 2)));
    }

    #[rstest]
    fn test_missing_input_file_is_an_error(
        #[values(StrategyType::Sync, StrategyType::Async)] strategy: StrategyType,
    ) {
        let strategy = create_strategy(strategy, None, LedgerConfig::default());
        let mut output = Vec::new();

        assert!(strategy
            .process(Path::new("tests/fixtures/does_not_exist.csv"), &mut output)
            .is_err());
    }
}
