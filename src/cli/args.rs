use crate::core::{LedgerConfig, StepUpPolicy, TransferLimits};
use crate::strategy::BatchConfig;
use crate::types::Money;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Replay banking operations against a fresh ledger
#[derive(Parser, Debug)]
#[command(name = "bank-ledger")]
#[command(
    about = "Replay banking operations from CSV and print the final account states",
    long_about = None
)]
pub struct CliArgs {
    /// Input CSV file path containing operation records
    #[arg(value_name = "INPUT", help = "Path to the input CSV file")]
    pub input_file: PathBuf,

    /// Processing strategy to use for the replay
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "async",
        help = "Processing strategy: 'sync' for sequential or 'async' for concurrent waves"
    )]
    pub strategy: StrategyType,

    /// Number of records per batch (async mode only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of records read per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Worker threads of the async runtime (async mode only)
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Maximum number of operations running concurrently (default: CPU cores)"
    )]
    pub max_concurrent: Option<usize>,

    #[arg(long = "transfer-min", value_name = "AMOUNT", default_value = "10.00")]
    pub transfer_min: Money,

    /// Largest accepted branch/number transfer, unbounded when omitted
    #[arg(long = "transfer-max", value_name = "AMOUNT")]
    pub transfer_max: Option<Money>,

    #[arg(long = "step-up-threshold", value_name = "AMOUNT", default_value = "5000.00")]
    pub step_up_threshold: Money,

    /// Token required for transfers at or above the step-up threshold
    #[arg(
        long = "step-up-token",
        value_name = "TOKEN",
        env = "LEDGER_STEP_UP_TOKEN",
        default_value = "",
        hide_env_values = true
    )]
    pub step_up_token: String,

    #[arg(long = "lock-timeout-ms", value_name = "MILLIS", default_value_t = 5000)]
    pub lock_timeout_ms: u64,

    /// Log filter directive, for example `info` or `bank_ledger=debug`
    #[arg(
        long = "log-level",
        value_name = "FILTER",
        env = "LEDGER_LOG",
        default_value = "info"
    )]
    pub log_level: String,
}

/// Available processing strategies for replays
#[derive(Clone, Debug, PartialEq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

impl CliArgs {
    /// Create a BatchConfig from CLI arguments
    ///
    /// Missing values fall back to defaults; zero values are rejected by
    /// `BatchConfig::new` with a warning.
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_none() && self.max_concurrent.is_none() {
            return BatchConfig::default();
        }

        let default = BatchConfig::default();
        BatchConfig::new(
            self.batch_size.unwrap_or(default.batch_size),
            self.max_concurrent.unwrap_or(default.max_concurrent),
        )
    }

    /// Create the ledger policy from CLI arguments
    pub fn to_ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            transfer_limits: TransferLimits::new(self.transfer_min, self.transfer_max),
            step_up: StepUpPolicy {
                threshold: self.step_up_threshold,
                token: self.step_up_token.clone(),
            },
            lock_timeout: Duration::from_millis(self.lock_timeout_ms.max(1)),
            ..LedgerConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::default_strategy(&["program", "input.csv"], StrategyType::Async)]
    #[case::explicit_sync(&["program", "--strategy", "sync", "input.csv"], StrategyType::Sync)]
    #[case::explicit_async(&["program", "--strategy", "async", "input.csv"], StrategyType::Async)]
    fn test_strategy_parsing(#[case] args: &[&str], #[case] expected: StrategyType) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert_eq!(parsed.strategy, expected);
    }

    #[rstest]
    #[case::all_defaults(&["program", "input.csv"], 1000, num_cpus::get())]
    #[case::custom_batch_size(&["program", "--batch-size", "2000", "input.csv"], 2000, num_cpus::get())]
    #[case::custom_max_concurrent(&["program", "--max-concurrent", "8", "input.csv"], 1000, 8)]
    #[case::zero_batch_size(&["program", "--batch-size", "0", "input.csv"], 1000, num_cpus::get())]
    #[case::zero_max_concurrent(&["program", "--max-concurrent", "0", "input.csv"], 1000, num_cpus::get())]
    fn test_batch_config_conversion(
        #[case] args: &[&str],
        #[case] expected_batch_size: usize,
        #[case] expected_max_concurrent: usize,
    ) {
        let config = CliArgs::try_parse_from(args).unwrap().to_batch_config();

        assert_eq!(config.batch_size, expected_batch_size);
        assert_eq!(config.max_concurrent, expected_max_concurrent);
    }

    #[test]
    fn test_ledger_config_defaults_match_library_defaults() {
        let parsed = CliArgs::try_parse_from(["program", "input.csv"]).unwrap();
        let mut expected = LedgerConfig::default();
        expected.step_up.token = parsed.step_up_token.clone();

        assert_eq!(parsed.to_ledger_config(), expected);
    }

    #[test]
    fn test_ledger_config_from_flags() {
        let parsed = CliArgs::try_parse_from([
            "program",
            "--transfer-min",
            "1.50",
            "--transfer-max",
            "900",
            "--step-up-threshold",
            "300",
            "--step-up-token",
            "s3cret",
            "--lock-timeout-ms",
            "250",
            "input.csv",
        ])
        .unwrap();
        let config = parsed.to_ledger_config();

        assert_eq!(config.transfer_limits.min, Money::from_cents(150));
        assert_eq!(config.transfer_limits.max, Some(Money::from_units(900)));
        assert_eq!(config.step_up.threshold, Money::from_units(300));
        assert_eq!(config.step_up.token, "s3cret");
        assert_eq!(config.lock_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_invalid_transfer_bounds_fall_back() {
        let parsed = CliArgs::try_parse_from([
            "program",
            "--transfer-min",
            "0",
            "--transfer-max",
            "5",
            "input.csv",
        ])
        .unwrap();
        let limits = parsed.to_ledger_config().transfer_limits;

        assert_eq!(limits.min, Money::from_units(10));
        assert_eq!(limits.max, None);
    }

    #[rstest]
    #[case::missing_input(&["program"])]
    #[case::invalid_strategy(&["program", "--strategy", "invalid", "input.csv"])]
    #[case::invalid_amount(&["program", "--transfer-min", "ten", "input.csv"])]
    #[case::too_many_decimals(&["program", "--step-up-threshold", "1.001", "input.csv"])]
    fn test_parsing_errors(#[case] args: &[&str]) {
        assert!(CliArgs::try_parse_from(args).is_err());
    }
}
