//! Bank Ledger replay CLI
//!
//! Replays banking operations from a CSV file against a fresh in-memory ledger
//! and prints the final account states.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- operations.csv > accounts.csv
//! cargo run -- --strategy sync operations.csv > accounts.csv
//! cargo run -- --strategy async --batch-size 2000 --max-concurrent 8 operations.csv > accounts.csv
//! LEDGER_STEP_UP_TOKEN=s3cret cargo run -- --step-up-threshold 1000 operations.csv
//! ```
//!
//! Account states go to stdout, logs go to stderr. Rejected operations are
//! logged and skipped.
//!
//! # Processing Strategies
//!
//! - **sync**: One operation at a time, in file order
//! - **async**: Batches split into waves of independent operations run concurrently (default)
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (missing arguments, file not found, output not writable, etc.)

use bank_ledger::cli;
use bank_ledger::strategy;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    let args = cli::parse_args();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|e| {
        eprintln!("invalid log filter '{}': {}, using 'info'", args.log_level, e);
        EnvFilter::new("info")
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let strategy = {
        let batch_config = if matches!(args.strategy, cli::StrategyType::Async) {
            Some(args.to_batch_config())
        } else {
            None
        };
        strategy::create_strategy(args.strategy.clone(), batch_config, args.to_ledger_config())
    };

    let mut output = std::io::stdout();
    if let Err(e) = strategy.process(&args.input_file, &mut output) {
        tracing::error!(error = %e, input = %args.input_file.display(), "replay failed");
        process::exit(1);
    }
}
