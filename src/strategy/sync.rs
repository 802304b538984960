//! Synchronous processing strategy
//!
//! This module provides a sequential implementation of the ProcessingStrategy
//! trait. It orchestrates a replay by coordinating between the SyncReader (for
//! CSV input) and the TransactionEngine (for business logic).
//!
//! # Design
//!
//! The SyncProcessingStrategy focuses on orchestration, delegating:
//! - CSV parsing to `SyncReader` (iterator interface)
//! - Operation dispatch to `apply_record`
//! - CSV output to `csv_format::write_accounts_csv` (format handling)
//!
//! The engine API is async, so the strategy drives it on a current-thread
//! runtime: one operation at a time, in file order.

use crate::core::{InMemoryStore, LedgerConfig, Sha256PinHasher, TransactionEngine};
use crate::io::csv_format::write_accounts_csv;
use crate::io::sync_reader::SyncReader;
use crate::strategy::{apply_record, ProcessingStrategy};
use crate::types::LedgerError;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// Synchronous processing strategy
///
/// # Examples
///
/// ```no_run
/// use bank_ledger::core::LedgerConfig;
/// use bank_ledger::strategy::{ProcessingStrategy, SyncProcessingStrategy};
/// use std::path::Path;
/// use std::io;
///
/// let strategy = SyncProcessingStrategy::new(LedgerConfig::default());
/// let mut output = io::stdout();
///
/// strategy.process(Path::new("operations.csv"), &mut output)
///     .expect("Processing failed");
/// ```
#[derive(Debug, Clone)]
pub struct SyncProcessingStrategy {
    config: LedgerConfig,
}

impl SyncProcessingStrategy {
    pub fn new(config: LedgerConfig) -> Self {
        Self { config }
    }
}

impl ProcessingStrategy for SyncProcessingStrategy {
    /// Replay the input file sequentially and write the final account states
    ///
    /// Fatal errors (file not found, I/O errors) are returned immediately.
    /// Record errors are logged and processing continues.
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), LedgerError> {
        let reader = SyncReader::new(input_path)?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| LedgerError::Io {
                message: format!("Failed to create tokio runtime: {}", e),
            })?;

        let engine = TransactionEngine::new(
            Arc::new(InMemoryStore::new()),
            Sha256PinHasher,
            self.config.clone(),
        );

        let (applied, skipped) = runtime.block_on(async {
            let (mut applied, mut skipped) = (0u64, 0u64);
            for result in reader {
                match result {
                    Ok(record) => {
                        if apply_record(&engine, &record).await {
                            applied += 1;
                        } else {
                            skipped += 1;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "skipping unreadable record");
                        skipped += 1;
                    }
                }
            }
            (applied, skipped)
        });

        tracing::info!(applied, skipped, "replay finished");

        let accounts = engine.accounts().accounts()?;
        write_accounts_csv(&accounts, output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    fn run(content: &str) -> String {
        let file = create_temp_csv(content);
        let strategy = SyncProcessingStrategy::new(LedgerConfig::default());
        let mut output = Vec::new();
        strategy.process(file.path(), &mut output).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_sync_strategy_applies_operations_in_order() {
        let output = run("type,account,counterparty,amount,card,secret,memo\n\
                          open,0001/1001,111\n\
                          open,0001/1002,222\n\
                          deposit,0001/1001,,100.00\n\
                          transfer,0001/1001,0001/1002,40.00\n");

        assert_eq!(
            output,
            "branch,number,balance,credit_limit,credit_used,active,blocked\n\
             0001,1001,60.00,1000.00,0.00,true,false\n\
             0001,1002,40.00,1000.00,0.00,true,false\n"
        );
    }

    #[test]
    fn test_sync_strategy_skips_rejected_operations() {
        let output = run("type,account,counterparty,amount,card,secret,memo\n\
                          open,0001/1001,111\n\
                          deposit,0001/1001,,10.00\n\
                          pay_invoice,0001/1001,,5.00\n\
                          deposit,0001/9999,,10.00\n\
                          nonsense,0001/1001\n");

        assert!(output.contains("0001,1001,10.00,1000.00,0.00,true,false"));
        assert_eq!(output.lines().count(), 2);
    }

    #[test]
    fn test_sync_strategy_handles_missing_file() {
        let strategy = SyncProcessingStrategy::new(LedgerConfig::default());
        let mut output = Vec::new();

        let result = strategy.process(Path::new("nonexistent.csv"), &mut output);
        assert!(matches!(result, Err(LedgerError::Io { .. })));
        assert!(output.is_empty());
    }
}
