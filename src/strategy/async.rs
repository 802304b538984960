//! Asynchronous batch processing strategy
//!
//! This module provides a concurrent implementation of the ProcessingStrategy
//! trait. It reads the replay in batches and runs independent operations of a
//! batch concurrently on a multi-threaded tokio runtime.
//!
//! # Architecture
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── BatchConfig (batch_size, max_concurrent)
//!     ├── AsyncReader (batch CSV reading)
//!     ├── plan_waves (key-disjoint scheduling)
//!     └── TransactionEngine (per-account locks, atomic commits)
//! ```
//!
//! # Ordering
//!
//! A batch is split into waves: consecutive operations whose state keys
//! (accounts, identities, cards) are pairwise disjoint. Operations inside a
//! wave commute, so running them concurrently yields the same ledger as
//! running them in file order. Waves and batches run one after another.
//! Operations whose keys are unknown before execution (alias transfers) run
//! alone.

use crate::core::{InMemoryStore, LedgerConfig, Sha256PinHasher, TransactionEngine};
use crate::io::async_reader::AsyncReader;
use crate::io::csv_format::{write_accounts_csv, ReplayRecord};
use crate::strategy::{apply_record, ProcessingStrategy, ReplayEngine};
use crate::types::LedgerError;
use std::collections::HashSet;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// Configuration for batch processing in async mode
#[derive(Clone, Debug, PartialEq)]
pub struct BatchConfig {
    /// Number of records read per batch
    pub batch_size: usize,

    /// Worker threads of the runtime, and the largest wave run at once
    pub max_concurrent: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a new BatchConfig with validation
    ///
    /// Zero values are replaced by defaults with a warning.
    pub fn new(batch_size: usize, max_concurrent: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            tracing::warn!(
                batch_size,
                default = default.batch_size,
                "invalid batch size, using default"
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent = if max_concurrent == 0 {
            tracing::warn!(
                max_concurrent,
                default = default.max_concurrent,
                "invalid concurrency limit, using default"
            );
            default.max_concurrent
        } else {
            max_concurrent
        };

        Self {
            batch_size,
            max_concurrent,
        }
    }
}

/// Split a batch into waves of mutually independent operations
///
/// Each wave holds at most `max_wave` records. File order is preserved across
/// waves, and two records sharing a key never share a wave.
pub fn plan_waves(batch: Vec<ReplayRecord>, max_wave: usize) -> Vec<Vec<ReplayRecord>> {
    let max_wave = max_wave.max(1);
    let mut waves = Vec::new();
    let mut wave: Vec<ReplayRecord> = Vec::new();
    let mut taken: HashSet<String> = HashSet::new();

    for record in batch {
        match record.operation.keys() {
            Some(keys) => {
                let conflicts = keys.iter().any(|key| taken.contains(key));
                if conflicts || wave.len() >= max_wave {
                    waves.push(std::mem::take(&mut wave));
                    taken.clear();
                }
                taken.extend(keys);
                wave.push(record);
            }
            None => {
                if !wave.is_empty() {
                    waves.push(std::mem::take(&mut wave));
                    taken.clear();
                }
                waves.push(vec![record]);
            }
        }
    }

    if !wave.is_empty() {
        waves.push(wave);
    }

    waves
}

/// Asynchronous batch processing strategy
#[derive(Debug, Clone)]
pub struct AsyncProcessingStrategy {
    config: BatchConfig,
    ledger: LedgerConfig,
}

impl AsyncProcessingStrategy {
    pub fn new(config: BatchConfig, ledger: LedgerConfig) -> Self {
        Self { config, ledger }
    }

    async fn run_wave(engine: &Arc<ReplayEngine>, wave: Vec<ReplayRecord>) -> (u64, u64) {
        let tasks: Vec<_> = wave
            .into_iter()
            .map(|record| {
                let engine = Arc::clone(engine);
                tokio::spawn(async move { apply_record(engine.as_ref(), &record).await })
            })
            .collect();

        let (mut applied, mut skipped) = (0, 0);
        for outcome in futures::future::join_all(tasks).await {
            match outcome {
                Ok(true) => applied += 1,
                Ok(false) => skipped += 1,
                Err(e) => {
                    tracing::error!(error = %e, "replay task panicked");
                    skipped += 1;
                }
            }
        }
        (applied, skipped)
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    /// Replay the input file in concurrent waves and write the final account states
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), LedgerError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.max_concurrent)
            .enable_all()
            .build()
            .map_err(|e| LedgerError::Io {
                message: format!("Failed to create tokio runtime: {}", e),
            })?;

        let engine = Arc::new(TransactionEngine::new(
            Arc::new(InMemoryStore::new()),
            Sha256PinHasher,
            self.ledger.clone(),
        ));

        runtime.block_on(async {
            let file = tokio::fs::File::open(input_path)
                .await
                .map_err(|e| LedgerError::Io {
                    message: format!("Failed to open file '{}': {}", input_path.display(), e),
                })?;

            // csv-async reads through the futures-io traits
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncReader::new(compat_file);

            let (mut applied, mut skipped) = (0u64, 0u64);
            loop {
                let batch = reader.read_batch(self.config.batch_size).await;
                if batch.is_empty() {
                    break;
                }

                for wave in plan_waves(batch, self.config.max_concurrent) {
                    let (wave_applied, wave_skipped) = Self::run_wave(&engine, wave).await;
                    applied += wave_applied;
                    skipped += wave_skipped;
                }
            }

            tracing::info!(applied, skipped, "replay finished");
            Ok::<_, LedgerError>(())
        })?;

        let accounts = engine.accounts().accounts()?;
        write_accounts_csv(&accounts, output)
    }
}
