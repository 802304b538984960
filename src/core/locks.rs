//! Per-account exclusive locks
//!
//! Every balance-affecting operation holds the lock of each account it touches
//! for the whole of its unit of work. Locks are taken in ascending
//! [`AccountId`] order, so two operations over overlapping account sets can
//! never wait on each other in a cycle.
//!
//! The lock table is a `DashMap` of `tokio` mutexes: looking up a lock only
//! touches one shard briefly, and the owned guards can be held across `.await`
//! points.

use crate::types::{AccountId, LedgerError};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Guards for a set of accounts, released on drop
#[derive(Debug)]
pub struct LockSet {
    guards: Vec<(AccountId, OwnedMutexGuard<()>)>,
}

impl LockSet {
    /// Locked accounts in acquisition order
    pub fn accounts(&self) -> impl Iterator<Item = AccountId> + '_ {
        self.guards.iter().map(|(id, _)| *id)
    }
}

/// Table of account locks
#[derive(Debug, Default)]
pub struct AccountLocks {
    locks: DashMap<AccountId, Arc<Mutex<()>>>,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of accounts with an entry in the table
    #[cfg(test)]
    pub(crate) fn tracked(&self) -> usize {
        self.locks.len()
    }

    fn lock_for(&self, account: AccountId) -> Arc<Mutex<()>> {
        let entry = self
            .locks
            .entry(account)
            .or_insert_with(|| Arc::new(Mutex::new(())));
        Arc::clone(entry.value())
    }

    /// Acquire the locks of `accounts` within `timeout`
    ///
    /// Duplicates are collapsed. If the deadline passes, every lock taken so
    /// far is released and the call fails with `ConcurrencyConflict`.
    pub async fn acquire(
        &self,
        accounts: &[AccountId],
        timeout: Duration,
        operation: &str,
    ) -> Result<LockSet, LedgerError> {
        let mut ordered = accounts.to_vec();
        ordered.sort();
        ordered.dedup();

        let acquisition = async {
            let mut guards = Vec::with_capacity(ordered.len());
            for account in ordered {
                let guard = self.lock_for(account).lock_owned().await;
                guards.push((account, guard));
            }
            guards
        };

        match tokio::time::timeout(timeout, acquisition).await {
            Ok(guards) => Ok(LockSet { guards }),
            Err(_) => {
                tracing::warn!(
                    operation,
                    timeout_ms = timeout.as_millis() as u64,
                    "timed out waiting for account locks"
                );
                Err(LedgerError::concurrency_conflict(operation))
            }
        }
    }
}
