//! Atomic unit of work
//!
//! A [`UnitOfWork`] is the transaction envelope shared by every
//! balance-affecting operation:
//!
//! 1. lock every touched account ([`AccountLocks::acquire`])
//! 2. load the committed state of those accounts
//! 3. let the operation validate and mutate the staged copies and stage
//!    movements
//! 4. [`commit`](UnitOfWork::commit) the change set through the store, or drop
//!    the unit of work to roll back
//!
//! Nothing reaches the store before commit, so a rule violation at any step
//! leaves accounts and movements exactly as they were.

use crate::core::locks::{AccountLocks, LockSet};
use crate::core::traits::{ChangeSet, CommitOutcome, LedgerStore};
use crate::types::{Account, AccountId, LedgerError, Movement};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

pub struct UnitOfWork<'s, S: LedgerStore> {
    store: &'s S,
    operation: &'static str,
    staged: BTreeMap<AccountId, Account>,
    dirty: BTreeSet<AccountId>,
    movements: Vec<Movement>,
    committed: bool,
    // Declared last so the locks are released after the staged state is gone
    _locks: LockSet,
}

impl<'s, S: LedgerStore> UnitOfWork<'s, S> {
    /// Lock and load `accounts`
    ///
    /// Fails with `NotFound` if any account does not exist and with
    /// `ConcurrencyConflict` if the locks cannot be taken within `timeout`.
    pub async fn begin(
        store: &'s S,
        locks: &AccountLocks,
        accounts: &[AccountId],
        timeout: Duration,
        operation: &'static str,
    ) -> Result<Self, LedgerError> {
        // Unknown ids must not leave entries behind in the lock table
        for id in accounts {
            if store.account(*id)?.is_none() {
                return Err(LedgerError::account_not_found(id));
            }
        }

        let lock_set = locks.acquire(accounts, timeout, operation).await?;

        let mut staged = BTreeMap::new();
        for id in lock_set.accounts() {
            let account = store
                .account(id)?
                .ok_or_else(|| LedgerError::account_not_found(id))?;
            staged.insert(id, account);
        }

        Ok(Self {
            store,
            operation,
            staged,
            dirty: BTreeSet::new(),
            movements: Vec::new(),
            committed: false,
            _locks: lock_set,
        })
    }

    /// Staged state of a locked account
    pub fn account(&self, id: AccountId) -> Result<&Account, LedgerError> {
        self.staged
            .get(&id)
            .ok_or_else(|| LedgerError::account_not_found(id))
    }

    /// Mutable staged state of a locked account; marks it for writing
    pub fn account_mut(&mut self, id: AccountId) -> Result<&mut Account, LedgerError> {
        let account = self
            .staged
            .get_mut(&id)
            .ok_or_else(|| LedgerError::account_not_found(id))?;
        self.dirty.insert(id);
        Ok(account)
    }

    /// Stage a movement for appending at commit
    pub fn record(&mut self, movement: Movement) {
        self.movements.push(movement);
    }

    /// Write every staged change in one atomic store commit
    pub fn commit(mut self) -> Result<CommitOutcome, LedgerError> {
        let dirty = std::mem::take(&mut self.dirty);
        let mut staged = std::mem::take(&mut self.staged);
        let changes = ChangeSet {
            accounts: dirty
                .into_iter()
                .filter_map(|id| staged.remove(&id))
                .collect(),
            movements: std::mem::take(&mut self.movements),
        };

        let outcome = self.store.commit(changes)?;
        self.committed = true;
        Ok(outcome)
    }
}

impl<S: LedgerStore> Drop for UnitOfWork<'_, S> {
    fn drop(&mut self) {
        if !self.committed {
            tracing::debug!(operation = self.operation, "unit of work rolled back");
        }
    }
}
