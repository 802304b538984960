//! Paginated account statements

use crate::core::traits::LedgerStore;
use crate::types::{AccountId, LedgerError, Movement};
use std::sync::Arc;

/// One page of an account's movements, newest first
#[derive(Debug, Clone, PartialEq)]
pub struct StatementPage {
    pub movements: Vec<Movement>,
    /// 1-based page number actually served
    pub page: usize,
    pub page_size: usize,
    /// Movements the account has in total
    pub total: u64,
    /// Zero when the account has no movements
    pub total_pages: u64,
}

/// Read-only access to movement history
pub struct StatementReader<S> {
    store: Arc<S>,
}

impl<S: LedgerStore> StatementReader<S> {
    pub fn new(store: Arc<S>) -> Self {
        StatementReader { store }
    }

    /// List movements of `account` newest first
    ///
    /// `page` and `page_size` below 1 are clamped to 1. Reading has no side
    /// effects.
    ///
    /// # Errors
    ///
    /// `AccountNotFound` if the account does not exist.
    pub fn list_movements(
        &self,
        account: AccountId,
        page: usize,
        page_size: usize,
    ) -> Result<StatementPage, LedgerError> {
        if self.store.account(account)?.is_none() {
            return Err(LedgerError::account_not_found(account));
        }

        let page = page.max(1);
        let page_size = page_size.max(1);
        let offset = (page - 1).saturating_mul(page_size);

        let (movements, total) = self.store.movements(account, offset, page_size)?;

        Ok(StatementPage {
            movements,
            page,
            page_size,
            total,
            total_pages: total.div_ceil(page_size as u64),
        })
    }
}
