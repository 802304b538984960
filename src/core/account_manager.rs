//! Account management module
//!
//! This module provides the `AccountManager` struct which owns the
//! administrative side of the ledger:
//! - Opening accounts and issuing cards
//! - Credit and daily debit limit changes
//! - Blocking, unblocking and deactivating accounts
//! - Card status, card credit limit and card removal
//! - Lookups by id, CPF, account number and card number
//!
//! Changes to account fields go through the same locked unit of work as the
//! money-moving operations of the engine, so an administrative update never
//! interleaves with a transfer touching the same account.

use crate::core::config::LedgerConfig;
use crate::core::locks::{AccountLocks, LockSet};
use crate::core::traits::{LedgerStore, PinHasher};
use crate::core::unit_of_work::UnitOfWork;
use crate::types::{
    Account, AccountId, AccountNumber, Card, CardId, CardInstrument, CardKind, CardStatus,
    LedgerError, Money, NewAccount, NewCard, NewCardInstrument,
};
use chrono::Utc;
use std::sync::Arc;

const PIN_LENGTH: std::ops::RangeInclusive<usize> = 4..=6;

/// Administrative operations and lookups over accounts and cards
pub struct AccountManager<S, H> {
    store: Arc<S>,
    locks: Arc<AccountLocks>,
    hasher: Arc<H>,
    config: LedgerConfig,
}

impl<S: LedgerStore, H: PinHasher> AccountManager<S, H> {
    /// Create a manager sharing the engine's store, lock table and hasher
    pub fn new(
        store: Arc<S>,
        locks: Arc<AccountLocks>,
        hasher: Arc<H>,
        config: LedgerConfig,
    ) -> Self {
        AccountManager {
            store,
            locks,
            hasher,
            config,
        }
    }

    /// Open a new account with zero balance
    ///
    /// Missing limits fall back to the configured defaults.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if the holder, CPF, branch or number is blank
    /// - `InvalidAmount` if a limit is negative
    /// - `AlreadyExists` if the CPF, account number or alias is taken
    pub fn open_account(&self, request: NewAccount) -> Result<Account, LedgerError> {
        require_non_blank("holder", &request.holder)?;
        require_non_blank("cpf", &request.cpf)?;
        require_non_blank("branch", &request.number.branch)?;
        require_non_blank("account number", &request.number.number)?;
        if let Some(alias) = &request.alias {
            require_non_blank("alias", alias)?;
        }

        let credit_limit = request
            .credit_limit
            .unwrap_or(self.config.default_credit_limit);
        let daily_debit_limit = request
            .daily_debit_limit
            .unwrap_or(self.config.default_daily_debit_limit);
        require_non_negative(credit_limit, "credit limit")?;
        require_non_negative(daily_debit_limit, "daily debit limit")?;

        let account = Account::open(request, credit_limit, daily_debit_limit);
        self.store.insert_account(account.clone())?;

        tracing::info!(account = %account.id, number = %account.number, "account opened");
        Ok(account)
    }

    /// Issue a card bound to an active, unblocked account
    ///
    /// Debit PINs must be 4 to 6 ASCII digits and are hashed before storage.
    pub fn issue_card(&self, account: AccountId, request: NewCard) -> Result<Card, LedgerError> {
        self.account(account)?.ensure_usable()?;

        let number = request.number.trim();
        if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
            return Err(LedgerError::invalid_input(
                "card number",
                "must be a non-empty string of digits",
            ));
        }

        let instrument = match request.instrument {
            NewCardInstrument::Debit { pin } => {
                if !PIN_LENGTH.contains(&pin.len()) || !pin.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(LedgerError::invalid_input("pin", "must be 4 to 6 digits"));
                }
                CardInstrument::Debit {
                    pin_hash: self.hasher.hash(&pin),
                }
            }
            NewCardInstrument::Credit { credit_limit } => {
                require_non_negative(credit_limit, "card credit limit")?;
                CardInstrument::Credit { credit_limit }
            }
        };

        let card = Card {
            id: CardId::new(),
            account,
            number: number.to_string(),
            ownership: request.ownership,
            network: request.network,
            status: CardStatus::Active,
            instrument,
            created_at: Utc::now(),
        };
        self.store.insert_card(card.clone())?;

        tracing::info!(account = %account, card = %card.id, kind = %card.kind(), "card issued");
        Ok(card)
    }

    /// Change the account credit limit
    ///
    /// # Errors
    ///
    /// `CreditLimitBelowUsage` if the new limit is below the credit already used.
    pub async fn set_credit_limit(
        &self,
        account: AccountId,
        limit: Money,
    ) -> Result<Account, LedgerError> {
        require_non_negative(limit, "credit limit")?;

        self.update_account("set_credit_limit", account, |staged| {
            if limit < staged.credit_used {
                return Err(LedgerError::CreditLimitBelowUsage {
                    account: staged.id,
                    limit,
                    used: staged.credit_used,
                });
            }
            staged.credit_limit = limit;
            Ok(())
        })
        .await
    }

    pub async fn set_daily_debit_limit(
        &self,
        account: AccountId,
        limit: Money,
    ) -> Result<Account, LedgerError> {
        require_non_negative(limit, "daily debit limit")?;

        self.update_account("set_daily_debit_limit", account, |staged| {
            staged.daily_debit_limit = limit;
            Ok(())
        })
        .await
    }

    /// Freeze all movement on the account
    pub async fn block_account(&self, account: AccountId) -> Result<Account, LedgerError> {
        self.update_account("block_account", account, |staged| {
            staged.blocked = true;
            Ok(())
        })
        .await
    }

    /// Lift a block; deactivated accounts stay frozen
    pub async fn unblock_account(&self, account: AccountId) -> Result<Account, LedgerError> {
        self.update_account("unblock_account", account, |staged| {
            if !staged.active {
                return Err(LedgerError::AccountInactive { account: staged.id });
            }
            staged.blocked = false;
            Ok(())
        })
        .await
    }

    /// Soft-delete the account: inactive and blocked, history kept
    pub async fn deactivate_account(&self, account: AccountId) -> Result<Account, LedgerError> {
        self.update_account("deactivate_account", account, |staged| {
            staged.active = false;
            staged.blocked = true;
            Ok(())
        })
        .await
    }

    async fn update_account<F>(
        &self,
        operation: &'static str,
        account: AccountId,
        apply: F,
    ) -> Result<Account, LedgerError>
    where
        F: FnOnce(&mut Account) -> Result<(), LedgerError>,
    {
        let mut work = UnitOfWork::begin(
            self.store.as_ref(),
            &self.locks,
            &[account],
            self.config.lock_timeout,
            operation,
        )
        .await?;

        apply(work.account_mut(account)?)?;

        let outcome = work.commit()?;
        let updated = outcome
            .accounts
            .into_iter()
            .find(|updated| updated.id == account)
            .ok_or_else(|| LedgerError::account_not_found(account))?;

        tracing::info!(account = %account, operation, "account updated");
        Ok(updated)
    }

    /// Change a card's status under its owner's lock
    ///
    /// A purchase or card transfer that is waiting on the same account sees
    /// the new status once it gets the lock.
    pub async fn set_card_status(
        &self,
        account: AccountId,
        card: CardId,
        status: CardStatus,
    ) -> Result<Card, LedgerError> {
        let _locks = self.lock_owner(account, "set_card_status").await?;

        let mut card = self.card(account, card)?;
        card.status = status;
        self.store.update_card(card.clone())?;

        tracing::info!(card = %card.id, ?status, "card status changed");
        Ok(card)
    }

    /// Change the limit of a credit card
    pub async fn set_card_credit_limit(
        &self,
        account: AccountId,
        card: CardId,
        limit: Money,
    ) -> Result<Card, LedgerError> {
        require_non_negative(limit, "card credit limit")?;
        let _locks = self.lock_owner(account, "set_card_credit_limit").await?;

        let mut card = self.card(account, card)?;
        match &mut card.instrument {
            CardInstrument::Credit { credit_limit } => *credit_limit = limit,
            CardInstrument::Debit { .. } => {
                return Err(LedgerError::WrongCardKind {
                    card: card.id,
                    expected: CardKind::Credit,
                })
            }
        }
        self.store.update_card(card.clone())?;
        Ok(card)
    }

    pub async fn delete_card(&self, account: AccountId, card: CardId) -> Result<(), LedgerError> {
        let _locks = self.lock_owner(account, "delete_card").await?;

        let card = self.card(account, card)?;
        if !self.store.delete_card(card.id)? {
            return Err(LedgerError::card_not_found(card.id));
        }

        tracing::info!(account = %account, card = %card.id, "card deleted");
        Ok(())
    }

    async fn lock_owner(
        &self,
        account: AccountId,
        operation: &'static str,
    ) -> Result<LockSet, LedgerError> {
        self.account(account)?;
        self.locks
            .acquire(&[account], self.config.lock_timeout, operation)
            .await
    }

    pub fn account(&self, id: AccountId) -> Result<Account, LedgerError> {
        self.store
            .account(id)?
            .ok_or_else(|| LedgerError::account_not_found(id))
    }

    pub fn account_by_cpf(&self, cpf: &str) -> Result<Account, LedgerError> {
        self.store
            .account_by_cpf(cpf)?
            .ok_or_else(|| LedgerError::account_not_found(cpf))
    }

    pub fn account_by_number(&self, number: &AccountNumber) -> Result<Account, LedgerError> {
        self.store
            .account_by_number(number)?
            .ok_or_else(|| LedgerError::account_not_found(number))
    }

    /// Get all accounts sorted by branch, then number
    ///
    /// Provides deterministic output for CSV generation.
    pub fn accounts(&self) -> Result<Vec<Account>, LedgerError> {
        let mut accounts = self.store.accounts()?;
        accounts.sort_by(|a, b| a.number.cmp(&b.number));
        Ok(accounts)
    }

    /// Card by id, scoped to the owning account
    pub fn card(&self, account: AccountId, card: CardId) -> Result<Card, LedgerError> {
        self.store
            .card(card)?
            .filter(|found| found.account == account)
            .ok_or_else(|| LedgerError::card_not_found(card))
    }

    /// Card by number, scoped to the owning account
    pub fn card_by_number(&self, account: AccountId, number: &str) -> Result<Card, LedgerError> {
        self.store
            .card_by_number(account, number)?
            .ok_or_else(|| LedgerError::card_not_found(number))
    }

    pub fn cards(&self, account: AccountId) -> Result<Vec<Card>, LedgerError> {
        self.account(account)?;
        self.store.cards(account)
    }
}

fn require_non_blank(field: &str, value: &str) -> Result<(), LedgerError> {
    if value.trim().is_empty() {
        return Err(LedgerError::invalid_input(field, "must not be blank"));
    }
    Ok(())
}

fn require_non_negative(amount: Money, what: &str) -> Result<(), LedgerError> {
    if amount.is_negative() {
        return Err(LedgerError::invalid_amount(
            amount,
            &format!("{} must not be negative", what),
        ));
    }
    Ok(())
}
