//! Account-related types for the ledger
//!
//! This module defines the Account record, its identifier, and the request
//! used to open a new account.

use super::error::LedgerError;
use super::money::Money;
use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

/// Opaque account identifier
///
/// Ordered, so that lock acquisition over several accounts can follow one
/// global order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccountId(Uuid);

impl AccountId {
    /// Generate a fresh random identifier
    pub fn new() -> Self {
        AccountId(Uuid::new_v4())
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for AccountId {
    fn from(value: Uuid) -> Self {
        AccountId(value)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Branch (agency) code plus account number
///
/// Unique across the ledger; rendered as `branch/number`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccountNumber {
    pub branch: String,
    pub number: String,
}

impl AccountNumber {
    pub fn new(branch: impl Into<String>, number: impl Into<String>) -> Self {
        AccountNumber {
            branch: branch.into(),
            number: number.into(),
        }
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.branch, self.number)
    }
}

/// Ledger record holding a customer's balance, credit and status flags
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub id: AccountId,

    /// Holder display name, used in movement descriptions
    pub holder: String,

    /// CPF-equivalent tax identifier, unique across the ledger
    pub cpf: String,

    pub number: AccountNumber,

    /// Optional secondary key (e.g. e-mail) for alias transfers
    pub alias: Option<String>,

    /// Funds available for transfers and debit purchases
    ///
    /// Never driven below zero: every debit is checked before it is applied.
    pub balance: Money,

    /// Maximum credit the account may use
    pub credit_limit: Money,

    /// Credit currently in use, billed on the next invoice
    ///
    /// Invariant: `0 <= credit_used <= credit_limit`.
    pub credit_used: Money,

    /// Ceiling on debit-card purchases per UTC day
    pub daily_debit_limit: Money,

    /// Soft-delete flag; inactive accounts are never hard-deleted
    pub active: bool,

    /// Frozen accounts accept no movement
    pub blocked: bool,

    /// Incremented by the store on every committed change
    pub version: u64,

    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Build a freshly opened account with zero balance and no credit in use
    pub fn open(request: NewAccount, credit_limit: Money, daily_debit_limit: Money) -> Self {
        Account {
            id: AccountId::new(),
            holder: request.holder,
            cpf: request.cpf,
            number: request.number,
            alias: request.alias,
            balance: Money::ZERO,
            credit_limit,
            credit_used: Money::ZERO,
            daily_debit_limit,
            active: true,
            blocked: false,
            version: 0,
            created_at: Utc::now(),
        }
    }

    /// Credit still available to spend
    pub fn available_credit(&self) -> Money {
        self.credit_limit
            .checked_sub(self.credit_used)
            .unwrap_or(Money::ZERO)
    }

    /// Fail unless the account may move funds
    ///
    /// A deactivated account reports `AccountInactive` even though it is also
    /// blocked.
    pub fn ensure_usable(&self) -> Result<(), LedgerError> {
        if !self.active {
            return Err(LedgerError::AccountInactive { account: self.id });
        }
        if self.blocked {
            return Err(LedgerError::AccountBlocked { account: self.id });
        }
        Ok(())
    }
}

/// Request to open an account
#[derive(Debug, Clone, PartialEq)]
pub struct NewAccount {
    pub holder: String,
    pub cpf: String,
    pub number: AccountNumber,
    pub alias: Option<String>,
    /// Falls back to the ledger's default credit limit when `None`
    pub credit_limit: Option<Money>,
    /// Falls back to the ledger's default daily debit limit when `None`
    pub daily_debit_limit: Option<Money>,
}
