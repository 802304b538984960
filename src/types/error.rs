//! Error types for the ledger
//!
//! Every failure of an engine or account-manager operation is returned as a
//! [`LedgerError`]. Variants carry enough context to explain the rejection;
//! [`LedgerError::kind`] collapses them into the coarse [`ErrorKind`] taxonomy
//! callers branch on (for example to map onto HTTP status codes).
//!
//! # Retry policy
//!
//! Only [`ErrorKind::ConcurrencyConflict`] and [`ErrorKind::Unavailable`] are
//! retryable. Every other kind is terminal for the given input.

use super::account::AccountId;
use super::card::{CardId, CardKind};
use super::money::Money;
use std::fmt::Display;
use thiserror::Error;

/// Coarse classification of a [`LedgerError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidAmount,
    NotFound,
    AccountBlocked,
    AccountInactive,
    InsufficientFunds,
    CreditLimitExceeded,
    DailyLimitExceeded,
    Unauthorized,
    InvalidState,
    SameAccount,
    AliasNotFound,
    NothingToPay,
    AlreadyExists,
    InvalidInput,
    ConcurrencyConflict,
    Unavailable,
}

/// Main error type for the ledger
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// Amount is non-positive, malformed, or outside the configured bounds
    #[error("Invalid amount '{amount}': {reason}")]
    InvalidAmount {
        /// The offending amount as given
        amount: String,
        /// Why it was rejected
        reason: String,
    },

    /// Balance arithmetic would overflow
    #[error("Arithmetic overflow in {operation} for account {account}")]
    ArithmeticOverflow { operation: String, account: AccountId },

    /// No account matches the reference
    #[error("Account {reference} not found")]
    AccountNotFound { reference: String },

    /// No card matches the reference
    #[error("Card {reference} not found")]
    CardNotFound { reference: String },

    /// No account is registered under the alias of an alias transfer
    #[error("No account registered for alias '{alias}'")]
    AliasNotFound { alias: String },

    /// Account is blocked; all movement is frozen
    #[error("Account {account} is blocked")]
    AccountBlocked { account: AccountId },

    /// Account was deactivated
    #[error("Account {account} is inactive")]
    AccountInactive { account: AccountId },

    #[error("Insufficient funds for account {account}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        account: AccountId,
        balance: Money,
        requested: Money,
    },

    #[error("Credit limit exceeded for account {account}: limit {limit}, used {used}, requested {requested}")]
    CreditLimitExceeded {
        account: AccountId,
        limit: Money,
        used: Money,
        requested: Money,
    },

    #[error("Daily debit limit exceeded for account {account}: limit {limit}, spent today {spent}, requested {requested}")]
    DailyLimitExceeded {
        account: AccountId,
        limit: Money,
        spent: Money,
        requested: Money,
    },

    /// Candidate PIN does not match the stored hash
    #[error("Invalid PIN for card {card}")]
    InvalidPin { card: CardId },

    /// A high-value transfer was attempted without a valid step-up token
    #[error("Step-up authentication required for amount {amount} (threshold {threshold})")]
    StepUpRequired { amount: Money, threshold: Money },

    /// Card is blocked
    #[error("Card {card} is not active")]
    CardNotActive { card: CardId },

    /// Card exists but is the wrong instrument for the operation
    #[error("Card {card} is not a {expected} card")]
    WrongCardKind { card: CardId, expected: CardKind },

    /// Origin and destination resolve to the same account
    #[error("Cannot transfer from account {account} to itself")]
    SameAccount { account: AccountId },

    /// Invoice payment with no credit in use
    #[error("Account {account} has no credit in use to pay")]
    NothingToPay { account: AccountId },

    /// Credit limit change would drop below the credit already used
    #[error("Credit limit {limit} for account {account} is below credit used {used}")]
    CreditLimitBelowUsage {
        account: AccountId,
        limit: Money,
        used: Money,
    },

    /// A unique attribute is already taken
    #[error("{field} '{value}' already exists")]
    AlreadyExists { field: String, value: String },

    /// A request field is malformed
    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    /// Lock contention, timeout, or a stale version at commit
    #[error("Concurrency conflict in {operation}, retry the operation")]
    ConcurrencyConflict { operation: String },

    /// The store cannot serve the request
    #[error("Ledger store unavailable: {message}")]
    Unavailable { message: String },

    /// I/O error in the replay tooling
    #[error("I/O error: {message}")]
    Io { message: String },

    /// CSV parsing error in the replay tooling
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    Parse {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        message: String,
    },
}

impl LedgerError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::InvalidAmount { .. } | LedgerError::ArithmeticOverflow { .. } => {
                ErrorKind::InvalidAmount
            }
            LedgerError::AccountNotFound { .. } | LedgerError::CardNotFound { .. } => {
                ErrorKind::NotFound
            }
            LedgerError::AliasNotFound { .. } => ErrorKind::AliasNotFound,
            LedgerError::AccountBlocked { .. } => ErrorKind::AccountBlocked,
            LedgerError::AccountInactive { .. } => ErrorKind::AccountInactive,
            LedgerError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            LedgerError::CreditLimitExceeded { .. } => ErrorKind::CreditLimitExceeded,
            LedgerError::DailyLimitExceeded { .. } => ErrorKind::DailyLimitExceeded,
            LedgerError::InvalidPin { .. } | LedgerError::StepUpRequired { .. } => {
                ErrorKind::Unauthorized
            }
            LedgerError::CardNotActive { .. }
            | LedgerError::WrongCardKind { .. }
            | LedgerError::CreditLimitBelowUsage { .. } => ErrorKind::InvalidState,
            LedgerError::SameAccount { .. } => ErrorKind::SameAccount,
            LedgerError::NothingToPay { .. } => ErrorKind::NothingToPay,
            LedgerError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            LedgerError::InvalidInput { .. } | LedgerError::Parse { .. } => {
                ErrorKind::InvalidInput
            }
            LedgerError::ConcurrencyConflict { .. } => ErrorKind::ConcurrencyConflict,
            LedgerError::Unavailable { .. } | LedgerError::Io { .. } => ErrorKind::Unavailable,
        }
    }

    /// Whether retrying the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::ConcurrencyConflict | ErrorKind::Unavailable
        )
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(error: std::io::Error) -> Self {
        LedgerError::Io {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for LedgerError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        LedgerError::Parse {
            line,
            message: error.to_string(),
        }
    }
}

// Helper functions for creating common errors

impl LedgerError {
    pub fn invalid_amount(amount: impl Display, reason: &str) -> Self {
        LedgerError::InvalidAmount {
            amount: amount.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn arithmetic_overflow(operation: &str, account: AccountId) -> Self {
        LedgerError::ArithmeticOverflow {
            operation: operation.to_string(),
            account,
        }
    }

    pub fn account_not_found(reference: impl Display) -> Self {
        LedgerError::AccountNotFound {
            reference: reference.to_string(),
        }
    }

    pub fn card_not_found(reference: impl Display) -> Self {
        LedgerError::CardNotFound {
            reference: reference.to_string(),
        }
    }

    pub fn alias_not_found(alias: &str) -> Self {
        LedgerError::AliasNotFound {
            alias: alias.to_string(),
        }
    }

    pub fn insufficient_funds(account: AccountId, balance: Money, requested: Money) -> Self {
        LedgerError::InsufficientFunds {
            account,
            balance,
            requested,
        }
    }

    pub fn already_exists(field: &str, value: impl Display) -> Self {
        LedgerError::AlreadyExists {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    pub fn invalid_input(field: &str, reason: &str) -> Self {
        LedgerError::InvalidInput {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn concurrency_conflict(operation: &str) -> Self {
        LedgerError::ConcurrencyConflict {
            operation: operation.to_string(),
        }
    }

    pub fn unavailable(message: impl Display) -> Self {
        LedgerError::Unavailable {
            message: message.to_string(),
        }
    }
}
