//! Request and receipt records for engine operations
//!
//! Requests carry already-validated primitive fields from the request layer.
//! Receipts report the post-commit state of every touched account together
//! with the committed movements.

use super::account::{Account, AccountId};
use super::card::CardId;
use super::money::Money;
use super::movement::Movement;

/// Account-to-account transfer
#[derive(Debug, Clone, PartialEq)]
pub struct TransferRequest {
    pub origin: AccountId,
    pub destination: AccountId,
    pub amount: Money,
    /// Step-up token, required at or above the configured threshold
    pub auth_token: Option<String>,
}

/// Transfer authorized with the origin's debit card PIN
#[derive(Debug, Clone, PartialEq)]
pub struct CardTransferRequest {
    pub origin: AccountId,
    pub destination: AccountId,
    pub amount: Money,
    pub card: CardId,
    pub pin: String,
    pub auth_token: Option<String>,
}

/// PIX-style transfer addressed by alias
#[derive(Debug, Clone, PartialEq)]
pub struct AliasTransferRequest {
    /// CPF or alias key of the origin account
    pub origin: String,
    /// CPF or alias key of the destination account
    pub destination_alias: String,
    pub amount: Money,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DebitPurchaseRequest {
    pub card: CardId,
    pub pin: String,
    pub amount: Money,
    pub merchant: String,
}

/// Purchase billed against the account's credit
///
/// At least one of `account` and `card` is required. A card alone bills its
/// owner; when both are named the card must belong to the account.
#[derive(Debug, Clone, PartialEq)]
pub struct CreditPurchaseRequest {
    pub account: Option<AccountId>,
    pub card: Option<CardId>,
    pub amount: Money,
    pub merchant: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DepositRequest {
    pub account: AccountId,
    pub amount: Money,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvoicePaymentRequest {
    pub account: AccountId,
    pub amount: Money,
}

/// Post-commit snapshot of an account's figures
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccountBalance {
    pub account: AccountId,
    pub balance: Money,
    pub credit_limit: Money,
    pub credit_used: Money,
}

impl From<&Account> for AccountBalance {
    fn from(account: &Account) -> Self {
        AccountBalance {
            account: account.id,
            balance: account.balance,
            credit_limit: account.credit_limit,
            credit_used: account.credit_used,
        }
    }
}

/// Result of any of the transfer operations
#[derive(Debug, Clone, PartialEq)]
pub struct TransferReceipt {
    pub origin: AccountBalance,
    pub destination: AccountBalance,
    /// Sent movement first, received movement second
    pub movements: Vec<Movement>,
    pub authenticated: bool,
}

/// Result of a single-account posting (deposit, purchases)
#[derive(Debug, Clone, PartialEq)]
pub struct PostingReceipt {
    pub account: AccountBalance,
    pub movement: Movement,
}

/// Result of an invoice payment
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceReceipt {
    pub account: AccountBalance,
    /// Amount actually paid, clamped to the credit in use
    pub paid: Money,
    pub movement: Movement,
}
