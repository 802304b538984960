//! Movement-related types
//!
//! A movement is the immutable, timestamped record of one balance-affecting
//! event. Movements are only ever appended, as a byproduct of a committed
//! engine operation.

use super::account::{AccountId, AccountNumber};
use super::card::CardId;
use super::money::Money;
use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

/// Opaque movement identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MovementId(Uuid);

impl MovementId {
    pub fn new() -> Self {
        MovementId(Uuid::new_v4())
    }
}

impl Default for MovementId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MovementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// What kind of event a movement records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MovementKind {
    TransferSent,
    TransferReceived,
    PixSent,
    PixReceived,
    DebitPurchase,
    /// Deferred billing: raises credit usage, leaves the balance alone
    CreditPurchase,
    InvoicePayment,
    Deposit,
}

impl MovementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MovementKind::TransferSent => "transfer_sent",
            MovementKind::TransferReceived => "transfer_received",
            MovementKind::PixSent => "pix_sent",
            MovementKind::PixReceived => "pix_received",
            MovementKind::DebitPurchase => "debit_purchase",
            MovementKind::CreditPurchase => "credit_purchase",
            MovementKind::InvoicePayment => "invoice_payment",
            MovementKind::Deposit => "deposit",
        }
    }
}

impl fmt::Display for MovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable ledger entry
#[derive(Debug, Clone, PartialEq)]
pub struct Movement {
    pub id: MovementId,

    /// Global commit order, assigned by the store
    ///
    /// Zero until the movement is committed.
    pub sequence: u64,

    /// Owning account
    pub account: AccountId,

    pub kind: MovementKind,

    /// Always positive; the kind carries the direction
    pub amount: Money,

    pub description: String,

    /// Other side of a transfer
    pub counterparty: Option<AccountNumber>,

    /// Card used, for card transfers and purchases
    pub card: Option<CardId>,

    /// Alias the transfer was addressed to
    pub alias: Option<String>,

    pub merchant: Option<String>,

    /// Whether step-up authentication was performed and passed
    pub authenticated: bool,

    pub created_at: DateTime<Utc>,
}

impl Movement {
    pub fn new(
        account: AccountId,
        kind: MovementKind,
        amount: Money,
        description: impl Into<String>,
    ) -> Self {
        Movement {
            id: MovementId::new(),
            sequence: 0,
            account,
            kind,
            amount,
            description: description.into(),
            counterparty: None,
            card: None,
            alias: None,
            merchant: None,
            authenticated: false,
            created_at: Utc::now(),
        }
    }

    pub fn with_counterparty(mut self, counterparty: AccountNumber) -> Self {
        self.counterparty = Some(counterparty);
        self
    }

    pub fn with_card(mut self, card: Option<CardId>) -> Self {
        self.card = card;
        self
    }

    pub fn with_alias(mut self, alias: Option<String>) -> Self {
        self.alias = alias;
        self
    }

    pub fn with_merchant(mut self, merchant: impl Into<String>) -> Self {
        self.merchant = Some(merchant.into());
        self
    }

    pub fn authenticated(mut self, authenticated: bool) -> Self {
        self.authenticated = authenticated;
        self
    }
}
