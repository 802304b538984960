//! Types module
//!
//! Contains core data structures used throughout the ledger.
//! This module organizes types into logical submodules:
//! - `money`: Fixed-point monetary amounts
//! - `account`: Account record and identifiers
//! - `card`: Card record, instrument variants and identifiers
//! - `movement`: Append-only movement records
//! - `operation`: Request and receipt records for engine operations
//! - `error`: Error types for the ledger

pub mod account;
pub mod card;
pub mod error;
pub mod money;
pub mod movement;
pub mod operation;

pub use account::{Account, AccountId, AccountNumber, NewAccount};
pub use card::{
    Card, CardId, CardInstrument, CardKind, CardNetwork, CardOwnership, CardStatus, NewCard,
    NewCardInstrument, PinHash,
};
pub use error::{ErrorKind, LedgerError};
pub use money::Money;
pub use movement::{Movement, MovementId, MovementKind};
pub use operation::{
    AccountBalance, AliasTransferRequest, CardTransferRequest, CreditPurchaseRequest,
    DebitPurchaseRequest, DepositRequest, InvoicePaymentRequest, InvoiceReceipt, PostingReceipt,
    TransferReceipt, TransferRequest,
};
