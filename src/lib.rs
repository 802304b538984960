//! Bank Ledger Library
//! # Overview
//!
//! This library provides a banking ledger: accounts with balances and credit
//! lines, cards, and an engine that moves money between them atomically. A
//! CSV replay tool drives the engine with either a sequential or a concurrent
//! strategy.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Money, Account, Card, Movement, requests and receipts)
//! - [`cli`] - CLI arguments parsing
//! - [`core`] - Business logic components:
//!   - [`core::engine`] - Money-moving operations and statements
//!   - [`core::account_manager`] - Account and card administration
//!   - [`core::auth`] - PIN and step-up authorization
//!   - [`core::unit_of_work`] - Lock-scoped atomic commits
//!   - [`core::store`] - In-memory storage behind the [`LedgerStore`] trait
//! - [`io`] - CSV replay input and account state output
//! - [`strategy`] - Pluggable replay pipelines
//!
//! # Operations
//!
//! - **Transfer**: Move funds between two accounts by branch/number, optionally step-up authorized
//! - **Card transfer**: Same, authorized by a debit card PIN
//! - **Alias transfer**: Move funds to the account registered under an alias
//! - **Debit purchase**: Pay from the balance with a debit card, bounded by a daily limit
//! - **Credit purchase**: Charge the credit line, bounded by the account and card limits
//! - **Deposit**: Credit funds to an account
//! - **Invoice payment**: Settle used credit from the balance
//!
//! # Invariants
//!
//! Balances never go negative, used credit never exceeds the credit limit, and
//! every operation either commits all of its effects or none of them.

// Module declarations
pub mod cli;
pub mod core;
pub mod io;
pub mod strategy;
pub mod types;

pub use core::{
    AccountManager, InMemoryStore, LedgerConfig, LedgerStore, PinHasher, Sha256PinHasher,
    TransactionEngine,
};
pub use io::write_accounts_csv;
pub use types::{
    Account, AccountId, AccountNumber, AliasTransferRequest, Card, CardId, CardTransferRequest,
    CreditPurchaseRequest, DebitPurchaseRequest, DepositRequest, ErrorKind,
    InvoicePaymentRequest, InvoiceReceipt, LedgerError, Money, Movement, PostingReceipt,
    TransferReceipt, TransferRequest,
};
