//! Core business logic module
//!
//! This module contains the ledger's processing components:
//! - `traits` - Store and PIN hasher abstractions
//! - `store` - In-memory transactional store
//! - `locks` - Per-account lock table
//! - `unit_of_work` - Lock, stage, commit-or-rollback envelope
//! - `auth` - PIN and step-up authorization
//! - `config` - Business thresholds
//! - `engine` - Balance-affecting operations
//! - `account_manager` - Account and card administration
//! - `statement` - Paginated movement history

pub mod account_manager;
pub mod auth;
pub mod config;
pub mod engine;
pub mod locks;
pub mod statement;
pub mod store;
pub mod traits;
pub mod unit_of_work;

pub use account_manager::AccountManager;
pub use auth::{AuthorizationGate, Sha256PinHasher};
pub use config::{LedgerConfig, StepUpPolicy, TransferLimits};
pub use engine::TransactionEngine;
pub use locks::AccountLocks;
pub use statement::{StatementPage, StatementReader};
pub use store::InMemoryStore;
pub use traits::{ChangeSet, CommitOutcome, LedgerStore, PinHasher};
pub use unit_of_work::UnitOfWork;
