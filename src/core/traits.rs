//! Core traits for the ledger's external collaborators
//!
//! The engine never reaches for ambient state: the transactional store and the
//! PIN hashing primitive are injected through these traits, so tests can run
//! against [`InMemoryStore`](super::store::InMemoryStore) and production code
//! can plug in a database-backed store.

use crate::types::{
    Account, AccountId, AccountNumber, Card, CardId, LedgerError, Movement, PinHash,
};
use chrono::{DateTime, Utc};

/// Writes of one unit of work, applied together or not at all
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    /// Updated accounts, each carrying the version it was read at
    pub accounts: Vec<Account>,
    /// New movements to append
    pub movements: Vec<Movement>,
}

/// State written by a successful commit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommitOutcome {
    /// Accounts with their new versions
    pub accounts: Vec<Account>,
    /// Movements with their assigned sequence numbers, in staging order
    pub movements: Vec<Movement>,
}

/// Transactional data store holding accounts, cards and movements
///
/// Reads observe the latest committed state. [`LedgerStore::commit`] must apply
/// a [`ChangeSet`] atomically: either every account update and every movement
/// becomes visible, or none does.
pub trait LedgerStore: Send + Sync {
    fn account(&self, id: AccountId) -> Result<Option<Account>, LedgerError>;

    fn account_by_cpf(&self, cpf: &str) -> Result<Option<Account>, LedgerError>;

    fn account_by_number(&self, number: &AccountNumber) -> Result<Option<Account>, LedgerError>;

    /// Find the account whose CPF or secondary alias key equals `alias`
    fn account_by_alias(&self, alias: &str) -> Result<Option<Account>, LedgerError>;

    fn accounts(&self) -> Result<Vec<Account>, LedgerError>;

    /// Insert a newly opened account
    ///
    /// Fails with `AlreadyExists` when the CPF, the account number or the
    /// alias is taken.
    fn insert_account(&self, account: Account) -> Result<(), LedgerError>;

    fn card(&self, id: CardId) -> Result<Option<Card>, LedgerError>;

    /// Find a card by number within one account's cards
    fn card_by_number(&self, account: AccountId, number: &str)
        -> Result<Option<Card>, LedgerError>;

    fn cards(&self, account: AccountId) -> Result<Vec<Card>, LedgerError>;

    /// Fails with `AlreadyExists` when the card number is taken
    fn insert_card(&self, card: Card) -> Result<(), LedgerError>;

    fn update_card(&self, card: Card) -> Result<(), LedgerError>;

    /// Returns whether a card was removed
    fn delete_card(&self, id: CardId) -> Result<bool, LedgerError>;

    /// Page of an account's movements, newest first, plus the total count
    fn movements(
        &self,
        account: AccountId,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<Movement>, u64), LedgerError>;

    /// Movements of an account created at or after `since`
    fn movements_since(
        &self,
        account: AccountId,
        since: DateTime<Utc>,
    ) -> Result<Vec<Movement>, LedgerError>;

    /// Apply a change set atomically
    ///
    /// Fails with `ConcurrencyConflict` if any account's stored version
    /// differs from the version the change was computed from.
    fn commit(&self, changes: ChangeSet) -> Result<CommitOutcome, LedgerError>;
}

/// PIN hashing primitive
pub trait PinHasher: Send + Sync {
    fn hash(&self, pin: &str) -> PinHash;

    fn verify(&self, pin: &str, digest: &PinHash) -> bool;
}
