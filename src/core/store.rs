//! In-memory ledger store
//!
//! [`InMemoryStore`] implements [`LedgerStore`] over plain `HashMap` tables
//! guarded by a single `RwLock`. A commit validates every account version and
//! then applies all writes while holding the write lock, so readers observe
//! either the whole change set or none of it.
//!
//! Per-account serialization of read-modify-write sequences is not the store's
//! job: the engine holds [`AccountLocks`](super::locks::AccountLocks) for every
//! account it touches. The version check on commit catches writers that
//! bypass those locks.

use crate::core::traits::{ChangeSet, CommitOutcome, LedgerStore};
use crate::types::{Account, AccountId, AccountNumber, Card, CardId, LedgerError, Movement};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct Tables {
    accounts: HashMap<AccountId, Account>,
    by_cpf: HashMap<String, AccountId>,
    by_number: HashMap<AccountNumber, AccountId>,
    by_alias: HashMap<String, AccountId>,
    cards: HashMap<CardId, Card>,
    card_numbers: HashMap<String, CardId>,
    /// Per-account movements in commit order
    movements: HashMap<AccountId, Vec<Movement>>,
    last_sequence: u64,
}

impl Tables {
    /// Whether `key` is already used as a CPF or as an alias
    fn key_taken(&self, key: &str) -> bool {
        self.by_cpf.contains_key(key) || self.by_alias.contains_key(key)
    }
}

/// Transactional store kept entirely in memory
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, LedgerError> {
        self.tables
            .read()
            .map_err(|_| LedgerError::unavailable("store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, LedgerError> {
        self.tables
            .write()
            .map_err(|_| LedgerError::unavailable("store lock poisoned"))
    }

    /// Number of movements stored for an account
    pub fn movement_count(&self, account: AccountId) -> Result<usize, LedgerError> {
        Ok(self
            .read()?
            .movements
            .get(&account)
            .map_or(0, |movements| movements.len()))
    }
}

impl LedgerStore for InMemoryStore {
    fn account(&self, id: AccountId) -> Result<Option<Account>, LedgerError> {
        Ok(self.read()?.accounts.get(&id).cloned())
    }

    fn account_by_cpf(&self, cpf: &str) -> Result<Option<Account>, LedgerError> {
        let tables = self.read()?;
        Ok(tables
            .by_cpf
            .get(cpf)
            .and_then(|id| tables.accounts.get(id))
            .cloned())
    }

    fn account_by_number(&self, number: &AccountNumber) -> Result<Option<Account>, LedgerError> {
        let tables = self.read()?;
        Ok(tables
            .by_number
            .get(number)
            .and_then(|id| tables.accounts.get(id))
            .cloned())
    }

    fn account_by_alias(&self, alias: &str) -> Result<Option<Account>, LedgerError> {
        let tables = self.read()?;
        Ok(tables
            .by_cpf
            .get(alias)
            .or_else(|| tables.by_alias.get(alias))
            .and_then(|id| tables.accounts.get(id))
            .cloned())
    }

    fn accounts(&self) -> Result<Vec<Account>, LedgerError> {
        Ok(self.read()?.accounts.values().cloned().collect())
    }

    fn insert_account(&self, account: Account) -> Result<(), LedgerError> {
        let mut tables = self.write()?;

        if tables.key_taken(&account.cpf) {
            return Err(LedgerError::already_exists("cpf", &account.cpf));
        }
        if tables.by_number.contains_key(&account.number) {
            return Err(LedgerError::already_exists("account number", &account.number));
        }
        if let Some(alias) = &account.alias {
            if tables.key_taken(alias) || *alias == account.cpf {
                return Err(LedgerError::already_exists("alias", alias));
            }
            tables.by_alias.insert(alias.clone(), account.id);
        }

        tables.by_cpf.insert(account.cpf.clone(), account.id);
        tables.by_number.insert(account.number.clone(), account.id);
        tables.accounts.insert(account.id, account);
        Ok(())
    }

    fn card(&self, id: CardId) -> Result<Option<Card>, LedgerError> {
        Ok(self.read()?.cards.get(&id).cloned())
    }

    fn card_by_number(
        &self,
        account: AccountId,
        number: &str,
    ) -> Result<Option<Card>, LedgerError> {
        let tables = self.read()?;
        Ok(tables
            .card_numbers
            .get(number)
            .and_then(|id| tables.cards.get(id))
            .filter(|card| card.account == account)
            .cloned())
    }

    fn cards(&self, account: AccountId) -> Result<Vec<Card>, LedgerError> {
        let mut cards: Vec<Card> = self
            .read()?
            .cards
            .values()
            .filter(|card| card.account == account)
            .cloned()
            .collect();
        cards.sort_by_key(|card| card.created_at);
        Ok(cards)
    }

    fn insert_card(&self, card: Card) -> Result<(), LedgerError> {
        let mut tables = self.write()?;

        if !tables.accounts.contains_key(&card.account) {
            return Err(LedgerError::account_not_found(card.account));
        }
        if tables.card_numbers.contains_key(&card.number) {
            return Err(LedgerError::already_exists("card number", &card.number));
        }

        tables.card_numbers.insert(card.number.clone(), card.id);
        tables.cards.insert(card.id, card);
        Ok(())
    }

    fn update_card(&self, card: Card) -> Result<(), LedgerError> {
        let mut tables = self.write()?;
        let stored = tables
            .cards
            .get_mut(&card.id)
            .ok_or_else(|| LedgerError::card_not_found(card.id))?;

        // Number and owner are fixed at issuance
        if stored.number != card.number || stored.account != card.account {
            return Err(LedgerError::invalid_input(
                "card",
                "number and owning account cannot change",
            ));
        }

        *stored = card;
        Ok(())
    }

    fn delete_card(&self, id: CardId) -> Result<bool, LedgerError> {
        let mut tables = self.write()?;
        match tables.cards.remove(&id) {
            Some(card) => {
                tables.card_numbers.remove(&card.number);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn movements(
        &self,
        account: AccountId,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<Movement>, u64), LedgerError> {
        let tables = self.read()?;
        let Some(movements) = tables.movements.get(&account) else {
            return Ok((Vec::new(), 0));
        };

        let page = movements
            .iter()
            .rev()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();

        Ok((page, movements.len() as u64))
    }

    fn movements_since(
        &self,
        account: AccountId,
        since: DateTime<Utc>,
    ) -> Result<Vec<Movement>, LedgerError> {
        Ok(self
            .read()?
            .movements
            .get(&account)
            .map(|movements| {
                movements
                    .iter()
                    .filter(|movement| movement.created_at >= since)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn commit(&self, changes: ChangeSet) -> Result<CommitOutcome, LedgerError> {
        let mut tables = self.write()?;

        // Validate everything before the first write
        for account in &changes.accounts {
            let stored = tables
                .accounts
                .get(&account.id)
                .ok_or_else(|| LedgerError::account_not_found(account.id))?;
            if stored.version != account.version {
                tracing::debug!(
                    account = %account.id,
                    stored = stored.version,
                    staged = account.version,
                    "stale account version at commit"
                );
                return Err(LedgerError::concurrency_conflict("commit"));
            }
        }
        for movement in &changes.movements {
            if !tables.accounts.contains_key(&movement.account) {
                return Err(LedgerError::account_not_found(movement.account));
            }
        }

        let mut outcome = CommitOutcome::default();

        for mut account in changes.accounts {
            account.version += 1;
            tables.accounts.insert(account.id, account.clone());
            outcome.accounts.push(account);
        }

        for mut movement in changes.movements {
            tables.last_sequence += 1;
            movement.sequence = tables.last_sequence;
            tables
                .movements
                .entry(movement.account)
                .or_default()
                .push(movement.clone());
            outcome.movements.push(movement);
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        CardInstrument, CardNetwork, CardOwnership, CardStatus, ErrorKind, Money, MovementKind,
        NewAccount,
    };

    fn account(cpf: &str, number: &str, alias: Option<&str>) -> Account {
        Account::open(
            NewAccount {
                holder: format!("holder {}", cpf),
                cpf: cpf.to_string(),
                number: AccountNumber::new("0001", number),
                alias: alias.map(str::to_string),
                credit_limit: None,
                daily_debit_limit: None,
            },
            Money::from_units(1000),
            Money::from_units(2000),
        )
    }

    fn credit_card(owner: AccountId, number: &str) -> Card {
        Card {
            id: CardId::new(),
            account: owner,
            number: number.to_string(),
            ownership: CardOwnership::Primary,
            network: CardNetwork::Visa,
            status: CardStatus::Active,
            instrument: CardInstrument::Credit {
                credit_limit: Money::from_units(500),
            },
            created_at: Utc::now(),
        }
    }

    fn deposit(account: &Account, cents: i64) -> Movement {
        Movement::new(
            account.id,
            MovementKind::Deposit,
            Money::from_cents(cents),
            "Deposit",
        )
    }

    #[test]
    fn test_lookups_by_every_key() {
        let store = InMemoryStore::new();
        let ana = account("111", "1001", Some("ana@example.com"));
        store.insert_account(ana.clone()).unwrap();

        assert_eq!(store.account(ana.id).unwrap(), Some(ana.clone()));
        assert_eq!(store.account_by_cpf("111").unwrap(), Some(ana.clone()));
        assert_eq!(
            store
                .account_by_number(&AccountNumber::new("0001", "1001"))
                .unwrap(),
            Some(ana.clone())
        );
        assert_eq!(store.account_by_alias("111").unwrap(), Some(ana.clone()));
        assert_eq!(
            store.account_by_alias("ana@example.com").unwrap(),
            Some(ana)
        );
        assert_eq!(store.account_by_alias("nobody").unwrap(), None);
    }

    #[test]
    fn test_insert_rejects_duplicate_keys() {
        let store = InMemoryStore::new();
        store
            .insert_account(account("111", "1001", Some("ana@example.com")))
            .unwrap();

        let same_cpf = store.insert_account(account("111", "1002", None));
        let same_number = store.insert_account(account("222", "1001", None));
        let alias_is_cpf = store.insert_account(account("333", "1003", Some("111")));
        let cpf_is_alias = store.insert_account(account("ana@example.com", "1004", None));

        for result in [same_cpf, same_number, alias_is_cpf, cpf_is_alias] {
            assert_eq!(result.unwrap_err().kind(), ErrorKind::AlreadyExists);
        }
        assert_eq!(store.accounts().unwrap().len(), 1);
    }

    #[test]
    fn test_commit_bumps_versions_and_sequences() {
        let store = InMemoryStore::new();
        let mut ana = account("111", "1001", None);
        store.insert_account(ana.clone()).unwrap();

        ana.balance = Money::from_units(10);
        let outcome = store
            .commit(ChangeSet {
                accounts: vec![ana.clone()],
                movements: vec![deposit(&ana, 1000), deposit(&ana, 500)],
            })
            .unwrap();

        assert_eq!(outcome.accounts[0].version, 1);
        assert_eq!(outcome.movements[0].sequence, 1);
        assert_eq!(outcome.movements[1].sequence, 2);
        assert_eq!(store.account(ana.id).unwrap().unwrap().balance, Money::from_units(10));
    }

    #[test]
    fn test_stale_version_rejects_whole_change_set() {
        let store = InMemoryStore::new();
        let ana = account("111", "1001", None);
        let bia = account("222", "2002", None);
        store.insert_account(ana.clone()).unwrap();
        store.insert_account(bia.clone()).unwrap();

        // Someone else commits to Bia first
        store
            .commit(ChangeSet {
                accounts: vec![bia.clone()],
                movements: vec![],
            })
            .unwrap();

        let mut staged_ana = ana.clone();
        staged_ana.balance = Money::from_units(99);
        let result = store.commit(ChangeSet {
            accounts: vec![staged_ana, bia.clone()],
            movements: vec![deposit(&ana, 9900)],
        });

        assert_eq!(result.unwrap_err().kind(), ErrorKind::ConcurrencyConflict);
        assert_eq!(store.account(ana.id).unwrap().unwrap().balance, Money::ZERO);
        assert_eq!(store.movement_count(ana.id).unwrap(), 0);
    }

    #[test]
    fn test_movements_are_paged_newest_first() {
        let store = InMemoryStore::new();
        let ana = account("111", "1001", None);
        store.insert_account(ana.clone()).unwrap();

        for cents in [100, 200, 300] {
            store
                .commit(ChangeSet {
                    accounts: vec![],
                    movements: vec![deposit(&ana, cents)],
                })
                .unwrap();
        }

        let (first_page, total) = store.movements(ana.id, 0, 2).unwrap();
        let (second_page, _) = store.movements(ana.id, 2, 2).unwrap();

        assert_eq!(total, 3);
        assert_eq!(first_page[0].amount, Money::from_cents(300));
        assert_eq!(first_page[1].amount, Money::from_cents(200));
        assert_eq!(second_page.len(), 1);
        assert_eq!(second_page[0].amount, Money::from_cents(100));
    }

    #[test]
    fn test_card_lookup_is_scoped_to_owner() {
        let store = InMemoryStore::new();
        let ana = account("111", "1001", None);
        let bia = account("222", "2002", None);
        store.insert_account(ana.clone()).unwrap();
        store.insert_account(bia.clone()).unwrap();

        let card = credit_card(ana.id, "4000000000000001");
        store.insert_card(card.clone()).unwrap();

        assert_eq!(
            store.card_by_number(ana.id, "4000000000000001").unwrap(),
            Some(card.clone())
        );
        assert_eq!(store.card_by_number(bia.id, "4000000000000001").unwrap(), None);

        let duplicate = store.insert_card(credit_card(bia.id, "4000000000000001"));
        assert_eq!(duplicate.unwrap_err().kind(), ErrorKind::AlreadyExists);

        assert!(store.delete_card(card.id).unwrap());
        assert!(!store.delete_card(card.id).unwrap());
        assert!(store.cards(ana.id).unwrap().is_empty());
    }
}
