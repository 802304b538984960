//! Card-related types
//!
//! A card is either a debit or a credit instrument bound to exactly one
//! account. The PIN hash only exists on debit cards and the per-card credit
//! limit only on credit cards, which [`CardInstrument`] expresses as a tagged
//! variant rather than two nullable fields.

use super::account::AccountId;
use super::error::LedgerError;
use super::money::Money;
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque card identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CardId(Uuid);

impl CardId {
    pub fn new() -> Self {
        CardId(Uuid::new_v4())
    }
}

impl Default for CardId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for CardId {
    fn from(value: Uuid) -> Self {
        CardId(value)
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CardKind {
    Debit,
    Credit,
}

impl fmt::Display for CardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardKind::Debit => write!(f, "debit"),
            CardKind::Credit => write!(f, "credit"),
        }
    }
}

impl FromStr for CardKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "debit" => Ok(CardKind::Debit),
            "credit" => Ok(CardKind::Credit),
            _ => Err(LedgerError::invalid_input(
                "card kind",
                &format!("unknown kind '{}'", s),
            )),
        }
    }
}

/// Whether the card belongs to the account holder or an additional holder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CardOwnership {
    #[default]
    Primary,
    Additional,
}

/// Issuer brand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CardNetwork {
    #[default]
    Mastercard,
    Visa,
    Elo,
    Amex,
}

impl FromStr for CardNetwork {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mastercard" => Ok(CardNetwork::Mastercard),
            "visa" => Ok(CardNetwork::Visa),
            "elo" => Ok(CardNetwork::Elo),
            "amex" => Ok(CardNetwork::Amex),
            _ => Err(LedgerError::invalid_input(
                "card network",
                &format!("unknown network '{}'", s),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CardStatus {
    Active,
    Blocked,
}

/// Stored PIN digest
///
/// The digest format is owned by the [`PinHasher`](crate::core::PinHasher)
/// that produced it. `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct PinHash(String);

impl PinHash {
    pub fn new(digest: impl Into<String>) -> Self {
        PinHash(digest.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PinHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PinHash(<redacted>)")
    }
}

/// The capability attached to a card
#[derive(Debug, Clone, PartialEq)]
pub enum CardInstrument {
    Debit { pin_hash: PinHash },
    Credit { credit_limit: Money },
}

/// Debit or credit instrument bound to one account
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub id: CardId,
    pub account: AccountId,
    /// Card number, unique across the ledger
    pub number: String,
    pub ownership: CardOwnership,
    pub network: CardNetwork,
    pub status: CardStatus,
    pub instrument: CardInstrument,
    pub created_at: DateTime<Utc>,
}

impl Card {
    pub fn kind(&self) -> CardKind {
        match self.instrument {
            CardInstrument::Debit { .. } => CardKind::Debit,
            CardInstrument::Credit { .. } => CardKind::Credit,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == CardStatus::Active
    }

    /// Per-card credit limit; `None` for debit cards
    pub fn credit_limit(&self) -> Option<Money> {
        match self.instrument {
            CardInstrument::Credit { credit_limit } => Some(credit_limit),
            CardInstrument::Debit { .. } => None,
        }
    }

    /// Reject the card unless it is active and of the expected kind
    pub fn ensure_usable_as(&self, expected: CardKind) -> Result<(), LedgerError> {
        if self.kind() != expected {
            return Err(LedgerError::WrongCardKind {
                card: self.id,
                expected,
            });
        }
        if !self.is_active() {
            return Err(LedgerError::CardNotActive { card: self.id });
        }
        Ok(())
    }
}

/// Instrument details supplied when issuing a card
#[derive(Debug, Clone, PartialEq)]
pub enum NewCardInstrument {
    /// Plain PIN; hashed before it reaches the store
    Debit { pin: String },
    Credit { credit_limit: Money },
}

/// Request to issue a card
#[derive(Debug, Clone, PartialEq)]
pub struct NewCard {
    pub number: String,
    pub ownership: CardOwnership,
    pub network: CardNetwork,
    pub instrument: NewCardInstrument,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn card(instrument: CardInstrument, status: CardStatus) -> Card {
        Card {
            id: CardId::new(),
            account: AccountId::new(),
            number: "5100000000000001".to_string(),
            ownership: CardOwnership::Primary,
            network: CardNetwork::Mastercard,
            status,
            instrument,
            created_at: Utc::now(),
        }
    }

    #[rstest]
    #[case("debit", CardKind::Debit)]
    #[case("CREDIT", CardKind::Credit)]
    fn test_card_kind_parsing(#[case] input: &str, #[case] expected: CardKind) {
        assert_eq!(input.parse::<CardKind>().unwrap(), expected);
    }

    #[rstest]
    #[case::unknown_kind("prepaid".parse::<CardKind>().map(|_| ()))]
    #[case::unknown_network("diners".parse::<CardNetwork>().map(|_| ()))]
    fn test_parsing_rejects_unknown_values(#[case] result: Result<(), LedgerError>) {
        assert!(matches!(result, Err(LedgerError::InvalidInput { .. })));
    }

    #[test]
    fn test_pin_hash_debug_is_redacted() {
        let hash = PinHash::new("salt$digest");
        assert_eq!(format!("{:?}", hash), "PinHash(<redacted>)");
    }

    #[test]
    fn test_credit_limit_only_on_credit_cards() {
        let credit = card(
            CardInstrument::Credit {
                credit_limit: Money::from_units(500),
            },
            CardStatus::Active,
        );
        let debit = card(
            CardInstrument::Debit {
                pin_hash: PinHash::new("x"),
            },
            CardStatus::Active,
        );

        assert_eq!(credit.credit_limit(), Some(Money::from_units(500)));
        assert_eq!(debit.credit_limit(), None);
    }

    #[test]
    fn test_ensure_usable_as() {
        let blocked_debit = card(
            CardInstrument::Debit {
                pin_hash: PinHash::new("x"),
            },
            CardStatus::Blocked,
        );

        assert!(matches!(
            blocked_debit.ensure_usable_as(CardKind::Credit),
            Err(LedgerError::WrongCardKind { .. })
        ));
        assert!(matches!(
            blocked_debit.ensure_usable_as(CardKind::Debit),
            Err(LedgerError::CardNotActive { .. })
        ));
    }
}
