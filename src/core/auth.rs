//! Authorization gate
//!
//! Two independent checks guard the engine's sensitive operations:
//!
//! - **PIN check**: a debit card must exist, be active, and the candidate PIN
//!   must match its stored hash.
//! - **Step-up check**: transfers at or above the configured threshold need a
//!   token equal to the configured secret.
//!
//! Secrets are compared in constant time with `subtle`.

use crate::core::config::StepUpPolicy;
use crate::core::traits::{LedgerStore, PinHasher};
use crate::types::{
    AccountId, Card, CardId, CardInstrument, CardKind, LedgerError, Money, PinHash,
};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use uuid::Uuid;

/// Salted SHA-256 PIN hasher
///
/// Digests are stored as `salt$hex(sha256(salt ":" pin))` with a random
/// per-card salt.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256PinHasher;

impl Sha256PinHasher {
    fn digest(salt: &str, pin: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(salt.as_bytes());
        hasher.update(b":");
        hasher.update(pin.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl PinHasher for Sha256PinHasher {
    fn hash(&self, pin: &str) -> PinHash {
        let salt = Uuid::new_v4().simple().to_string();
        let digest = Self::digest(&salt, pin);
        PinHash::new(format!("{}${}", salt, digest))
    }

    fn verify(&self, pin: &str, stored: &PinHash) -> bool {
        let Some((salt, expected)) = stored.as_str().split_once('$') else {
            return false;
        };
        let actual = Self::digest(salt, pin);
        actual.as_bytes().ct_eq(expected.as_bytes()).into()
    }
}

/// PIN and step-up checks shared by the engine operations
pub struct AuthorizationGate<H> {
    hasher: Arc<H>,
    step_up: StepUpPolicy,
}

impl<H: PinHasher> AuthorizationGate<H> {
    pub fn new(hasher: Arc<H>, step_up: StepUpPolicy) -> Self {
        AuthorizationGate { hasher, step_up }
    }

    /// Verify a debit card PIN
    ///
    /// When `owner` is given, a card of another account is reported as not
    /// found. The engine calls this with the owner locked, since card changes
    /// take the same lock.
    ///
    /// # Errors
    ///
    /// - `CardNotFound` if the card does not exist (or belongs to another account)
    /// - `WrongCardKind` if it is not a debit card
    /// - `CardNotActive` if it is blocked
    /// - `InvalidPin` if the PIN does not match
    pub fn check_pin<S: LedgerStore>(
        &self,
        store: &S,
        card: CardId,
        owner: Option<AccountId>,
        pin: &str,
    ) -> Result<Card, LedgerError> {
        let card = store
            .card(card)?
            .filter(|found| owner.is_none_or(|owner| found.account == owner))
            .ok_or_else(|| LedgerError::card_not_found(card))?;

        card.ensure_usable_as(CardKind::Debit)?;

        let CardInstrument::Debit { pin_hash } = &card.instrument else {
            return Err(LedgerError::WrongCardKind {
                card: card.id,
                expected: CardKind::Debit,
            });
        };

        if !self.hasher.verify(pin, pin_hash) {
            tracing::warn!(card = %card.id, "PIN verification failed");
            return Err(LedgerError::InvalidPin { card: card.id });
        }

        Ok(card)
    }

    /// Require the step-up token for high-value amounts
    ///
    /// Returns whether step-up authentication was performed. Amounts below the
    /// threshold pass unauthenticated.
    pub fn step_up(&self, amount: Money, token: Option<&str>) -> Result<bool, LedgerError> {
        if amount < self.step_up.threshold {
            return Ok(false);
        }

        let expected = self.step_up.token.as_bytes();
        let accepted = !expected.is_empty()
            && token.is_some_and(|token| bool::from(token.as_bytes().ct_eq(expected)));

        if !accepted {
            tracing::warn!(
                %amount,
                threshold = %self.step_up.threshold,
                "step-up authentication failed"
            );
            return Err(LedgerError::StepUpRequired {
                amount,
                threshold: self.step_up.threshold,
            });
        }

        Ok(true)
    }
}
