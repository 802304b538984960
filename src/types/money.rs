//! Fixed-point money amounts
//!
//! Every monetary value in the ledger (balances, limits, movement amounts) is a
//! [`Money`]: a `rust_decimal::Decimal` pinned to two fractional digits. Binary
//! floating point never appears, so repeated additions and subtractions cannot
//! drift.

use super::error::LedgerError;
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

/// Monetary amount with exactly two fractional digits
///
/// # Examples
///
/// ```rust
/// use bank_ledger::Money;
///
/// let amount: Money = "10,5".parse().unwrap();
/// assert_eq!(amount, Money::from_cents(1050));
/// assert_eq!(amount.to_string(), "10.50");
/// assert!("12.345".parse::<Money>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(Decimal);

impl Money {
    /// Number of fractional digits carried by every amount
    pub const SCALE: u32 = 2;

    pub const ZERO: Money = Money(Decimal::from_parts(0, 0, 0, false, Self::SCALE));

    /// Create an amount from integer cents
    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::new(cents, Self::SCALE))
    }

    /// Create an amount from whole currency units
    pub fn from_units(units: i64) -> Self {
        Self::from_cents(units.saturating_mul(100))
    }

    /// Convert a decimal into money
    ///
    /// Trailing zeros beyond the second fractional digit are accepted
    /// (`10.500`), any other extra precision is rejected instead of being
    /// rounded away.
    pub fn try_from_decimal(value: Decimal) -> Result<Self, LedgerError> {
        if value.normalize().scale() > Self::SCALE {
            return Err(LedgerError::invalid_amount(
                value,
                "more than two decimal places",
            ));
        }
        let mut rescaled = value;
        rescaled.rescale(Self::SCALE);
        Self::exact(rescaled).ok_or_else(|| {
            LedgerError::invalid_amount(value, "too large to carry two decimal places")
        })
    }

    // rust_decimal drops fractional digits instead of overflowing
    fn exact(value: Decimal) -> Option<Money> {
        (value.scale() == Self::SCALE).then_some(Money(value))
    }

    /// The underlying decimal value
    pub fn amount(self) -> Decimal {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    pub fn is_negative(self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Checked addition (`None` on overflow or loss of cents)
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).and_then(Self::exact)
    }

    /// Checked subtraction (`None` on overflow or loss of cents)
    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).and_then(Self::exact)
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::ZERO
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl FromStr for Money {
    type Err = LedgerError;

    /// Parse a decimal string, accepting `.` or `,` as the separator
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(LedgerError::invalid_amount(s, "empty amount"));
        }

        let decimal = Decimal::from_str(&trimmed.replace(',', "."))
            .map_err(|_| LedgerError::invalid_amount(s, "not a decimal number"))?;

        Money::try_from_decimal(decimal)
    }
}

impl TryFrom<Decimal> for Money {
    type Error = LedgerError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Money::try_from_decimal(value)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.0
    }
}
