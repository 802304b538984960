//! Ledger policy configuration
//!
//! Business thresholds are plain values injected into the engine and the
//! account manager. The replay CLI builds them from its flags.

use crate::types::{LedgerError, Money};
use std::time::Duration;

/// Bounds applied to account-to-account transfers
#[derive(Debug, Clone, PartialEq)]
pub struct TransferLimits {
    /// Smallest amount accepted by every transfer flavour
    pub min: Money,
    /// Largest amount accepted by branch/number transfers, unbounded when `None`
    pub max: Option<Money>,
}

impl Default for TransferLimits {
    fn default() -> Self {
        Self {
            min: Money::from_units(10),
            max: None,
        }
    }
}

impl TransferLimits {
    /// Create limits, falling back to defaults for invalid values
    ///
    /// A non-positive minimum is replaced by the default minimum; a maximum
    /// below the minimum is dropped.
    pub fn new(min: Money, max: Option<Money>) -> Self {
        let default = Self::default();

        let min = if min.is_positive() {
            min
        } else {
            tracing::warn!(%min, default = %default.min, "invalid transfer minimum, using default");
            default.min
        };

        let max = match max {
            Some(max) if max < min => {
                tracing::warn!(%max, %min, "transfer maximum below minimum, ignoring maximum");
                None
            }
            other => other,
        };

        Self { min, max }
    }

    /// Check an amount against the minimum only
    pub fn check_minimum(&self, amount: Money) -> Result<(), LedgerError> {
        if amount < self.min {
            return Err(LedgerError::invalid_amount(
                amount,
                &format!("below transfer minimum {}", self.min),
            ));
        }
        Ok(())
    }

    /// Check an amount against both bounds
    pub fn check(&self, amount: Money) -> Result<(), LedgerError> {
        self.check_minimum(amount)?;
        match self.max {
            Some(max) if amount > max => Err(LedgerError::invalid_amount(
                amount,
                &format!("above transfer maximum {}", max),
            )),
            _ => Ok(()),
        }
    }
}

/// Step-up authentication for high-value transfers
#[derive(Clone, PartialEq)]
pub struct StepUpPolicy {
    /// Transfers at or above this amount need the token
    pub threshold: Money,
    /// Pre-shared token; an empty token rejects every high-value transfer
    pub token: String,
}

impl Default for StepUpPolicy {
    fn default() -> Self {
        Self {
            threshold: Money::from_units(5000),
            token: String::new(),
        }
    }
}

impl std::fmt::Debug for StepUpPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepUpPolicy")
            .field("threshold", &self.threshold)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Everything the engine needs to know about business policy
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerConfig {
    pub transfer_limits: TransferLimits,
    pub step_up: StepUpPolicy,
    /// Longest wait for the account locks of one operation
    pub lock_timeout: Duration,
    /// Credit limit of accounts opened without an explicit one
    pub default_credit_limit: Money,
    /// Daily debit limit of accounts opened without an explicit one
    pub default_daily_debit_limit: Money,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            transfer_limits: TransferLimits::default(),
            step_up: StepUpPolicy::default(),
            lock_timeout: Duration::from_secs(5),
            default_credit_limit: Money::from_units(1000),
            default_daily_debit_limit: Money::from_units(2000),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::at_minimum(TransferLimits::default(), 1000, true)]
    #[case::below_minimum(TransferLimits::default(), 500, false)]
    #[case::unbounded(TransferLimits::default(), 1_000_000_00, true)]
    #[case::at_maximum(TransferLimits::new(Money::from_units(10), Some(Money::from_units(5000))), 500_000, true)]
    #[case::above_maximum(TransferLimits::new(Money::from_units(10), Some(Money::from_units(5000))), 500_001, false)]
    fn test_transfer_limits(
        #[case] limits: TransferLimits,
        #[case] cents: i64,
        #[case] accepted: bool,
    ) {
        assert_eq!(limits.check(Money::from_cents(cents)).is_ok(), accepted);
    }

    #[test]
    fn test_minimum_check_ignores_maximum() {
        let limits = TransferLimits::new(Money::from_units(10), Some(Money::from_units(50)));
        assert!(limits.check_minimum(Money::from_units(100)).is_ok());
        assert!(limits.check(Money::from_units(100)).is_err());
    }

    #[rstest]
    #[case::zero_minimum(Money::ZERO, None, Money::from_units(10), None)]
    #[case::max_below_min(Money::from_units(20), Some(Money::from_units(5)), Money::from_units(20), None)]
    #[case::valid(Money::from_units(1), Some(Money::from_units(5)), Money::from_units(1), Some(Money::from_units(5)))]
    fn test_invalid_limits_fall_back(
        #[case] min: Money,
        #[case] max: Option<Money>,
        #[case] expected_min: Money,
        #[case] expected_max: Option<Money>,
    ) {
        let limits = TransferLimits::new(min, max);
        assert_eq!(limits.min, expected_min);
        assert_eq!(limits.max, expected_max);
    }

    #[test]
    fn test_step_up_token_is_redacted() {
        let policy = StepUpPolicy {
            threshold: Money::from_units(5000),
            token: "123456".to_string(),
        };
        assert!(!format!("{:?}", policy).contains("123456"));
    }
}
