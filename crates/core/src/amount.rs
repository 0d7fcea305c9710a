//! Amount - Non-negative decimal wrapper for money amounts
//!
//! Ledger entry amounts and fees are always non-negative; direction is
//! carried by the entry kind, never by the sign. This is enforced at the
//! type level. Derived balances are plain signed `Decimal` and live
//! outside this type.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors that can occur when constructing amounts
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("Amount cannot be negative: {0}")]
    Negative(Decimal),
}

/// A non-negative decimal money amount.
///
/// # Invariant
/// The inner value is always >= 0, enforced by the constructor.
///
/// # Example
/// ```
/// use kolo_core::Amount;
/// use rust_decimal::Decimal;
///
/// let amount = Amount::new(Decimal::new(3000, 0)).unwrap();
/// assert_eq!(amount.value(), Decimal::new(3000, 0));
///
/// assert!(Amount::new(Decimal::new(-1, 0)).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    /// Zero amount constant
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a new Amount from a Decimal.
    ///
    /// Returns an error if the value is negative.
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value < Decimal::ZERO {
            Err(AmountError::Negative(value))
        } else {
            Ok(Self(value))
        }
    }

    /// Create an Amount from a whole number of currency units.
    pub fn from_major(units: u64) -> Self {
        Self(Decimal::from(units))
    }

    /// Create an Amount without validation.
    ///
    /// # Safety
    /// The caller MUST ensure the value is non-negative.
    /// Use only for trusted sources (e.g. rows read from validated storage).
    #[inline]
    pub const fn new_unchecked(value: Decimal) -> Self {
        Self(value)
    }

    /// Get the inner Decimal value
    #[inline]
    pub const fn value(&self) -> Decimal {
        self.0
    }

    /// Check if the amount is zero
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checked addition - None on overflow
    pub fn checked_add(&self, other: &Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    /// Checked subtraction - None if the result would be negative
    pub fn checked_sub(&self, other: &Amount) -> Option<Amount> {
        let result = self.0.checked_sub(other.0)?;
        if result < Decimal::ZERO {
            None
        } else {
            Some(Amount(result))
        }
    }

    /// Subtraction clamped at zero
    pub fn saturating_sub(&self, other: &Amount) -> Amount {
        self.checked_sub(other).unwrap_or(Amount::ZERO)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = AmountError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl Default for Amount {
    fn default() -> Self {
        Self::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_amount_positive() {
        let amount = Amount::new(dec!(3000)).unwrap();
        assert_eq!(amount.value(), dec!(3000));
    }

    #[test]
    fn test_amount_negative_rejected() {
        let result = Amount::new(dec!(-100));
        assert!(matches!(result, Err(AmountError::Negative(_))));
    }

    #[test]
    fn test_from_major() {
        assert_eq!(Amount::from_major(500).value(), dec!(500));
    }

    #[test]
    fn test_checked_sub_prevents_negative() {
        let a = Amount::new(dec!(50)).unwrap();
        let b = Amount::new(dec!(100)).unwrap();
        assert!(a.checked_sub(&b).is_none());
        assert_eq!(a.saturating_sub(&b), Amount::ZERO);
    }

    #[test]
    fn test_checked_add() {
        let a = Amount::new(dec!(100)).unwrap();
        let b = Amount::new(dec!(30)).unwrap();
        assert_eq!(a.checked_add(&b).unwrap().value(), dec!(130));
    }

    #[test]
    fn test_serde_roundtrip() {
        let amount = Amount::new(dec!(123.45)).unwrap();
        let json = serde_json::to_string(&amount).unwrap();
        let parsed: Amount = serde_json::from_str(&json).unwrap();
        assert_eq!(amount, parsed);
    }
}
