//! Money in the smallest currency unit.

use serde::{Deserialize, Serialize};

use crate::DomainError;

/// Amount in the smallest currency unit (e.g. cents).
///
/// Integer arithmetic only; every operation is checked.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// `self * quantity`, failing instead of wrapping.
    pub fn times(self, quantity: i64) -> Result<Money, DomainError> {
        self.0
            .checked_mul(quantity)
            .map(Money)
            .ok_or_else(|| DomainError::invariant("amount overflow"))
    }

    pub fn checked_add(self, other: Money) -> Result<Money, DomainError> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or_else(|| DomainError::invariant("amount overflow"))
    }

    pub fn checked_sub(self, other: Money) -> Result<Money, DomainError> {
        self.0
            .checked_sub(other.0)
            .map(Money)
            .ok_or_else(|| DomainError::invariant("amount overflow"))
    }

    /// Sum of `amounts`, failing on the first overflow.
    pub fn total(amounts: impl IntoIterator<Item = Money>) -> Result<Money, DomainError> {
        amounts
            .into_iter()
            .try_fold(Money::ZERO, |acc, amount| acc.checked_add(amount))
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats_two_decimals() {
        assert_eq!(Money::from_cents(123_456).to_string(), "1234.56");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
        assert_eq!(Money::from_cents(-250).to_string(), "-2.50");
    }

    #[test]
    fn times_detects_overflow() {
        assert_eq!(Money::from_cents(250).times(4).unwrap(), Money::from_cents(1000));
        assert!(Money::from_cents(i64::MAX).times(2).is_err());
    }

    #[test]
    fn total_sums_and_detects_overflow() {
        let total = Money::total([100, 200, 300].into_iter().map(Money::from_cents)).unwrap();
        assert_eq!(total, Money::from_cents(600));
        assert_eq!(Money::total([Money::ZERO; 0]).unwrap(), Money::ZERO);

        let half = Money::from_cents(i64::MAX / 2 + 1);
        assert!(Money::total([half, half]).is_err());
        assert!(Money::from_cents(i64::MIN).checked_sub(Money::from_cents(1)).is_err());
    }

    #[test]
    fn serializes_as_plain_integer() {
        let json = serde_json::to_string(&Money::from_cents(1999)).unwrap();
        assert_eq!(json, "1999");
    }
}
