//! Margin-based sale pricing for goods received.

use serde::{Deserialize, Serialize};

use tillstack_core::{DomainError, DomainResult, Money};

const BPS_PER_PERCENT: i64 = 100;
const FULL: i64 = 100 * BPS_PER_PERCENT;

/// Markup over cost, in basis points (0..=10000, i.e. 0%..=100%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Margin(u32);

impl Margin {
    /// Convert a percentage such as `35.5` to basis points.
    pub fn from_percent(percent: f64) -> DomainResult<Margin> {
        if !percent.is_finite() || !(0.0..=100.0).contains(&percent) {
            return Err(DomainError::field("margin", "must be between 0 and 100"));
        }
        Ok(Margin((percent * BPS_PER_PERCENT as f64).round() as u32))
    }

    pub fn basis_points(self) -> u32 {
        self.0
    }

    /// `cost × (1 + margin)`, rounded half up to the nearest cent.
    pub fn price_from_cost(self, cost: Money) -> DomainResult<Money> {
        let scaled = i128::from(cost.cents()) * i128::from(FULL + i64::from(self.0));
        let half = i128::from(FULL / 2);
        let rounded = if scaled >= 0 {
            (scaled + half) / i128::from(FULL)
        } else {
            (scaled - half) / i128::from(FULL)
        };
        i64::try_from(rounded)
            .map(Money::from_cents)
            .map_err(|_| DomainError::invariant("price overflow"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thirty_percent_over_ten() {
        let m = Margin::from_percent(30.0).unwrap();
        assert_eq!(m.basis_points(), 3000);
        assert_eq!(m.price_from_cost(Money::from_cents(1000)).unwrap(), Money::from_cents(1300));
    }

    #[test]
    fn rounds_half_up() {
        // 3.33 * 1.15 = 3.8295 -> 3.83
        let m = Margin::from_percent(15.0).unwrap();
        assert_eq!(m.price_from_cost(Money::from_cents(333)).unwrap(), Money::from_cents(383));
        // 0.01 * 1.5 = 0.015 -> 0.02
        let m = Margin::from_percent(50.0).unwrap();
        assert_eq!(m.price_from_cost(Money::from_cents(1)).unwrap(), Money::from_cents(2));
    }

    #[test]
    fn fractional_percent_keeps_basis_point_precision() {
        assert_eq!(Margin::from_percent(12.34).unwrap().basis_points(), 1234);
    }

    #[test]
    fn out_of_range_is_a_field_error() {
        assert!(Margin::from_percent(-0.5).is_err());
        assert!(Margin::from_percent(100.01).is_err());
        assert!(Margin::from_percent(f64::NAN).is_err());
        assert!(Margin::from_percent(100.0).is_ok());
    }
}
