//! Lot rounding and per-trade fees.
//!
//! Fees are a flat fraction of traded notional, charged symmetrically on buys
//! and sells.

use crate::domain::Shares;
use serde::{Deserialize, Serialize};

/// Round a raw share quantity to a multiple of `lot_size`.
///
/// A remainder strictly below half a lot rounds down; a remainder of half a
/// lot or more rounds up. `round_to_lot(249.0, 100) == 200`,
/// `round_to_lot(250.0, 100) == 300`.
///
/// Negative or non-finite inputs round to zero, as does a zero lot size.
pub fn round_to_lot(value: f64, lot_size: Shares) -> Shares {
    if lot_size == 0 || !value.is_finite() || value <= 0.0 {
        return 0;
    }
    let lot = lot_size as f64;
    let remainder = value % lot;
    let rounded = if remainder < lot / 2.0 {
        value - remainder
    } else {
        value + (lot - remainder)
    };
    // `rounded` is a lot multiple up to float error; snap before the cast.
    rounded.round() as Shares
}

/// Largest lot-rounded share count `cash` can buy at `price`.
///
/// Cash is floor-divided by price before lot rounding, so the result can
/// exceed what `cash` strictly affords by up to half a lot.
pub fn max_affordable_shares(cash: f64, price: f64, lot_size: Shares) -> Shares {
    if price <= 0.0 {
        return 0;
    }
    round_to_lot((cash / price).floor(), lot_size)
}

/// Percentage-of-notional fee schedule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// Fraction of traded notional, e.g. 0.001 = 0.1%.
    pub rate: f64,
}

impl FeeSchedule {
    pub fn new(rate: f64) -> Self {
        Self { rate }
    }

    pub fn frictionless() -> Self {
        Self::new(0.0)
    }

    /// `fee = price * shares * rate`
    pub fn fee(&self, price: f64, shares: Shares) -> f64 {
        price * shares as f64 * self.rate
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self::new(0.001)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_down_below_half_lot() {
        assert_eq!(round_to_lot(249.0, 100), 200);
        assert_eq!(round_to_lot(1_049.9, 100), 1_000);
    }

    #[test]
    fn exact_half_lot_rounds_up() {
        assert_eq!(round_to_lot(250.0, 100), 300);
        assert_eq!(round_to_lot(50.0, 100), 100);
    }

    #[test]
    fn multiples_are_unchanged() {
        assert_eq!(round_to_lot(0.0, 100), 0);
        assert_eq!(round_to_lot(700.0, 100), 700);
    }

    #[test]
    fn degenerate_inputs_round_to_zero() {
        assert_eq!(round_to_lot(-150.0, 100), 0);
        assert_eq!(round_to_lot(f64::NAN, 100), 0);
        assert_eq!(round_to_lot(150.0, 0), 0);
    }

    #[test]
    fn lot_of_one_is_nearest_integer_half_up() {
        assert_eq!(round_to_lot(2.4, 1), 2);
        assert_eq!(round_to_lot(2.5, 1), 3);
    }

    #[test]
    fn affordable_shares_floor_then_round() {
        // 1_000_000 / 3_000 = 333.33 → floor 333 → round to 300
        assert_eq!(max_affordable_shares(1_000_000.0, 3_000.0, 100), 300);
        // 1_000_000 / 2_000 = 500 exactly
        assert_eq!(max_affordable_shares(1_000_000.0, 2_000.0, 100), 500);
        assert_eq!(max_affordable_shares(1_000_000.0, 0.0, 100), 0);
    }

    #[test]
    fn fee_is_rate_of_notional() {
        let fees = FeeSchedule::new(0.001);
        assert!((fees.fee(100.0, 1_000) - 100.0).abs() < 1e-10);
        assert_eq!(FeeSchedule::frictionless().fee(100.0, 1_000), 0.0);
    }
}
