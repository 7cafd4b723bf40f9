use serde::{Deserialize, Serialize};

use super::{validate_positions, PnlMode, PositionBacktest, PositionBar, PositionModel};
use crate::error::EngineError;

/// Futures-style model with flat per-contract fees.
///
/// - `transaction_fee` per unit of `|Δposition|`; the first bar has no Δ
/// - `overnight_fee` on every bar that opens a new calendar date (the first
///   bar included) while the position is long
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DerivativesModel {
    pub transaction_fee: f64,
    pub overnight_fee: f64,
}

impl Default for DerivativesModel {
    fn default() -> Self {
        Self {
            transaction_fee: 2_700.0 / 100_000.0,
            overnight_fee: 2_550.0 / 100_000.0,
        }
    }
}

impl PositionModel for DerivativesModel {
    fn name(&self) -> &str {
        "derivatives"
    }

    fn evaluate(&self, bars: &[PositionBar], mode: PnlMode) -> Result<PositionBacktest, EngineError> {
        validate_positions(bars)?;

        let position: Vec<f64> = bars.iter().map(|b| b.position).collect();
        let mut trade_qty = Vec::with_capacity(bars.len());
        let mut fees = Vec::with_capacity(bars.len());
        for (i, bar) in bars.iter().enumerate() {
            let (delta, new_day) = match i {
                0 => (0.0, true),
                _ => (
                    bar.position - bars[i - 1].position,
                    bar.timestamp.date() != bars[i - 1].timestamp.date(),
                ),
            };
            let overnight = if new_day && bar.position > 0.0 {
                self.overnight_fee
            } else {
                0.0
            };
            trade_qty.push(delta);
            fees.push(delta.abs() * self.transaction_fee + overnight);
        }

        Ok(PositionBacktest::from_columns(
            self.name(),
            mode,
            bars,
            position,
            trade_qty,
            fees,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn ts(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 9, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn bar(timestamp: NaiveDateTime, close: f64, position: f64) -> PositionBar {
        PositionBar {
            timestamp,
            close,
            position,
        }
    }

    #[test]
    fn fees_follow_position_changes_and_rollovers() {
        let model = DerivativesModel::default();
        let bars = [
            bar(ts(3, 9), 1_000.0, 2.0),
            bar(ts(3, 10), 1_001.0, 3.0),
            bar(ts(4, 9), 1_003.0, 3.0),
            bar(ts(4, 10), 1_002.0, 0.0),
        ];
        let bt = model.evaluate(&bars, PnlMode::AfterFees).unwrap();
        assert_eq!(bt.trade_qty, vec![0.0, 1.0, 0.0, -3.0]);
        let expected = [
            0.0255,         // first bar opens a date while long
            0.027,          // +1 contract
            0.0255,         // rollover while long
            3.0 * 0.027,    // flatten
        ];
        for (got, want) in bt.fees.iter().zip(expected) {
            assert!((got - want).abs() < 1e-12, "{got} vs {want}");
        }
        assert_eq!(bt.pnl_raw, vec![2.0, 6.0, -3.0, 0.0]);
    }

    #[test]
    fn shorts_pay_no_overnight_fee() {
        let model = DerivativesModel::default();
        let bars = [bar(ts(3, 9), 1_000.0, -1.0), bar(ts(4, 9), 990.0, -1.0)];
        let bt = model.evaluate(&bars, PnlMode::AfterFees).unwrap();
        assert_eq!(bt.fees, vec![0.0, 0.0]);
        assert_eq!(bt.pnl_raw, vec![10.0, 0.0]);
        // Short exposure still needs capital
        assert_eq!(bt.estimate_minimum_capital(), 1_000.0);
    }

    #[test]
    fn raw_mode_ignores_fees() {
        let model = DerivativesModel::default();
        let bars = [bar(ts(3, 9), 10.0, 1.0), bar(ts(4, 9), 12.0, 1.0)];
        let bt = model.evaluate(&bars, PnlMode::Raw).unwrap();
        assert_eq!(bt.cumulative_pnl(), vec![2.0, 2.0]);
        assert!(bt.total_fees() > 0.0);
    }
}
