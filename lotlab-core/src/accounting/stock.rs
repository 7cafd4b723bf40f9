use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{validate_positions, PnlMode, PositionBacktest, PositionBar, PositionModel};
use crate::error::EngineError;
use crate::lots::allocate;

/// Long-only stock model.
///
/// Desired positions are clipped at zero and fed through the FIFO lot
/// allocator, so shares bought fewer than `min_hold_days` sessions ago
/// cannot be sold. Every executed trade pays `fee_rate` of its notional.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StockModel {
    pub fee_rate: f64,
    pub min_hold_days: usize,
}

impl Default for StockModel {
    fn default() -> Self {
        Self {
            fee_rate: 0.001,
            min_hold_days: 3,
        }
    }
}

impl StockModel {
    pub fn with_min_hold_days(min_hold_days: usize) -> Self {
        Self {
            min_hold_days,
            ..Self::default()
        }
    }
}

impl PositionModel for StockModel {
    fn name(&self) -> &str {
        "stock"
    }

    fn evaluate(&self, bars: &[PositionBar], mode: PnlMode) -> Result<PositionBacktest, EngineError> {
        validate_positions(bars)?;
        if !(self.fee_rate.is_finite() && self.fee_rate >= 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "fee_rate must be non-negative, got {}",
                self.fee_rate
            )));
        }

        let dates: Vec<NaiveDate> = bars.iter().map(|b| b.timestamp.date()).collect();
        let desired: Vec<f64> = bars.iter().map(|b| b.position.max(0.0)).collect();
        let allocation = allocate(&dates, &desired, self.min_hold_days)?;

        let fees = allocation
            .trade_qty
            .iter()
            .zip(bars)
            .map(|(q, b)| q.abs() * b.close * self.fee_rate)
            .collect();

        Ok(PositionBacktest::from_columns(
            self.name(),
            mode,
            bars,
            allocation.effective_position,
            allocation.trade_qty,
            fees,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 8, day)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap()
    }

    fn rows(data: &[(f64, f64)]) -> Vec<PositionBar> {
        data.iter()
            .enumerate()
            .map(|(i, &(close, position))| PositionBar {
                timestamp: ts(1 + i as u32),
                close,
                position,
            })
            .collect()
    }

    #[test]
    fn exit_waits_for_hold_period() {
        let bars = rows(&[(10.0, 100.0), (11.0, 0.0), (12.0, 0.0), (13.0, 0.0), (14.0, 0.0)]);
        let bt = StockModel::default().evaluate(&bars, PnlMode::AfterFees).unwrap();
        assert_eq!(bt.position, vec![100.0, 100.0, 100.0, 0.0, 0.0]);
        assert_eq!(bt.trade_qty, vec![100.0, 0.0, 0.0, -100.0, 0.0]);
        // Held through three price moves of +1
        assert_eq!(bt.pnl_raw, vec![100.0, 100.0, 100.0, 0.0, 0.0]);
        assert!((bt.fees[0] - 1.0).abs() < 1e-12);
        assert!((bt.fees[3] - 1.3).abs() < 1e-12);
        assert!((bt.cumulative_pnl()[4] - (300.0 - 2.3)).abs() < 1e-9);
    }

    #[test]
    fn negative_intent_is_clipped() {
        let bars = rows(&[(10.0, -50.0), (10.0, -50.0)]);
        let bt = StockModel::default().evaluate(&bars, PnlMode::Raw).unwrap();
        assert!(bt.position.iter().all(|&p| p == 0.0));
        assert_eq!(bt.total_fees(), 0.0);
        assert_eq!(bt.pnl_percentage(), None);
    }

    #[test]
    fn custom_hold_period() {
        let bars = rows(&[(10.0, 5.0), (10.0, 0.0)]);
        let bt = StockModel::with_min_hold_days(1)
            .evaluate(&bars, PnlMode::Raw)
            .unwrap();
        assert_eq!(bt.trade_qty, vec![5.0, -5.0]);
    }

    #[test]
    fn bad_fee_rate_rejected() {
        let model = StockModel {
            fee_rate: -1.0,
            min_hold_days: 3,
        };
        assert!(matches!(
            model.evaluate(&rows(&[(10.0, 1.0)]), PnlMode::Raw),
            Err(EngineError::InvalidConfig(_))
        ));
    }
}
