//! Vectorized PnL and fee accounting for a supplied position path.
//!
//! Unlike the signal engine, these models take the position held at every
//! bar as given and only price it:
//!
//! - `pnl_raw[i] = (close[i+1] - close[i]) * position[i]`, zero on the last bar
//! - `pnl_after_fees[i] = pnl_raw[i] - fees[i]`
//!
//! Two fee models implement `PositionModel`: per-contract derivatives fees
//! and percentage-of-notional stock fees with a minimum holding period.

mod derivatives;
mod stock;

pub use derivatives::DerivativesModel;
pub use stock::StockModel;

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::data::DayGroups;
use crate::error::EngineError;

/// Which PnL column the reporting methods read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PnlMode {
    Raw,
    #[default]
    AfterFees,
}

impl PnlMode {
    pub fn as_str(self) -> &'static str {
        match self {
            PnlMode::Raw => "raw",
            PnlMode::AfterFees => "after_fees",
        }
    }
}

impl fmt::Display for PnlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PnlMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw" => Ok(PnlMode::Raw),
            "after_fees" => Ok(PnlMode::AfterFees),
            other => Err(EngineError::InvalidPnlMode(other.to_string())),
        }
    }
}

/// One row of a position series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionBar {
    pub timestamp: NaiveDateTime,
    pub close: f64,
    /// Desired (stock) or held (derivatives) quantity after this bar.
    pub position: f64,
}

/// A fee model over a position series.
pub trait PositionModel: Send + Sync {
    fn name(&self) -> &str;

    fn evaluate(&self, bars: &[PositionBar], mode: PnlMode) -> Result<PositionBacktest, EngineError>;
}

/// Check a position series: non-empty, strictly ascending timestamps,
/// finite positive closes, finite positions.
pub fn validate_positions(bars: &[PositionBar]) -> Result<(), EngineError> {
    if bars.is_empty() {
        return Err(EngineError::EmptySeries);
    }
    for (tick, bar) in bars.iter().enumerate() {
        if !bar.close.is_finite() || bar.close <= 0.0 {
            return Err(EngineError::InvalidPrice {
                tick,
                value: bar.close,
            });
        }
        if !bar.position.is_finite() {
            return Err(EngineError::InvalidPosition {
                tick,
                value: bar.position,
            });
        }
        if tick > 0 && bar.timestamp <= bars[tick - 1].timestamp {
            return Err(EngineError::UnsortedTimestamps { tick });
        }
    }
    Ok(())
}

/// Hold-to-next-bar PnL: `(close[i+1] - close[i]) * position[i]`, last bar 0.
pub fn raw_pnl(closes: &[f64], positions: &[f64]) -> Vec<f64> {
    let n = closes.len().min(positions.len());
    (0..n)
        .map(|i| {
            if i + 1 < n {
                (closes[i + 1] - closes[i]) * positions[i]
            } else {
                0.0
            }
        })
        .collect()
}

/// Priced position series produced by a `PositionModel`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionBacktest {
    pub model: String,
    pub mode: PnlMode,
    pub timestamps: Vec<NaiveDateTime>,
    pub close: Vec<f64>,
    /// Position actually held after each bar.
    pub position: Vec<f64>,
    /// Signed change in held position at each bar.
    pub trade_qty: Vec<f64>,
    pub pnl_raw: Vec<f64>,
    pub fees: Vec<f64>,
    pub pnl_after_fees: Vec<f64>,
}

/// Headline numbers of a `PositionBacktest`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountingSummary {
    pub model: String,
    pub mode: PnlMode,
    pub bars: usize,
    pub days: usize,
    pub total_pnl: f64,
    pub total_fees: f64,
    pub minimum_capital: f64,
    /// Final daily cumulative PnL over minimum capital; `None` when the
    /// minimum capital is zero.
    pub return_on_capital: Option<f64>,
    pub avg_pos: f64,
}

impl PositionBacktest {
    /// Assemble from priced columns, deriving `pnl_after_fees`.
    pub(crate) fn from_columns(
        model: &str,
        mode: PnlMode,
        bars: &[PositionBar],
        position: Vec<f64>,
        trade_qty: Vec<f64>,
        fees: Vec<f64>,
    ) -> Self {
        let close: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let pnl_raw = raw_pnl(&close, &position);
        let pnl_after_fees = pnl_raw.iter().zip(&fees).map(|(p, f)| p - f).collect();
        Self {
            model: model.to_string(),
            mode,
            timestamps: bars.iter().map(|b| b.timestamp).collect(),
            close,
            position,
            trade_qty,
            pnl_raw,
            fees,
            pnl_after_fees,
        }
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Per-bar PnL in the selected mode.
    pub fn pnl_series(&self) -> &[f64] {
        match self.mode {
            PnlMode::Raw => &self.pnl_raw,
            PnlMode::AfterFees => &self.pnl_after_fees,
        }
    }

    /// Running sum of per-bar PnL.
    pub fn cumulative_pnl(&self) -> Vec<f64> {
        self.pnl_series()
            .iter()
            .scan(0.0, |acc, p| {
                *acc += p;
                Some(*acc)
            })
            .collect()
    }

    fn day_groups(&self) -> DayGroups {
        let dates: Vec<NaiveDate> = self.timestamps.iter().map(|t| t.date()).collect();
        DayGroups::from_dates(&dates)
    }

    /// PnL summed per calendar date, then accumulated across dates.
    pub fn daily_pnl(&self) -> Vec<(NaiveDate, f64)> {
        let groups = self.day_groups();
        let mut acc = 0.0;
        groups
            .sum(self.pnl_series())
            .into_iter()
            .zip(groups.dates)
            .map(|(day, date)| {
                acc += day;
                (date, acc)
            })
            .collect()
    }

    /// Largest `|position| * close - cumulative PnL before this bar`,
    /// floored at zero.
    pub fn estimate_minimum_capital(&self) -> f64 {
        let mut prior_pnl = 0.0;
        let mut required = f64::NEG_INFINITY;
        for ((pos, close), pnl) in self.position.iter().zip(&self.close).zip(self.pnl_series()) {
            required = required.max(pos.abs() * close - prior_pnl);
            prior_pnl += pnl;
        }
        required.max(0.0)
    }

    /// Daily cumulative PnL as a fraction of minimum capital.
    ///
    /// `None` when the minimum capital is zero (the strategy never holds).
    pub fn pnl_percentage(&self) -> Option<Vec<(NaiveDate, f64)>> {
        let capital = self.estimate_minimum_capital();
        if capital == 0.0 {
            return None;
        }
        Some(
            self.daily_pnl()
                .into_iter()
                .map(|(date, pnl)| (date, pnl / capital))
                .collect(),
        )
    }

    /// Average absolute position change per calendar day.
    pub fn avg_pos(&self) -> f64 {
        let turnover: f64 = self
            .position
            .windows(2)
            .map(|w| (w[1] - w[0]).abs())
            .sum();
        turnover / self.day_groups().len().max(1) as f64
    }

    pub fn total_fees(&self) -> f64 {
        self.fees.iter().sum()
    }

    pub fn summary(&self) -> AccountingSummary {
        let daily = self.daily_pnl();
        let minimum_capital = self.estimate_minimum_capital();
        let total_pnl = daily.last().map_or(0.0, |(_, p)| *p);
        AccountingSummary {
            model: self.model.clone(),
            mode: self.mode,
            bars: self.len(),
            days: daily.len(),
            total_pnl,
            total_fees: self.total_fees(),
            minimum_capital,
            return_on_capital: (minimum_capital != 0.0).then(|| total_pnl / minimum_capital),
            avg_pos: self.avg_pos(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 7, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn bt(rows: &[(NaiveDateTime, f64, f64)], fees: Vec<f64>, mode: PnlMode) -> PositionBacktest {
        let bars: Vec<PositionBar> = rows
            .iter()
            .map(|&(timestamp, close, position)| PositionBar {
                timestamp,
                close,
                position,
            })
            .collect();
        let position: Vec<f64> = bars.iter().map(|b| b.position).collect();
        let trade_qty = vec![0.0; bars.len()];
        PositionBacktest::from_columns("test", mode, &bars, position, trade_qty, fees)
    }

    #[test]
    fn pnl_mode_parses() {
        assert_eq!("raw".parse::<PnlMode>().unwrap(), PnlMode::Raw);
        assert_eq!("after_fees".parse::<PnlMode>().unwrap(), PnlMode::AfterFees);
        assert_eq!(
            "net".parse::<PnlMode>().unwrap_err(),
            EngineError::InvalidPnlMode("net".into())
        );
        assert_eq!(PnlMode::default(), PnlMode::AfterFees);
        assert_eq!(PnlMode::AfterFees.to_string(), "after_fees");
    }

    #[test]
    fn raw_pnl_holds_to_next_bar() {
        assert_eq!(raw_pnl(&[10.0, 12.0, 11.0], &[1.0, 2.0, 5.0]), vec![2.0, -2.0, 0.0]);
        assert!(raw_pnl(&[], &[]).is_empty());
    }

    #[test]
    fn daily_pnl_groups_by_date() {
        let b = bt(
            &[
                (ts(1, 9), 10.0, 1.0),
                (ts(1, 10), 11.0, 1.0),
                (ts(2, 9), 13.0, 0.0),
                (ts(3, 9), 13.0, 0.0),
            ],
            vec![0.0; 4],
            PnlMode::Raw,
        );
        assert_eq!(b.pnl_raw, vec![1.0, 2.0, 0.0, 0.0]);
        let daily = b.daily_pnl();
        assert_eq!(daily.len(), 3);
        assert_eq!(daily[0], (ts(1, 0).date(), 3.0));
        assert_eq!(daily[2].1, 3.0);
        assert_eq!(b.cumulative_pnl(), vec![1.0, 3.0, 3.0, 3.0]);
    }

    #[test]
    fn minimum_capital_uses_prior_cumulative_pnl() {
        let b = bt(
            &[(ts(1, 9), 10.0, 1.0), (ts(2, 9), 20.0, 1.0), (ts(3, 9), 5.0, 0.0)],
            vec![0.0; 3],
            PnlMode::Raw,
        );
        // required: 10 - 0, 20 - 10, 0 - (-5)
        assert_eq!(b.estimate_minimum_capital(), 10.0);
        let pct = b.pnl_percentage().unwrap();
        assert_eq!(pct.last().unwrap().1, -0.5);
    }

    #[test]
    fn flat_strategy_has_no_percentage() {
        let b = bt(
            &[(ts(1, 9), 10.0, 0.0), (ts(2, 9), 20.0, 0.0)],
            vec![0.0; 2],
            PnlMode::Raw,
        );
        assert_eq!(b.estimate_minimum_capital(), 0.0);
        assert_eq!(b.pnl_percentage(), None);
        assert_eq!(b.summary().return_on_capital, None);
    }

    #[test]
    fn mode_selects_column() {
        let rows = [(ts(1, 9), 10.0, 1.0), (ts(2, 9), 11.0, 1.0)];
        let raw = bt(&rows, vec![0.25, 0.0], PnlMode::Raw);
        let net = bt(&rows, vec![0.25, 0.0], PnlMode::AfterFees);
        assert_eq!(raw.cumulative_pnl().last(), Some(&1.0));
        assert_eq!(net.cumulative_pnl().last(), Some(&0.75));
        assert_eq!(net.total_fees(), 0.25);
    }

    #[test]
    fn avg_pos_is_turnover_per_day() {
        let b = bt(
            &[
                (ts(1, 9), 10.0, 0.0),
                (ts(1, 10), 10.0, 2.0),
                (ts(2, 9), 10.0, 1.0),
                (ts(2, 10), 10.0, 3.0),
            ],
            vec![0.0; 4],
            PnlMode::Raw,
        );
        // |2| + |-1| + |2| over 2 days
        assert_eq!(b.avg_pos(), 2.5);
    }

    #[test]
    fn validation_rejects_bad_rows() {
        let ok = PositionBar {
            timestamp: ts(1, 9),
            close: 10.0,
            position: 1.0,
        };
        assert_eq!(validate_positions(&[]), Err(EngineError::EmptySeries));
        let bad = PositionBar {
            position: f64::NAN,
            ..ok
        };
        assert!(matches!(
            validate_positions(&[bad]),
            Err(EngineError::InvalidPosition { tick: 0, .. })
        ));
        assert_eq!(
            validate_positions(&[ok, ok]),
            Err(EngineError::UnsortedTimestamps { tick: 1 })
        );
    }
}
