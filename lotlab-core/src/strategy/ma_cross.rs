//! Moving-average crossover.
//!
//! Buys fully when the fast SMA crosses above the slow SMA and sells fully
//! when it crosses below. Ticks without a cross hold.

use super::{closes, previous, SignalBuilder, Strategy};
use crate::domain::Bar;
use crate::error::EngineError;

/// Rolling mean over `period` values; NaN until the window is full.
///
/// A NaN inside the window makes that window's mean NaN.
pub fn sma(series: &[f64], period: usize) -> Vec<f64> {
    let n = series.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period {
        return result;
    }

    let mut sum: f64 = series[..period].iter().sum();
    result[period - 1] = sum / period as f64;
    for i in period..n {
        sum += series[i] - series[i - period];
        result[i] = sum / period as f64;
    }
    // Recompute windows touching a NaN; the rolling sum cannot recover from one.
    if series.iter().any(|v| v.is_nan()) {
        for (i, slot) in result.iter_mut().enumerate().skip(period - 1) {
            let window = &series[i + 1 - period..=i];
            *slot = window.iter().sum::<f64>() / period as f64;
        }
    }
    result
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaCrossover {
    short_period: usize,
    long_period: usize,
    name: String,
}

impl MaCrossover {
    pub fn new(short_period: usize, long_period: usize) -> Result<Self, EngineError> {
        if short_period == 0 || short_period >= long_period {
            return Err(EngineError::InvalidConfig(format!(
                "ma crossover needs 0 < short_period < long_period, got {short_period}/{long_period}"
            )));
        }
        Ok(Self {
            short_period,
            long_period,
            name: format!("ma_cross_{short_period}_{long_period}"),
        })
    }
}

impl Strategy for MaCrossover {
    fn name(&self) -> &str {
        &self.name
    }

    fn signals(&self, bars: &[Bar]) -> Vec<f64> {
        let c = closes(bars);
        let fast = sma(&c, self.short_period);
        let slow = sma(&c, self.long_period);
        let prev_fast = previous(&fast, 1);
        let prev_slow = previous(&slow, 1);

        let n = bars.len();
        let mut cross_up = vec![false; n];
        let mut cross_down = vec![false; n];
        for i in 0..n {
            cross_up[i] = fast[i] > slow[i] && prev_fast[i] <= prev_slow[i];
            cross_down[i] = fast[i] < slow[i] && prev_fast[i] >= prev_slow[i];
        }

        SignalBuilder::new(n)
            .buy(&cross_up, 1.0)
            .sell(&cross_down, 1.0)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn bars(closes: &[f64]) -> Vec<Bar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar {
                timestamp: start + Duration::days(i as i64),
                open: c,
                high: c,
                low: c,
                close: c,
                volume: 0,
            })
            .collect()
    }

    #[test]
    fn sma_basic() {
        let s = sma(&[1.0, 2.0, 3.0, 4.0], 2);
        assert!(s[0].is_nan());
        assert_eq!(&s[1..], &[1.5, 2.5, 3.5]);
        assert!(sma(&[1.0], 3).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn sma_nan_poisons_only_its_windows() {
        let s = sma(&[1.0, f64::NAN, 3.0, 4.0, 5.0], 2);
        assert!(s[1].is_nan());
        assert!(s[2].is_nan());
        assert_eq!(s[3], 3.5);
        assert_eq!(s[4], 4.5);
    }

    #[test]
    fn crossover_signals_on_turns() {
        // Down, then up, then down again
        let closes = [10.0, 9.0, 8.0, 7.0, 8.0, 10.0, 12.0, 11.0, 8.0, 6.0];
        let strategy = MaCrossover::new(2, 3).unwrap();
        let signals = strategy.signals(&bars(&closes));
        assert_eq!(signals.len(), closes.len());
        let first_buy = signals.iter().position(|&s| s == 1.0).unwrap();
        let first_sell = signals.iter().position(|&s| s == -1.0).unwrap();
        assert!(first_buy < first_sell);
        assert!(signals[..3].iter().all(|&s| s == 0.0), "warmup holds");
    }

    #[test]
    fn invalid_periods_rejected() {
        assert!(MaCrossover::new(0, 5).is_err());
        assert!(MaCrossover::new(5, 5).is_err());
        assert_eq!(MaCrossover::new(3, 8).unwrap().name(), "ma_cross_3_8");
    }
}
