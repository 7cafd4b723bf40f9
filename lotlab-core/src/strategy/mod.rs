//! Strategies — turn a price series into one signal per tick.
//!
//! Signals are weights in [-1, 1]: positive asks for long exposure, negative
//! asks to reduce it, zero holds. A strategy sees only the bars and never the
//! engine state; it runs once per backtest, before execution starts.

mod builder;
mod ma_cross;

pub use builder::SignalBuilder;
pub use ma_cross::{sma, MaCrossover};

use crate::domain::Bar;

/// Trait for signal strategies.
pub trait Strategy: Send + Sync {
    /// Human-readable name (e.g., "buy_and_hold").
    fn name(&self) -> &str;

    /// One signal per bar, same length and order as `bars`.
    fn signals(&self, bars: &[Bar]) -> Vec<f64>;
}

pub fn closes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

pub fn opens(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.open).collect()
}

pub fn highs(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.high).collect()
}

pub fn lows(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.low).collect()
}

pub fn volumes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.volume as f64).collect()
}

/// Shift `series` forward by `periods`, padding the front with NaN.
///
/// `previous(&s, 1)[i] == s[i - 1]`. Comparisons against the NaN padding
/// are false, so masks built from shifted series stay off during warmup.
pub fn previous(series: &[f64], periods: usize) -> Vec<f64> {
    let n = series.len();
    let pad = periods.min(n);
    let mut out = vec![f64::NAN; pad];
    out.extend_from_slice(&series[..n - pad]);
    out
}

/// Enter fully on the first tick and never act again.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuyAndHold;

impl Strategy for BuyAndHold {
    fn name(&self) -> &str {
        "buy_and_hold"
    }

    fn signals(&self, bars: &[Bar]) -> Vec<f64> {
        let mut signals = vec![0.0; bars.len()];
        if let Some(first) = signals.first_mut() {
            *first = 1.0;
        }
        signals
    }
}

/// Replays a precomputed signal vector.
///
/// If the vector is shorter than the series the remaining ticks hold; if
/// longer it is truncated. Callers who want a hard length check should go
/// through `run_with_signals` instead.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedSignals {
    name: String,
    signals: Vec<f64>,
}

impl FixedSignals {
    pub fn new(name: impl Into<String>, signals: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            signals,
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.signals
    }
}

impl Strategy for FixedSignals {
    fn name(&self) -> &str {
        &self.name
    }

    fn signals(&self, bars: &[Bar]) -> Vec<f64> {
        let mut out: Vec<f64> = self.signals.iter().copied().take(bars.len()).collect();
        out.resize(bars.len(), 0.0);
        out
    }
}
