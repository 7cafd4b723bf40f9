//! Buy-and-hold comparator.
//!
//! Buys once at the first price, pays the entry fee, then only marks to
//! market. It never trades again.

use serde::{Deserialize, Serialize};

use super::cost_model::{max_affordable_shares, FeeSchedule};
use crate::domain::Shares;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkTracker {
    open_size: Shares,
    entry_fee: f64,
    equity: f64,
}

impl BenchmarkTracker {
    /// Enter the benchmark position at `init_price`.
    pub fn enter(initial_cash: f64, init_price: f64, lot_size: Shares, fees: &FeeSchedule) -> Self {
        let open_size = max_affordable_shares(initial_cash, init_price, lot_size);
        let entry_fee = fees.fee(init_price, open_size);
        Self {
            open_size,
            entry_fee,
            equity: initial_cash - entry_fee,
        }
    }

    /// Mark to market between two consecutive prices; returns the tick's PnL.
    pub fn mark(&mut self, price: f64, prev_price: f64) -> f64 {
        let pnl = self.open_size as f64 * (price - prev_price);
        self.equity += pnl;
        pnl
    }

    pub fn open_size(&self) -> Shares {
        self.open_size
    }

    pub fn entry_fee(&self) -> f64 {
        self.entry_fee
    }

    pub fn equity(&self) -> f64 {
        self.equity
    }
}
