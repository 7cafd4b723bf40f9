//! Run ledger — per-tick history and the finalized result table.
//!
//! The engine appends one `HistoryRecord` per tick. `finalize` derives the
//! strategy and benchmark return columns into a new `LedgerTable` without
//! touching the recorded rows, so it can be called any number of times.

pub mod returns;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::{Action, HistoryRecord};
use crate::fingerprint::fingerprint_records;

pub use returns::{cumulative_returns, step_returns};

/// Append-only per-tick history of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    records: Vec<HistoryRecord>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, record: HistoryRecord) {
        self.records.push(record);
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<&HistoryRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Build the result table with step and cumulative return columns filled.
    pub fn finalize(&self) -> LedgerTable {
        let equity: Vec<f64> = self.records.iter().map(|r| r.equity).collect();
        let bm_equity: Vec<f64> = self.records.iter().map(|r| r.bm_equity).collect();

        let (step_ret, equity_exhausted_at) = step_returns(&equity);
        let cum_ret = cumulative_returns(&step_ret);
        let (bm_step_ret, bm_equity_exhausted_at) = step_returns(&bm_equity);
        let bm_cum_ret = cumulative_returns(&bm_step_ret);

        if let Some(tick) = equity_exhausted_at {
            warn!(tick, "strategy equity reached zero; later returns are undefined");
        }
        if let Some(tick) = bm_equity_exhausted_at {
            warn!(tick, "benchmark equity reached zero; later returns are undefined");
        }

        let rows = self
            .records
            .iter()
            .enumerate()
            .map(|(i, r)| HistoryRecord {
                step_ret: step_ret[i],
                cum_ret: cum_ret[i],
                bm_step_ret: bm_step_ret[i],
                bm_cum_ret: bm_cum_ret[i],
                ..r.clone()
            })
            .collect();

        LedgerTable {
            rows,
            equity_exhausted_at,
            bm_equity_exhausted_at,
        }
    }
}

/// Per-action tick counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCounts {
    pub buys: usize,
    pub sells: usize,
    pub holds: usize,
}

/// Finalized ledger: one row per tick, in time order, with return columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerTable {
    pub rows: Vec<HistoryRecord>,
    /// First tick whose strategy step return is undefined (prior equity zero).
    pub equity_exhausted_at: Option<usize>,
    /// Same, for the benchmark.
    pub bm_equity_exhausted_at: Option<usize>,
}

impl LedgerTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn equity(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.equity).collect()
    }

    pub fn bm_equity(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.bm_equity).collect()
    }

    pub fn step_returns(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.step_ret).collect()
    }

    pub fn cumulative_returns(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.cum_ret).collect()
    }

    pub fn bm_step_returns(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.bm_step_ret).collect()
    }

    pub fn bm_cumulative_returns(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.bm_cum_ret).collect()
    }

    pub fn final_equity(&self) -> Option<f64> {
        self.rows.last().map(|r| r.equity)
    }

    pub fn final_bm_equity(&self) -> Option<f64> {
        self.rows.last().map(|r| r.bm_equity)
    }

    pub fn total_fees(&self) -> f64 {
        self.rows.iter().map(|r| r.fee).sum()
    }

    pub fn action_counts(&self) -> ActionCounts {
        let mut counts = ActionCounts::default();
        for row in &self.rows {
            match row.action {
                Action::Buy => counts.buys += 1,
                Action::Sell => counts.sells += 1,
                Action::Hold => counts.holds += 1,
            }
        }
        counts
    }

    /// BLAKE3 over every row; identical runs produce identical fingerprints.
    pub fn fingerprint(&self) -> String {
        fingerprint_records(&self.rows)
    }
}
