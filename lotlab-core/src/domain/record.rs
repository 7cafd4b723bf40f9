//! HistoryRecord — one ledger row per tick.

use super::action::Action;
use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};

/// Snapshot of a single tick's outcome.
///
/// Appended once per tick by the engine. The four return columns are zero
/// until the ledger is finalized. Undefined returns are `NaN`, which JSON
/// writes as `null`; `null` reads back as `NaN`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub time: NaiveDateTime,
    pub current_tick: usize,
    /// Executed weight change: positive on buys, negative on sells, zero otherwise.
    pub signal: f64,
    pub action: Action,
    /// Shares traded this tick.
    pub amount: u64,
    /// Market value of the open position after the trade.
    pub value: f64,
    pub price: f64,
    pub fee: f64,
    pub equity: f64,
    pub bm_equity: f64,
    #[serde(deserialize_with = "nan_from_null")]
    pub step_ret: f64,
    #[serde(deserialize_with = "nan_from_null")]
    pub cum_ret: f64,
    #[serde(deserialize_with = "nan_from_null")]
    pub bm_step_ret: f64,
    #[serde(deserialize_with = "nan_from_null")]
    pub bm_cum_ret: f64,
}

fn nan_from_null<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}
