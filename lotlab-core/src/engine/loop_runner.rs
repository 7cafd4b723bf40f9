//! Run driver — strategy signals in, finalized ledger out.
//!
//! 1. Ask the strategy for its signals (once, before execution)
//! 2. Validate signals against the series
//! 3. `reset` the engine, `step` every tick in order
//! 4. Finalize the ledger and collect diagnostics

use serde::{Deserialize, Serialize};
use tracing::info;

use super::state::{EngineConfig, RunState};
use super::stock_engine::StockEngine;
use crate::data::validate_signals;
use crate::domain::{Bar, Shares};
use crate::error::EngineError;
use crate::ledger::LedgerTable;
use crate::strategy::Strategy;

/// Counters that explain how a run reached its result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunDiagnostics {
    pub ticks: usize,
    pub total_bought: Shares,
    pub total_sold: Shares,
    /// Ticks on which a sell had to wait for settled shares.
    pub deferred_sells: usize,
    pub expired_backlogs: usize,
    /// Sell weight still pending when the series ended.
    pub final_backlog: f64,
    pub final_open_size: Shares,
    /// Open shares still in T0/T1/T2 when the series ended.
    #[serde(default)]
    pub final_unsettled: Shares,
}

impl RunDiagnostics {
    fn from_state(state: &RunState, ticks: usize) -> Self {
        Self {
            ticks,
            total_bought: state.total_bought,
            total_sold: state.total_sold,
            deferred_sells: state.deferred_sells,
            expired_backlogs: state.expired_backlogs,
            final_backlog: state.pending_sell_pos,
            final_open_size: state.current_open_size,
            final_unsettled: state.buckets.unsettled(),
        }
    }
}

/// Output of one signal-driven run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub strategy_name: String,
    pub config: EngineConfig,
    pub signals: Vec<f64>,
    pub table: LedgerTable,
    pub final_state: RunState,
    pub benchmark_open_size: Shares,
    pub benchmark_entry_fee: f64,
    pub diagnostics: RunDiagnostics,
}

/// Run `strategy` over `bars`.
pub fn run_backtest(
    bars: &[Bar],
    strategy: &dyn Strategy,
    config: &EngineConfig,
) -> Result<RunResult, EngineError> {
    let signals = strategy.signals(bars);
    run_with_signals(bars, strategy.name(), signals, config)
}

/// Run a precomputed signal vector over `bars`.
///
/// Fails before any tick executes if the vector length differs from the
/// series or any signal is outside [-1, 1].
pub fn run_with_signals(
    bars: &[Bar],
    name: &str,
    signals: Vec<f64>,
    config: &EngineConfig,
) -> Result<RunResult, EngineError> {
    validate_signals(&signals, bars.len())?;

    let mut engine = StockEngine::new(config.clone())?;
    engine.reset(bars)?;
    for (tick, &signal) in signals.iter().enumerate() {
        engine.step(tick, signal)?;
    }

    let table = engine.done();
    let final_state = engine.state().cloned().ok_or(EngineError::NotReset)?;
    let benchmark = engine.benchmark().ok_or(EngineError::NotReset)?;
    let diagnostics = RunDiagnostics::from_state(&final_state, table.len());

    info!(
        strategy = name,
        ticks = table.len(),
        final_equity = table.final_equity().unwrap_or(config.initial_cash),
        final_bm_equity = table.final_bm_equity().unwrap_or(config.initial_cash),
        deferred_sells = diagnostics.deferred_sells,
        "backtest complete"
    );

    Ok(RunResult {
        strategy_name: name.to_string(),
        config: config.clone(),
        signals,
        benchmark_open_size: benchmark.open_size(),
        benchmark_entry_fee: benchmark.entry_fee(),
        table,
        final_state,
        diagnostics,
    })
}
