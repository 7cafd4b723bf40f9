//! Backtest runner — wires together config, data, engine, and metrics.
//!
//! Entry points:
//! - `run_single_backtest()`: loads data per config, then runs. Used by the CLI.
//! - `run_backtest_from_data()`: takes pre-loaded data. No I/O.
//! - `run_batch()`: many configs in parallel.
//! - `run_position_backtest()`: prices a position CSV with an accounting model.

use std::path::Path;

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use lotlab_core::accounting::{AccountingSummary, PnlMode, PositionBacktest, PositionModel};
use lotlab_core::engine::{run_backtest, run_with_signals, RunResult};
use lotlab_core::EngineError;

use crate::config::{BacktestConfig, ConfigError};
use crate::data_loader::{load_bars, load_position_csv, DataSource, LoadError, LoadedData};
use crate::metrics::PerformanceSummary;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single signal-driven backtest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub name: String,
    pub symbol: String,
    pub run_id: String,
    pub config_id: String,
    pub dataset_hash: String,
    pub data_source: DataSource,
    pub has_synthetic: bool,
    pub start: String,
    pub end: String,
    pub run: RunResult,
    /// Metrics over the strategy's step returns.
    pub metrics: PerformanceSummary,
    /// Same metrics over the buy-and-hold benchmark.
    pub benchmark_metrics: PerformanceSummary,
}

/// Default schema version for serde deserialization of older JSON without the field.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestResult {
    pub fn final_equity(&self) -> f64 {
        self.run
            .table
            .final_equity()
            .unwrap_or(self.run.config.initial_cash)
    }

    pub fn final_bm_equity(&self) -> f64 {
        self.run
            .table
            .final_bm_equity()
            .unwrap_or(self.run.config.initial_cash)
    }
}

/// Run a single backtest from a `BacktestConfig`, loading its data.
pub fn run_single_backtest(config: &BacktestConfig) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let loaded = load_bars(&config.backtest.data, &config.backtest.symbol)?;
    run_backtest_from_data(config, &loaded)
}

/// Run a backtest with pre-loaded data. No bar I/O.
///
/// Replayed signals (`FIXED`, `SIGNAL_FILE`) must match the series length
/// exactly; generated signals always do.
pub fn run_backtest_from_data(
    config: &BacktestConfig,
    loaded: &LoadedData,
) -> Result<BacktestResult, RunError> {
    let name = &config.backtest.name;
    let engine_config = &config.backtest.engine;

    let run = match config.strategy.explicit_signals()? {
        Some(signals) => run_with_signals(&loaded.bars, name, signals, engine_config)?,
        None => {
            let strategy = config.strategy.build(name)?;
            run_backtest(&loaded.bars, strategy.as_ref(), engine_config)?
        }
    };

    let metrics = PerformanceSummary::compute(&run.table.step_returns());
    let benchmark_metrics = PerformanceSummary::compute(&run.table.bm_step_returns());
    if let Some(tick) = run.table.equity_exhausted_at {
        warn!(tick, "equity reached zero; later step returns are undefined");
    }

    let run_id = config.run_id(&loaded.dataset_hash);
    let start = run.table.rows.first().map(|r| r.time.to_string()).unwrap_or_default();
    let end = run.table.rows.last().map(|r| r.time.to_string()).unwrap_or_default();

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        name: name.clone(),
        symbol: config.backtest.symbol.clone(),
        run_id: run_id.hash(),
        config_id: run_id.config_id.0.clone(),
        dataset_hash: loaded.dataset_hash.0.clone(),
        data_source: loaded.source,
        has_synthetic: loaded.has_synthetic,
        start,
        end,
        run,
        metrics,
        benchmark_metrics,
    })
}

/// Run many configs in parallel. Results keep the input order.
pub fn run_batch(configs: &[BacktestConfig]) -> Vec<Result<BacktestResult, RunError>> {
    let results: Vec<_> = configs.par_iter().map(run_single_backtest).collect();
    let failed = results.iter().filter(|r| r.is_err()).count();
    info!(runs = configs.len(), failed, "batch complete");
    results
}

/// Priced position series plus its derived reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionReport {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub source: String,
    pub summary: AccountingSummary,
    pub daily_pnl: Vec<(NaiveDate, f64)>,
    /// Daily cumulative PnL over minimum capital; absent when that capital is zero.
    pub pnl_percentage: Option<Vec<(NaiveDate, f64)>>,
    pub backtest: PositionBacktest,
}

/// Load a position CSV and price it with `model`.
pub fn run_position_backtest(
    path: &Path,
    model: &dyn PositionModel,
    mode: PnlMode,
) -> Result<PositionReport, RunError> {
    let rows = load_position_csv(path)?;
    let backtest = model.evaluate(&rows, mode)?;
    let summary = backtest.summary();
    info!(
        model = model.name(),
        mode = %mode,
        bars = summary.bars,
        total_pnl = summary.total_pnl,
        total_fees = summary.total_fees,
        "position backtest complete"
    );
    Ok(PositionReport {
        schema_version: SCHEMA_VERSION,
        source: path.display().to_string(),
        daily_pnl: backtest.daily_pnl(),
        pnl_percentage: backtest.pnl_percentage(),
        summary,
        backtest,
    })
}
