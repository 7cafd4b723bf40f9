//! Lotlab Runner — backtest orchestration, data loading, metrics, export.
//!
//! This crate builds on `lotlab-core` to provide:
//! - TOML run configuration with deterministic config and run ids
//! - CSV and synthetic bar loading; position and signal CSVs
//! - Single and parallel batch runners
//! - Return-based performance summaries
//! - JSON, CSV, Parquet, and Markdown artifacts

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;

pub use config::{BacktestConfig, ConfigError, DataConfig, StrategyConfig};
pub use data_loader::{
    generate_synthetic_bars, load_bars, load_csv_bars, load_position_csv, load_signal_csv,
    DataSource, LoadError, LoadedData,
};
pub use export::{load_artifacts, save_artifacts, save_position_report};
pub use metrics::PerformanceSummary;
pub use runner::{
    run_backtest_from_data, run_batch, run_position_backtest, run_single_backtest,
    BacktestResult, PositionReport, RunError,
};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn performance_summary_is_send_sync() {
        assert_send::<PerformanceSummary>();
        assert_sync::<PerformanceSummary>();
    }

    #[test]
    fn backtest_result_is_send_sync() {
        assert_send::<BacktestResult>();
        assert_sync::<BacktestResult>();
        assert_send::<PositionReport>();
        assert_sync::<PositionReport>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<BacktestConfig>();
        assert_sync::<BacktestConfig>();
        assert_send::<LoadedData>();
        assert_sync::<LoadedData>();
    }

    #[test]
    fn errors_are_send_sync() {
        assert_send::<RunError>();
        assert_sync::<RunError>();
    }
}
