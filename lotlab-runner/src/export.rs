//! Reporting and export — JSON, CSV, and Parquet artifact generation.
//!
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: the per-tick ledger and the position-model columns
//! - **Parquet**: the same ledger as a typed table for dataframe tools
//! - **Markdown**: a one-page summary of a run
//!
//! All persisted artifacts include a `schema_version` field. Unknown versions
//! are rejected on load.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use polars::prelude::*;

use lotlab_core::accounting::PositionBacktest;
use lotlab_core::ledger::LedgerTable;

use crate::runner::{BacktestResult, PositionReport, SCHEMA_VERSION};

/// Ledger columns, in output order.
pub const LEDGER_COLUMNS: [&str; 14] = [
    "time",
    "current_tick",
    "signal",
    "action",
    "amount",
    "value",
    "price",
    "fee",
    "equity",
    "bm_equity",
    "step_ret",
    "cum_ret",
    "bm_step_ret",
    "bm_cum_ret",
];

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export the ledger as CSV, one row per tick.
///
/// Floats are written at full precision; undefined returns are written as
/// `NaN`.
pub fn export_ledger_csv(table: &LedgerTable) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(LEDGER_COLUMNS)?;
    for r in &table.rows {
        wtr.write_record([
            r.time.format("%Y-%m-%d %H:%M:%S").to_string(),
            r.current_tick.to_string(),
            r.signal.to_string(),
            r.action.code().to_string(),
            r.amount.to_string(),
            r.value.to_string(),
            r.price.to_string(),
            r.fee.to_string(),
            r.equity.to_string(),
            r.bm_equity.to_string(),
            r.step_ret.to_string(),
            r.cum_ret.to_string(),
            r.bm_step_ret.to_string(),
            r.bm_cum_ret.to_string(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export a priced position series as CSV.
pub fn export_positions_csv(bt: &PositionBacktest) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "time",
        "close",
        "position",
        "trade_qty",
        "pnl_raw",
        "fees",
        "pnl_after_fees",
    ])?;
    for i in 0..bt.len() {
        wtr.write_record([
            bt.timestamps[i].format("%Y-%m-%d %H:%M:%S").to_string(),
            bt.close[i].to_string(),
            bt.position[i].to_string(),
            bt.trade_qty[i].to_string(),
            bt.pnl_raw[i].to_string(),
            bt.fees[i].to_string(),
            bt.pnl_after_fees[i].to_string(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Parquet export ─────────────────────────────────────────────────

/// Build a polars DataFrame with one column per ledger field.
pub fn ledger_to_dataframe(table: &LedgerTable) -> Result<DataFrame> {
    let rows = &table.rows;
    let times: Vec<String> = rows
        .iter()
        .map(|r| r.time.format("%Y-%m-%d %H:%M:%S").to_string())
        .collect();
    let ticks: Vec<u64> = rows.iter().map(|r| r.current_tick as u64).collect();
    let actions: Vec<&str> = rows.iter().map(|r| r.action.code()).collect();
    let amounts: Vec<u64> = rows.iter().map(|r| r.amount).collect();
    let col = |name: &str, f: fn(&lotlab_core::domain::HistoryRecord) -> f64| {
        Column::new(name.into(), rows.iter().map(f).collect::<Vec<f64>>())
    };

    DataFrame::new(vec![
        Column::new("time".into(), times),
        Column::new("current_tick".into(), ticks),
        col("signal", |r| r.signal),
        Column::new("action".into(), actions),
        Column::new("amount".into(), amounts),
        col("value", |r| r.value),
        col("price", |r| r.price),
        col("fee", |r| r.fee),
        col("equity", |r| r.equity),
        col("bm_equity", |r| r.bm_equity),
        col("step_ret", |r| r.step_ret),
        col("cum_ret", |r| r.cum_ret),
        col("bm_step_ret", |r| r.bm_step_ret),
        col("bm_cum_ret", |r| r.bm_cum_ret),
    ])
    .context("failed to build ledger dataframe")
}

/// Write the ledger as Parquet.
pub fn write_ledger_parquet(table: &LedgerTable, path: &Path) -> Result<()> {
    let mut df = ledger_to_dataframe(table)?;
    let file = File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    ParquetWriter::new(file)
        .finish(&mut df)
        .with_context(|| format!("failed to write parquet {}", path.display()))?;
    Ok(())
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a single backtest run.
///
/// Creates `{name}_{run_id prefix}/` under `output_dir` containing:
/// - `result.json`: the full `BacktestResult`
/// - `ledger.csv`: per-tick ledger
/// - `ledger.parquet`: same ledger, typed
/// - `report.md`: one-page summary
///
/// The directory name depends only on the run, so re-running the same
/// config over the same data overwrites the same artifacts.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let short_id: String = result.run_id.chars().take(12).collect();
    let run_dir = output_dir.join(format!("{}_{}", result.name, short_id));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("result.json"), export_json(result)?)?;
    std::fs::write(run_dir.join("ledger.csv"), export_ledger_csv(&result.run.table)?)?;
    write_ledger_parquet(&result.run.table, &run_dir.join("ledger.parquet"))?;
    std::fs::write(run_dir.join("report.md"), generate_report(result))?;

    Ok(run_dir)
}

/// Load a `BacktestResult` from an artifact directory.
///
/// Rejects unknown schema versions.
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let path = dir.join("result.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

/// Save a position-model report: `positions.json` and `positions.csv`.
pub fn save_position_report(report: &PositionReport, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create artifact dir: {}", output_dir.display()))?;
    let json = serde_json::to_string_pretty(report).context("failed to serialize PositionReport")?;
    std::fs::write(output_dir.join("positions.json"), json)?;
    std::fs::write(
        output_dir.join("positions.csv"),
        export_positions_csv(&report.backtest)?,
    )?;
    Ok(output_dir.to_path_buf())
}

// ─── Markdown reports ───────────────────────────────────────────────

/// Generate a Markdown report for a single backtest run.
pub fn generate_report(result: &BacktestResult) -> String {
    let mut md = String::with_capacity(2048);
    let run = &result.run;

    md.push_str("# Backtest Report\n\n");

    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Name | {} |\n", result.name));
    md.push_str(&format!("| Strategy | {} |\n", run.strategy_name));
    md.push_str(&format!("| Symbol | {} |\n", result.symbol));
    md.push_str(&format!("| Period | {} to {} |\n", result.start, result.end));
    md.push_str(&format!("| Initial Cash | {:.0} |\n", run.config.initial_cash));
    md.push_str(&format!("| Ticks | {} |\n", run.table.len()));
    md.push_str(&format!("| Run Id | {} |\n", result.run_id));
    md.push_str(&format!("| Dataset Hash | {} |\n", result.dataset_hash));
    if result.has_synthetic {
        md.push_str("| Data | **SYNTHETIC** |\n");
    }
    md.push('\n');

    let counts = run.table.action_counts();
    let d = &run.diagnostics;
    md.push_str("## Execution\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!(
        "| Final Equity | {:.2} (benchmark {:.2}) |\n",
        result.final_equity(),
        result.final_bm_equity()
    ));
    md.push_str(&format!("| Total Fees | {:.2} |\n", run.table.total_fees()));
    md.push_str(&format!(
        "| Buys / Sells / Holds | {} / {} / {} |\n",
        counts.buys, counts.sells, counts.holds
    ));
    md.push_str(&format!("| Deferred Sells | {} |\n", d.deferred_sells));
    md.push_str(&format!("| Expired Backlogs | {} |\n", d.expired_backlogs));
    md.push_str(&format!("| Final Open Size | {} |\n", d.final_open_size));
    md.push_str(&format!("| Unsettled at End | {} |\n", d.final_unsettled));
    if let Some(tick) = run.table.equity_exhausted_at {
        md.push_str(&format!("| Equity Exhausted At | tick {tick} |\n"));
    }
    md.push('\n');

    md.push_str("## Performance Summary\n\n");
    md.push_str("| Metric | Strategy | Benchmark |\n");
    md.push_str("| --- | --- | --- |\n");
    for ((name, ours), (_, bench)) in result
        .metrics
        .entries()
        .into_iter()
        .zip(result.benchmark_metrics.entries())
    {
        md.push_str(&format!("| {name} | {ours:.4} | {bench:.4} |\n"));
    }
    md.push('\n');

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use lotlab_core::engine::{run_with_signals, EngineConfig};
    use lotlab_core::domain::Bar;

    use crate::data_loader::DataSource;
    use crate::metrics::PerformanceSummary;

    fn sample_result() -> BacktestResult {
        let bars: Vec<Bar> = [100.0, 101.0, 99.0, 102.0]
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar {
                timestamp: NaiveDate::from_ymd_opt(2024, 1, 2 + i as u32)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
                open: c,
                high: c,
                low: c,
                close: c,
                volume: 0,
            })
            .collect();
        let run = run_with_signals(
            &bars,
            "sample",
            vec![1.0, 0.0, 0.0, -1.0],
            &EngineConfig::new(1_000_000.0, 100, 0.001),
        )
        .unwrap();
        BacktestResult {
            schema_version: SCHEMA_VERSION,
            name: "sample".into(),
            symbol: "TEST".into(),
            run_id: "abcdef0123456789".into(),
            config_id: "cfg".into(),
            dataset_hash: "data".into(),
            data_source: DataSource::Csv,
            has_synthetic: false,
            start: "2024-01-02 00:00:00".into(),
            end: "2024-01-05 00:00:00".into(),
            metrics: PerformanceSummary::compute(&run.table.step_returns()),
            benchmark_metrics: PerformanceSummary::compute(&run.table.bm_step_returns()),
            run,
        }
    }

    #[test]
    fn json_roundtrip() {
        let result = sample_result();
        let back = import_json(&export_json(&result).unwrap()).unwrap();
        assert_eq!(back.run_id, result.run_id);
        assert_eq!(back.run.signals, result.run.signals);
        assert_eq!(back.run.diagnostics, result.run.diagnostics);
        assert!((back.metrics.sharpe - result.metrics.sharpe).abs() < 1e-9);
    }

    #[test]
    fn json_rejects_unknown_version() {
        let mut result = sample_result();
        result.schema_version = SCHEMA_VERSION + 1;
        let json = export_json(&result).unwrap();
        let err = import_json(&json).unwrap_err();
        assert!(err.to_string().contains("unsupported schema version"));
    }

    #[test]
    fn csv_ledger_has_all_columns() {
        let result = sample_result();
        let csv = export_ledger_csv(&result.run.table).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next().unwrap(), LEDGER_COLUMNS.join(","));
        let first: Vec<&str> = lines.next().unwrap().split(',').collect();
        assert_eq!(first.len(), LEDGER_COLUMNS.len());
        assert_eq!(first[0], "2024-01-02 00:00:00");
        assert_eq!(first[3], "B");
        assert_eq!(csv.lines().count(), 1 + result.run.table.len());
    }

    #[test]
    fn dataframe_matches_ledger() {
        let result = sample_result();
        let df = ledger_to_dataframe(&result.run.table).unwrap();
        assert_eq!(df.height(), 4);
        assert_eq!(df.width(), LEDGER_COLUMNS.len());
        let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
        assert_eq!(names, LEDGER_COLUMNS.map(String::from).to_vec());
    }

    #[test]
    fn save_load_artifacts_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let result = sample_result();
        let run_dir = save_artifacts(&result, dir.path()).unwrap();
        assert!(run_dir.ends_with("sample_abcdef012345"));
        for file in ["result.json", "ledger.csv", "ledger.parquet", "report.md"] {
            assert!(run_dir.join(file).exists(), "{file} missing");
        }
        let loaded = load_artifacts(&run_dir).unwrap();
        assert_eq!(loaded.run_id, result.run_id);
    }

    #[test]
    fn markdown_report_has_sections() {
        let report = generate_report(&sample_result());
        assert!(report.contains("## Metadata"));
        assert!(report.contains("## Execution"));
        assert!(report.contains("## Performance Summary"));
        assert!(report.contains("| sharpe |"));
        assert!(!report.contains("SYNTHETIC"));
    }
}
