//! Lotlab CLI — signal-driven backtests and position accounting.
//!
//! Commands:
//! - `run`: execute a backtest from a TOML config file and save artifacts
//! - `batch`: run several configs in parallel and print a comparison table
//! - `positions`: price a position CSV with the stock or derivatives fee model

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use lotlab_core::accounting::{DerivativesModel, PnlMode, PositionModel, StockModel};
use lotlab_runner::runner::{run_batch, run_position_backtest, run_single_backtest};
use lotlab_runner::{save_artifacts, save_position_report, BacktestConfig, BacktestResult, PositionReport};

#[derive(Parser)]
#[command(
    name = "lotlab",
    version,
    about = "Lotlab CLI — lot-sized, settlement-aware single-asset backtesting"
)]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Output directory for result artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Print the summary without writing artifacts.
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Run several TOML configs in parallel.
    Batch {
        /// Config files to run.
        #[arg(required = true)]
        configs: Vec<PathBuf>,

        /// Output directory for result artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Price a position CSV (`Date`, `time`, `Close`, `position`).
    Positions {
        /// Path to the position CSV.
        #[arg(long)]
        csv: PathBuf,

        /// Fee model.
        #[arg(long, value_enum, default_value_t = ModelArg::Stock)]
        model: ModelArg,

        /// PnL column used for reports: raw or after_fees.
        #[arg(long, default_value = "after_fees")]
        pnl_mode: PnlMode,

        /// Minimum holding period in sessions (stock model only).
        #[arg(long, default_value_t = 3)]
        min_hold_days: usize,

        /// Write positions.json and positions.csv here.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Print the summary as JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModelArg {
    Stock,
    Derivatives,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            config,
            output_dir,
            dry_run,
        } => run_backtest_cmd(&config, &output_dir, dry_run),
        Commands::Batch {
            configs,
            output_dir,
        } => run_batch_cmd(&configs, &output_dir),
        Commands::Positions {
            csv,
            model,
            pnl_mode,
            min_hold_days,
            output_dir,
            json,
        } => run_positions_cmd(
            &csv,
            model,
            pnl_mode,
            min_hold_days,
            output_dir.as_deref(),
            json,
        ),
    }
}

/// Logs go to stderr so stdout stays clean for summaries.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run_backtest_cmd(config_path: &Path, output_dir: &Path, dry_run: bool) -> Result<()> {
    info!(config = %config_path.display(), "loading config");
    let config = BacktestConfig::load(config_path)
        .with_context(|| format!("failed to load config {}", config_path.display()))?;
    let result = run_single_backtest(&config)
        .with_context(|| format!("backtest '{}' failed", config.backtest.name))?;

    print_summary(&result);

    if !dry_run {
        let run_dir = save_artifacts(&result, output_dir)?;
        println!("Artifacts saved to: {}", run_dir.display());
    }
    Ok(())
}

fn run_batch_cmd(paths: &[PathBuf], output_dir: &Path) -> Result<()> {
    let configs = paths
        .iter()
        .map(|p| {
            BacktestConfig::load(p).with_context(|| format!("failed to load config {}", p.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    info!(runs = configs.len(), "starting batch");
    let results = run_batch(&configs);

    println!();
    println!(
        "{:<24} {:>16} {:>16} {:>9} {:>9} {:>6}",
        "Name", "Final Equity", "Benchmark", "Sharpe", "Max DD", "Sells"
    );
    let mut failures = 0usize;
    for (path, result) in paths.iter().zip(&results) {
        match result {
            Ok(r) => {
                println!(
                    "{:<24} {:>16.2} {:>16.2} {:>9.3} {:>8.2}% {:>6}",
                    r.name,
                    r.final_equity(),
                    r.final_bm_equity(),
                    r.metrics.sharpe,
                    r.metrics.max_drawdown * 100.0,
                    r.run.table.action_counts().sells,
                );
                save_artifacts(r, output_dir)?;
            }
            Err(e) => {
                failures += 1;
                eprintln!("Error for {}: {e}", path.display());
            }
        }
    }
    println!();
    println!("Artifacts saved under: {}", output_dir.display());

    if failures > 0 {
        bail!("{failures} of {} runs failed", paths.len());
    }
    Ok(())
}

fn run_positions_cmd(
    csv: &Path,
    model: ModelArg,
    mode: PnlMode,
    min_hold_days: usize,
    output_dir: Option<&Path>,
    json: bool,
) -> Result<()> {
    let model: Box<dyn PositionModel> = match model {
        ModelArg::Stock => Box::new(StockModel::with_min_hold_days(min_hold_days)),
        ModelArg::Derivatives => Box::new(DerivativesModel::default()),
    };
    let report = run_position_backtest(csv, model.as_ref(), mode)
        .with_context(|| format!("failed to price positions in {}", csv.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report.summary)?);
    } else {
        print_position_summary(&report);
    }

    if let Some(dir) = output_dir {
        save_position_report(&report, dir)?;
        info!(dir = %dir.display(), "artifacts saved");
    }
    Ok(())
}

fn print_summary(result: &BacktestResult) {
    let run = &result.run;
    let counts = run.table.action_counts();
    let d = &run.diagnostics;

    println!();
    println!("=== Backtest Result ===");
    println!("Name:           {}", result.name);
    println!("Strategy:       {}", run.strategy_name);
    println!("Symbol:         {}", result.symbol);
    println!("Period:         {} to {}", result.start, result.end);
    println!("Ticks:          {}", run.table.len());
    println!(
        "Actions:        {} buys, {} sells, {} holds",
        counts.buys, counts.sells, counts.holds
    );
    println!(
        "Deferred:       {} sells ({} backlogs expired)",
        d.deferred_sells, d.expired_backlogs
    );
    println!();
    println!("--- Equity ---");
    println!("Initial Cash:   {:.2}", run.config.initial_cash);
    println!("Final Equity:   {:.2}", result.final_equity());
    println!("Benchmark:      {:.2}", result.final_bm_equity());
    println!("Total Fees:     {:.2}", run.table.total_fees());
    println!();
    println!("--- Performance ---");
    let m = &result.metrics;
    println!("Cum Return:     {:.2}%", m.cumulative_return * 100.0);
    println!("Sharpe:         {:.3}", m.sharpe);
    println!("Sortino:        {:.3}", m.sortino);
    println!("Max Drawdown:   {:.2}%", m.max_drawdown * 100.0);
    println!("Volatility:     {:.2}%", m.volatility * 100.0);
    println!("Win Rate:       {:.1}%", m.win_rate * 100.0);
    println!("Profit Factor:  {:.2}", m.profit_factor);
    if let Some(tick) = run.table.equity_exhausted_at {
        println!();
        println!("WARNING: equity reached zero at tick {tick}; later returns are undefined");
    }
    if result.has_synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
    println!();
}

fn print_position_summary(report: &PositionReport) {
    let s = &report.summary;
    println!();
    println!("=== Position Backtest ===");
    println!("Source:         {}", report.source);
    println!("Model:          {} ({})", s.model, s.mode);
    println!("Bars / Days:    {} / {}", s.bars, s.days);
    println!("Total PnL:      {:.4}", s.total_pnl);
    println!("Total Fees:     {:.4}", s.total_fees);
    println!("Min Capital:    {:.4}", s.minimum_capital);
    match s.return_on_capital {
        Some(r) => println!("Return on Cap:  {:.2}%", r * 100.0),
        None => println!("Return on Cap:  n/a (no capital deployed)"),
    }
    println!("Avg Position:   {:.4}", s.avg_pos);
    println!();
}
