//! Signal-driven execution engine.
//!
//! The engine consumes a validated price series and one signal per tick,
//! then runs the per-tick transition:
//!
//! 1. Mark-to-market: strategy and benchmark PnL from the previous price
//! 2. Settlement: roll T0/T1/T2/sellable buckets on a new calendar day
//! 3. Decision: signal → weight change → buy, sell, deferred sell, or hold
//! 4. Accounting: fees into PnL, PnL into equity, one ledger row

pub mod benchmark;
pub mod cost_model;
pub mod loop_runner;
pub mod settlement;
pub mod state;
pub mod stock_engine;

pub use benchmark::BenchmarkTracker;
pub use cost_model::{max_affordable_shares, round_to_lot, FeeSchedule};
pub use loop_runner::{run_backtest, run_with_signals, RunDiagnostics, RunResult};
pub use settlement::SettlementBuckets;
pub use state::{EngineConfig, PendingSellPolicy, RunState, WEIGHT_EPSILON};
pub use stock_engine::{target_weight_change, StockEngine};
