//! Signal-driven stock execution — one state transition per tick.
//!
//! Per tick:
//! 1. Mark the open position and the benchmark from the previous price
//! 2. Roll settlement buckets if the calendar date advanced
//! 3. Turn the signal into a weight change against the current weight
//! 4. Sell from settled shares (or defer), buy in lots, or hold
//! 5. Book PnL and fees into equity, append the ledger row
//!
//! Lifecycle: `reset` → `step` once per tick in order → `done`.

use chrono::NaiveDateTime;
use tracing::{debug, warn};

use super::benchmark::BenchmarkTracker;
use super::cost_model::{max_affordable_shares, round_to_lot, FeeSchedule};
use super::state::{EngineConfig, RunState, WEIGHT_EPSILON};
use crate::data::validate_bars;
use crate::domain::{Action, Bar, HistoryRecord, Shares};
use crate::error::EngineError;
use crate::ledger::{Ledger, LedgerTable};

/// Incremental weight change requested by `signal` at `current_position`.
///
/// - positive signal: move toward the signal, total long weight capped at 1
/// - negative signal while long: reduce, never below flat
/// - negative signal while flat, or zero signal: no change
pub fn target_weight_change(signal: f64, current_position: f64) -> f64 {
    let change = if signal > 0.0 {
        (signal - current_position).min(1.0 - current_position)
    } else if signal < 0.0 && current_position > 0.0 {
        (signal - current_position).max(-current_position)
    } else {
        0.0
    };
    if change.abs() < WEIGHT_EPSILON {
        0.0
    } else {
        change
    }
}

/// The per-run execution state machine.
///
/// Owns its series copy, state, benchmark, and ledger exclusively; run
/// strategies in parallel by giving each its own engine.
#[derive(Debug, Clone)]
pub struct StockEngine {
    config: EngineConfig,
    fees: FeeSchedule,
    times: Vec<NaiveDateTime>,
    prices: Vec<f64>,
    state: Option<RunState>,
    benchmark: Option<BenchmarkTracker>,
    ledger: Ledger,
}

impl StockEngine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let fees = config.fees();
        Ok(Self {
            config,
            fees,
            times: Vec::new(),
            prices: Vec::new(),
            state: None,
            benchmark: None,
            ledger: Ledger::new(),
        })
    }

    /// Load a price series and initialize run state and the benchmark.
    ///
    /// Closes are scaled by `price_scale`. Any previous run is discarded.
    pub fn reset(&mut self, bars: &[Bar]) -> Result<(), EngineError> {
        validate_bars(bars)?;
        self.times = bars.iter().map(|b| b.timestamp).collect();
        self.prices = bars
            .iter()
            .map(|b| b.close * self.config.price_scale)
            .collect();
        let init_price = self.prices[0];
        self.benchmark = Some(BenchmarkTracker::enter(
            self.config.initial_cash,
            init_price,
            self.config.lot_size,
            &self.fees,
        ));
        self.state = Some(RunState::new(self.config.initial_cash));
        self.ledger = Ledger::with_capacity(bars.len());
        Ok(())
    }

    /// Process one tick. Ticks must arrive in order starting at 0.
    pub fn step(&mut self, tick: usize, signal: f64) -> Result<&HistoryRecord, EngineError> {
        let len = self.prices.len();
        let (state, benchmark) = match (self.state.as_mut(), self.benchmark.as_mut()) {
            (Some(s), Some(b)) => (s, b),
            _ => return Err(EngineError::NotReset),
        };
        if tick >= len {
            return Err(EngineError::TickOutOfRange { tick, len });
        }
        if tick != state.next_tick {
            return Err(EngineError::OutOfOrderTick {
                expected: state.next_tick,
                got: tick,
            });
        }
        if !signal.is_finite() || !(-1.0..=1.0).contains(&signal) {
            return Err(EngineError::InvalidSignal {
                tick,
                value: signal,
            });
        }

        let policy = self.config.pending_sell;
        let lot_size = self.config.lot_size;

        let price = self.prices[tick];
        let time = self.times[tick];
        let (prev_price, prev_time) = if tick > 0 {
            (self.prices[tick - 1], self.times[tick - 1])
        } else {
            (price, time)
        };

        let mut pnl = state.current_open_size as f64 * (price - prev_price);
        benchmark.mark(price, prev_price);

        if time.date() > prev_time.date() {
            debug!(
                %time,
                t0 = state.buckets.t0,
                t1 = state.buckets.t1,
                t2 = state.buckets.t2,
                sellable = state.buckets.sellable,
                "rolling settlement buckets"
            );
            state.buckets.roll_forward();
        }

        if let (Some(max_age), Some(age)) = (policy.max_age_ticks, state.backlog_age(tick)) {
            if age > max_age {
                let dropped = state.clear_backlog();
                state.expired_backlogs += 1;
                warn!(%time, age, dropped, "pending sell backlog expired");
            }
        }

        let updated_position = target_weight_change(signal, state.current_position);

        let mut action = Action::Hold;
        let mut executed_weight = 0.0;
        let mut trade_size: Shares = 0;
        let mut fee = 0.0;

        if updated_position < 0.0 || state.has_backlog() {
            debug!(%time, signal, backlog = state.pending_sell_pos, "entering sell logic");
            if state.buckets.sellable == 0 {
                warn!(
                    %time,
                    signal,
                    "no settled shares to sell; deferring until shares settle"
                );
                state.defer_sell(signal.abs(), tick, &policy);
            } else {
                // On a backlog tick the size of a buy-side change still counts.
                let mut can_sell = state.pending_sell_pos.max(updated_position.abs());
                if policy.cap_at_position {
                    can_sell = can_sell.min(state.current_position.max(0.0));
                }
                let wanted = round_to_lot(can_sell * state.current_open_size as f64, lot_size);
                trade_size = state.buckets.sell(wanted);
                state.current_open_size -= trade_size;
                state.total_sold += trade_size;
                state.current_position -= can_sell;
                if state.current_position.abs() < WEIGHT_EPSILON {
                    state.current_position = 0.0;
                }
                state.settle_backlog(can_sell, &policy);

                action = Action::Sell;
                executed_weight = -can_sell;
                fee = self.fees.fee(price, trade_size);
                pnl -= fee;
            }
        } else if updated_position > 0.0 {
            debug!(%time, signal, "entering buy logic");
            let max_shares = max_affordable_shares(self.config.initial_cash, price, lot_size);
            state.current_position += updated_position;
            trade_size = round_to_lot(updated_position * max_shares as f64, lot_size);
            state.buckets.buy(trade_size);
            state.current_open_size += trade_size;
            state.total_bought += trade_size;

            action = Action::Buy;
            executed_weight = updated_position;
            fee = self.fees.fee(price, trade_size);
            pnl -= fee;
        }

        state.equity += pnl;
        state.next_tick += 1;
        state.verify_inventory();

        self.ledger.push(HistoryRecord {
            time,
            current_tick: tick,
            signal: executed_weight,
            action,
            amount: trade_size,
            value: state.current_open_size as f64 * price,
            price,
            fee,
            equity: state.equity,
            bm_equity: benchmark.equity(),
            step_ret: 0.0,
            cum_ret: 0.0,
            bm_step_ret: 0.0,
            bm_cum_ret: 0.0,
        });
        self.ledger.last().ok_or(EngineError::NotReset)
    }

    /// Finalize the run into a result table. Does not consume or mutate
    /// the recorded history.
    pub fn done(&self) -> LedgerTable {
        self.ledger.finalize()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> Option<&RunState> {
        self.state.as_ref()
    }

    pub fn benchmark(&self) -> Option<&BenchmarkTracker> {
        self.benchmark.as_ref()
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Scaled closes the engine trades at.
    pub fn prices(&self) -> &[f64] {
        &self.prices
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// True once every loaded tick has been stepped.
    pub fn is_complete(&self) -> bool {
        self.state
            .as_ref()
            .is_some_and(|s| s.next_tick == self.prices.len())
    }
}
