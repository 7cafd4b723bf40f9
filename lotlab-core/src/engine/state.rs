//! Engine configuration and the per-run mutable state.

use serde::{Deserialize, Serialize};

use super::cost_model::FeeSchedule;
use super::settlement::SettlementBuckets;
use crate::domain::Shares;
use crate::error::EngineError;

/// Weight changes and backlog remainders smaller than this are treated as zero.
pub const WEIGHT_EPSILON: f64 = 1e-12;

/// How deferred sell intent is carried across ticks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PendingSellPolicy {
    /// Drop a backlog that has waited more than this many ticks.
    /// `None` keeps it until it can be satisfied.
    pub max_age_ticks: Option<usize>,
    /// Never let the backlog, or a single sell, remove more weight than the
    /// current long weight.
    pub cap_at_position: bool,
}

impl Default for PendingSellPolicy {
    fn default() -> Self {
        Self {
            max_age_ticks: None,
            cap_at_position: true,
        }
    }
}

impl PendingSellPolicy {
    /// Unbounded, uncapped accumulation.
    pub fn uncapped() -> Self {
        Self {
            max_age_ticks: None,
            cap_at_position: false,
        }
    }
}

/// Configuration for a single signal-driven run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Starting cash; also the sizing base for every buy.
    pub initial_cash: f64,
    /// Minimum tradable increment in shares.
    pub lot_size: Shares,
    /// Fee as a fraction of traded notional, both sides.
    pub fee_rate: f64,
    /// Multiplier applied to loaded closes (fixed-point price feeds).
    pub price_scale: f64,
    pub pending_sell: PendingSellPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_cash: 1_000_000_000.0,
            lot_size: 100,
            fee_rate: 0.001,
            price_scale: 1.0,
            pending_sell: PendingSellPolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn new(initial_cash: f64, lot_size: Shares, fee_rate: f64) -> Self {
        Self {
            initial_cash,
            lot_size,
            fee_rate,
            ..Self::default()
        }
    }

    /// Exchange preset for feeds quoted in thousands (price scale 1000).
    pub fn vn_stock() -> Self {
        Self {
            price_scale: 1000.0,
            ..Self::default()
        }
    }

    pub fn with_pending_sell(mut self, policy: PendingSellPolicy) -> Self {
        self.pending_sell = policy;
        self
    }

    pub fn fees(&self) -> FeeSchedule {
        FeeSchedule::new(self.fee_rate)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.initial_cash.is_finite() && self.initial_cash > 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "initial_cash must be positive, got {}",
                self.initial_cash
            )));
        }
        if self.lot_size == 0 {
            return Err(EngineError::InvalidConfig(
                "lot_size must be at least 1".into(),
            ));
        }
        if !(self.fee_rate.is_finite() && self.fee_rate >= 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "fee_rate must be non-negative, got {}",
                self.fee_rate
            )));
        }
        if !(self.price_scale.is_finite() && self.price_scale > 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "price_scale must be positive, got {}",
                self.price_scale
            )));
        }
        Ok(())
    }
}

/// Mutable state owned by one run. Created by `reset`, mutated once per tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    /// Next tick the engine expects.
    pub next_tick: usize,
    pub equity: f64,
    /// Fractional long weight of capacity, in [0, 1] under the capped policy.
    pub current_position: f64,
    /// Shares held.
    pub current_open_size: Shares,
    pub buckets: SettlementBuckets,
    /// Sell weight still waiting for settled shares.
    pub pending_sell_pos: f64,
    /// Tick at which the current backlog started.
    pub pending_since: Option<usize>,
    pub total_bought: Shares,
    pub total_sold: Shares,
    /// Ticks on which a sell was deferred for lack of settled shares.
    pub deferred_sells: usize,
    /// Backlogs dropped by the max-age policy.
    pub expired_backlogs: usize,
}

impl RunState {
    pub fn new(initial_cash: f64) -> Self {
        Self {
            next_tick: 0,
            equity: initial_cash,
            current_position: 0.0,
            current_open_size: 0,
            buckets: SettlementBuckets::new(),
            pending_sell_pos: 0.0,
            pending_since: None,
            total_bought: 0,
            total_sold: 0,
            deferred_sells: 0,
            expired_backlogs: 0,
        }
    }

    pub fn has_backlog(&self) -> bool {
        self.pending_sell_pos > 0.0
    }

    /// Add deferred sell weight to the backlog.
    pub fn defer_sell(&mut self, weight: f64, tick: usize, policy: &PendingSellPolicy) {
        self.deferred_sells += 1;
        self.pending_sell_pos += weight;
        if policy.cap_at_position {
            self.pending_sell_pos = self.pending_sell_pos.min(self.current_position.max(0.0));
        }
        self.snap_backlog();
        if self.has_backlog() && self.pending_since.is_none() {
            self.pending_since = Some(tick);
        }
    }

    /// Consume `weight` of backlog after a sell.
    pub fn settle_backlog(&mut self, weight: f64, policy: &PendingSellPolicy) {
        self.pending_sell_pos = (self.pending_sell_pos - weight).max(0.0);
        if policy.cap_at_position {
            self.pending_sell_pos = self.pending_sell_pos.min(self.current_position.max(0.0));
        }
        self.snap_backlog();
    }

    /// Drop the backlog, returning the weight discarded.
    pub fn clear_backlog(&mut self) -> f64 {
        let dropped = self.pending_sell_pos;
        self.pending_sell_pos = 0.0;
        self.pending_since = None;
        dropped
    }

    /// Age of the backlog at `tick`, if any.
    pub fn backlog_age(&self, tick: usize) -> Option<usize> {
        self.pending_since.map(|since| tick.saturating_sub(since))
    }

    fn snap_backlog(&mut self) {
        if self.pending_sell_pos < WEIGHT_EPSILON {
            self.pending_sell_pos = 0.0;
            self.pending_since = None;
        }
    }

    /// Inventory identity: the buckets hold exactly the open shares, and the
    /// open shares equal everything bought minus everything sold.
    ///
    /// Panics in debug builds if the identity is violated.
    pub fn verify_inventory(&self) {
        debug_assert_eq!(
            self.buckets.total(),
            self.current_open_size,
            "settlement buckets out of sync with open size: {:?}",
            self.buckets
        );
        debug_assert_eq!(
            self.total_bought - self.total_sold,
            self.current_open_size,
            "inventory accounting violated: bought={} sold={} open={}",
            self.total_bought,
            self.total_sold,
            self.current_open_size
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.initial_cash, 1_000_000_000.0);
        assert_eq!(config.lot_size, 100);
        assert_eq!(config.fee_rate, 0.001);
        assert_eq!(config.price_scale, 1.0);
        assert!(config.pending_sell.cap_at_position);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn vn_stock_preset_scales_prices() {
        assert_eq!(EngineConfig::vn_stock().price_scale, 1000.0);
    }

    #[test]
    fn invalid_configs_rejected() {
        let mut config = EngineConfig::default();
        config.lot_size = 0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.initial_cash = 0.0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.fee_rate = -0.1;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.price_scale = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"lot_size": 10}"#).unwrap();
        assert_eq!(config.lot_size, 10);
        assert_eq!(config.fee_rate, 0.001);
        assert_eq!(config.pending_sell, PendingSellPolicy::default());
    }

    #[test]
    fn capped_backlog_never_exceeds_position() {
        let policy = PendingSellPolicy::default();
        let mut state = RunState::new(1_000.0);
        state.current_position = 0.5;
        state.defer_sell(1.0, 3, &policy);
        state.defer_sell(1.0, 4, &policy);
        assert_eq!(state.pending_sell_pos, 0.5);
        assert_eq!(state.pending_since, Some(3));
        assert_eq!(state.deferred_sells, 2);
    }

    #[test]
    fn uncapped_backlog_accumulates() {
        let policy = PendingSellPolicy::uncapped();
        let mut state = RunState::new(1_000.0);
        state.current_position = 0.5;
        state.defer_sell(1.0, 3, &policy);
        state.defer_sell(1.0, 4, &policy);
        assert_eq!(state.pending_sell_pos, 2.0);
    }

    #[test]
    fn zero_weight_deferral_does_not_start_backlog() {
        let policy = PendingSellPolicy::default();
        let mut state = RunState::new(1_000.0);
        state.current_position = 1.0;
        state.defer_sell(0.0, 2, &policy);
        assert!(!state.has_backlog());
        assert_eq!(state.pending_since, None);
    }

    #[test]
    fn settling_backlog_floors_at_zero() {
        let policy = PendingSellPolicy::default();
        let mut state = RunState::new(1_000.0);
        state.current_position = 1.0;
        state.defer_sell(0.4, 1, &policy);
        state.settle_backlog(1.0, &policy);
        assert_eq!(state.pending_sell_pos, 0.0);
        assert_eq!(state.pending_since, None);
        assert_eq!(state.backlog_age(10), None);
    }
}
