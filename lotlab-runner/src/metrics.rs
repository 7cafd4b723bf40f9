//! Performance metrics — pure functions over a step-return series.
//!
//! Every metric takes the per-tick strategy returns (the ledger's `step_ret`
//! column) and returns a scalar. Non-finite returns are dropped first.
//! Annualization assumes 252 periods per year. Degenerate inputs (no
//! variance, no losses) yield 0.0 rather than infinities.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Periods per year for annualized metrics.
pub const PERIODS_PER_YEAR: f64 = 252.0;

/// One-sided z-score for a 95% parametric VaR.
const Z_95: f64 = -1.644_853_626_951_472_2;

/// Summary statistics for a single run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub avg_return: f64,
    pub cumulative_return: f64,
    pub cvar: f64,
    pub gain_to_pain_ratio: f64,
    pub kelly_criterion: f64,
    pub max_drawdown: f64,
    pub omega: f64,
    pub profit_factor: f64,
    pub recovery_factor: f64,
    pub sharpe: f64,
    pub sortino: f64,
    pub tail_ratio: f64,
    pub ulcer_index: f64,
    pub value_at_risk: f64,
    pub volatility: f64,
    pub win_loss_ratio: f64,
    pub win_rate: f64,
}

impl PerformanceSummary {
    /// Compute all metrics from a step-return series.
    pub fn compute(step_returns: &[f64]) -> Self {
        let r = clean_returns(step_returns);
        if r.is_empty() {
            warn!("no finite returns; performance summary is all zeros");
            return Self::default();
        }
        Self {
            avg_return: avg_return(&r),
            cumulative_return: cumulative_return(&r),
            cvar: cvar(&r),
            gain_to_pain_ratio: gain_to_pain_ratio(&r),
            kelly_criterion: kelly_criterion(&r),
            max_drawdown: max_drawdown(&r),
            omega: omega(&r),
            profit_factor: profit_factor(&r),
            recovery_factor: recovery_factor(&r),
            sharpe: sharpe_ratio(&r),
            sortino: sortino_ratio(&r),
            tail_ratio: tail_ratio(&r),
            ulcer_index: ulcer_index(&r),
            value_at_risk: value_at_risk(&r),
            volatility: volatility(&r),
            win_loss_ratio: win_loss_ratio(&r),
            win_rate: win_rate(&r),
        }
    }

    /// Metric name/value pairs in alphabetical order, for display.
    pub fn entries(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("avg_return", self.avg_return),
            ("cumulative_return", self.cumulative_return),
            ("cvar", self.cvar),
            ("gain_to_pain_ratio", self.gain_to_pain_ratio),
            ("kelly_criterion", self.kelly_criterion),
            ("max_drawdown", self.max_drawdown),
            ("omega", self.omega),
            ("profit_factor", self.profit_factor),
            ("recovery_factor", self.recovery_factor),
            ("sharpe", self.sharpe),
            ("sortino", self.sortino),
            ("tail_ratio", self.tail_ratio),
            ("ulcer_index", self.ulcer_index),
            ("value_at_risk", self.value_at_risk),
            ("volatility", self.volatility),
            ("win_loss_ratio", self.win_loss_ratio),
            ("win_rate", self.win_rate),
        ]
    }
}

/// Drop NaN and infinite returns.
pub fn clean_returns(returns: &[f64]) -> Vec<f64> {
    returns.iter().copied().filter(|r| r.is_finite()).collect()
}

// ─── Individual metric functions ────────────────────────────────────

/// Mean of the non-zero returns.
pub fn avg_return(returns: &[f64]) -> f64 {
    let active: Vec<f64> = returns.iter().copied().filter(|&r| r != 0.0).collect();
    mean_f64(&active)
}

/// Compounded return: `prod(1 + r) - 1`.
pub fn cumulative_return(returns: &[f64]) -> f64 {
    returns.iter().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0
}

/// Parametric 95% value at risk: `mean + z * std`.
pub fn value_at_risk(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    mean_f64(returns) + Z_95 * std_dev(returns)
}

/// Mean of the returns below the VaR; the VaR itself if none are.
pub fn cvar(returns: &[f64]) -> f64 {
    let var = value_at_risk(returns);
    let tail: Vec<f64> = returns.iter().copied().filter(|&r| r < var).collect();
    if tail.is_empty() {
        var
    } else {
        mean_f64(&tail)
    }
}

/// Sum of returns over the absolute sum of losing returns.
pub fn gain_to_pain_ratio(returns: &[f64]) -> f64 {
    let pain: f64 = returns.iter().filter(|&&r| r < 0.0).sum::<f64>().abs();
    if pain < 1e-15 {
        return 0.0;
    }
    returns.iter().sum::<f64>() / pain
}

/// Kelly fraction: `(payoff * p_win - p_loss) / payoff`.
pub fn kelly_criterion(returns: &[f64]) -> f64 {
    let payoff = win_loss_ratio(returns);
    if payoff <= 0.0 {
        return 0.0;
    }
    let p_win = win_rate(returns);
    (payoff * p_win - (1.0 - p_win)) / payoff
}

/// Maximum drawdown of the compounded curve as a negative fraction.
///
/// The curve starts at 1.0 before the first return, so an immediate loss
/// counts as a drawdown.
pub fn max_drawdown(returns: &[f64]) -> f64 {
    drawdown_series(returns)
        .into_iter()
        .fold(0.0_f64, f64::min)
}

/// Probability-weighted gains over losses at a zero threshold.
pub fn omega(returns: &[f64]) -> f64 {
    let gains: f64 = returns.iter().filter(|&&r| r > 0.0).sum();
    let losses: f64 = -returns.iter().filter(|&&r| r < 0.0).sum::<f64>();
    if losses < 1e-15 {
        return 0.0;
    }
    gains / losses
}

/// Sum of non-negative returns over the absolute sum of negative returns.
pub fn profit_factor(returns: &[f64]) -> f64 {
    let wins: f64 = returns.iter().filter(|&&r| r >= 0.0).sum();
    let losses: f64 = returns.iter().filter(|&&r| r < 0.0).sum::<f64>().abs();
    if losses < 1e-15 {
        return 0.0;
    }
    wins / losses
}

/// Absolute summed return over the absolute max drawdown.
pub fn recovery_factor(returns: &[f64]) -> f64 {
    let dd = max_drawdown(returns).abs();
    if dd < 1e-15 {
        return 0.0;
    }
    returns.iter().sum::<f64>().abs() / dd
}

/// Annualized Sharpe ratio with a zero risk-free rate.
///
/// Sharpe = mean / std * sqrt(252). Returns 0.0 if variance is zero or
/// fewer than 2 returns.
pub fn sharpe_ratio(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let std = std_dev(returns);
    if std < 1e-15 {
        return 0.0;
    }
    mean_f64(returns) / std * PERIODS_PER_YEAR.sqrt()
}

/// Annualized Sortino ratio (downside deviation only).
///
/// Downside deviation is `sqrt(sum(r^2 for r < 0) / n)`. Returns 0.0 with
/// no downside.
pub fn sortino_ratio(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let downside_sq: f64 = returns.iter().filter(|&&r| r < 0.0).map(|r| r * r).sum();
    let downside_std = (downside_sq / returns.len() as f64).sqrt();
    if downside_std < 1e-15 {
        return 0.0;
    }
    mean_f64(returns) / downside_std * PERIODS_PER_YEAR.sqrt()
}

/// `|q95 / q05|` of the return distribution.
pub fn tail_ratio(returns: &[f64]) -> f64 {
    let low = quantile(returns, 0.05);
    if low.abs() < 1e-15 {
        return 0.0;
    }
    (quantile(returns, 0.95) / low).abs()
}

/// Root mean square drawdown over `n - 1` periods.
pub fn ulcer_index(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let sq: f64 = drawdown_series(returns).iter().map(|d| d * d).sum();
    (sq / (returns.len() - 1) as f64).sqrt()
}

/// Annualized standard deviation of returns.
pub fn volatility(returns: &[f64]) -> f64 {
    std_dev(returns) * PERIODS_PER_YEAR.sqrt()
}

/// Average winning return over the absolute average losing return.
pub fn win_loss_ratio(returns: &[f64]) -> f64 {
    let wins: Vec<f64> = returns.iter().copied().filter(|&r| r > 0.0).collect();
    let losses: Vec<f64> = returns.iter().copied().filter(|&r| r < 0.0).collect();
    if wins.is_empty() || losses.is_empty() {
        return 0.0;
    }
    mean_f64(&wins) / mean_f64(&losses).abs()
}

/// Fraction of non-zero returns that are positive.
pub fn win_rate(returns: &[f64]) -> f64 {
    let active = returns.iter().filter(|&&r| r != 0.0).count();
    if active == 0 {
        return 0.0;
    }
    returns.iter().filter(|&&r| r > 0.0).count() as f64 / active as f64
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Drawdown of the compounded curve at each period (≤ 0).
pub fn drawdown_series(returns: &[f64]) -> Vec<f64> {
    let mut value = 1.0_f64;
    let mut peak = 1.0_f64;
    returns
        .iter()
        .map(|r| {
            value *= 1.0 + r;
            peak = peak.max(value);
            if peak > 0.0 {
                value / peak - 1.0
            } else {
                0.0
            }
        })
        .collect()
}

/// Linear-interpolated quantile, `q` in [0, 1].
pub fn quantile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
