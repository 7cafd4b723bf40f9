//! Integration tests for the vectorized position models and lot allocator.
//!
//! Tests:
//! 1. Stock model: hold period blocks early exits, fees on executed trades only
//! 2. Derivatives model: intraday path with a rollover
//! 3. Reporting: daily PnL, minimum capital, percentage, turnover
//! 4. Models are interchangeable behind `PositionModel`

use chrono::{NaiveDate, NaiveDateTime};
use lotlab_core::accounting::{DerivativesModel, PnlMode, PositionBar, PositionModel, StockModel};
use lotlab_core::lots::allocate;
use lotlab_core::EngineError;

// ──────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────

fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 10, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

fn rows(data: &[(NaiveDateTime, f64, f64)]) -> Vec<PositionBar> {
    data.iter()
        .map(|&(timestamp, close, position)| PositionBar {
            timestamp,
            close,
            position,
        })
        .collect()
}

// ──────────────────────────────────────────────
// Stock
// ──────────────────────────────────────────────

#[test]
fn stock_exit_is_delayed_until_lots_are_old_enough() {
    let bars = rows(&[
        (at(1, 10, 0), 20.0, 1_000.0),
        (at(1, 14, 0), 21.0, 0.0), // same session: blocked
        (at(2, 10, 0), 22.0, 0.0), // one session: blocked
        (at(3, 10, 0), 21.0, 0.0), // two sessions: blocked
        (at(4, 10, 0), 23.0, 0.0), // three sessions: sells
        (at(5, 10, 0), 25.0, 0.0),
    ]);
    let bt = StockModel::default().evaluate(&bars, PnlMode::AfterFees).unwrap();
    assert_eq!(bt.position, vec![1_000.0, 1_000.0, 1_000.0, 1_000.0, 0.0, 0.0]);
    assert_eq!(bt.trade_qty[4], -1_000.0);
    assert_eq!(bt.fees.iter().filter(|&&f| f > 0.0).count(), 2);
    // Held 20 → 23
    assert_eq!(bt.pnl_raw.iter().sum::<f64>(), 3_000.0);
}

#[test]
fn stock_partial_exit_uses_oldest_lot() {
    let bars = rows(&[
        (at(1, 10, 0), 10.0, 100.0),
        (at(3, 10, 0), 10.0, 300.0),
        (at(4, 10, 0), 10.0, 0.0),
    ]);
    let bt = StockModel::default().evaluate(&bars, PnlMode::Raw).unwrap();
    // Day ids follow consecutive distinct dates, so day 3 is session 1 and
    // day 4 is session 2; nothing is three sessions old yet.
    assert_eq!(bt.trade_qty, vec![100.0, 200.0, 0.0]);
    assert_eq!(bt.position[2], 300.0);
}

#[test]
fn allocator_sessions_count_distinct_dates_not_calendar_days() {
    let dates = [
        NaiveDate::from_ymd_opt(2024, 10, 4).unwrap(), // Friday
        NaiveDate::from_ymd_opt(2024, 10, 7).unwrap(), // Monday
        NaiveDate::from_ymd_opt(2024, 10, 8).unwrap(),
        NaiveDate::from_ymd_opt(2024, 10, 9).unwrap(),
    ];
    let alloc = allocate(&dates, &[10.0, 0.0, 0.0, 0.0], 3).unwrap();
    assert_eq!(alloc.trade_qty, vec![10.0, 0.0, 0.0, -10.0]);
}

// ──────────────────────────────────────────────
// Derivatives
// ──────────────────────────────────────────────

#[test]
fn derivatives_intraday_path() {
    let bars = rows(&[
        (at(7, 9, 0), 1_300.0, 1.0),
        (at(7, 9, 5), 1_302.0, 2.0),
        (at(7, 9, 10), 1_301.0, 0.0),
        (at(8, 9, 0), 1_305.0, 1.0),
        (at(8, 9, 5), 1_306.0, 1.0),
    ]);
    let model = DerivativesModel::default();
    let bt = model.evaluate(&bars, PnlMode::AfterFees).unwrap();
    assert_eq!(bt.pnl_raw, vec![2.0, -2.0, 0.0, 1.0, 0.0]);
    let expected_fees = 0.0255 + (1.0 + 2.0 + 1.0) * 0.027 + 0.0255;
    assert!((bt.total_fees() - expected_fees).abs() < 1e-12);

    let daily = bt.daily_pnl();
    assert_eq!(daily.len(), 2);
    assert_eq!(daily[0].0, at(7, 0, 0).date());
    // turnover 1 + 2 + 1 + 0 over two days
    assert_eq!(bt.avg_pos(), 2.0);
}

#[test]
fn minimum_capital_covers_peak_exposure() {
    let bars = rows(&[
        (at(7, 9, 0), 100.0, 0.0),
        (at(8, 9, 0), 100.0, 3.0),
        (at(9, 9, 0), 110.0, 3.0),
    ]);
    let bt = DerivativesModel {
        transaction_fee: 0.0,
        overnight_fee: 0.0,
    }
    .evaluate(&bars, PnlMode::Raw)
    .unwrap();
    // 3 * 100 - 0, then 3 * 110 - 30
    assert_eq!(bt.estimate_minimum_capital(), 300.0);
    let pct = bt.pnl_percentage().unwrap();
    assert_eq!(pct.last().unwrap().1, 0.1);
}

// ──────────────────────────────────────────────
// Shared behavior
// ──────────────────────────────────────────────

#[test]
fn models_share_the_trait_surface() {
    let bars = rows(&[(at(1, 9, 0), 50.0, 2.0), (at(2, 9, 0), 51.0, 2.0)]);
    let models: Vec<Box<dyn PositionModel>> =
        vec![Box::new(StockModel::default()), Box::new(DerivativesModel::default())];
    for model in &models {
        let bt = model.evaluate(&bars, PnlMode::Raw).unwrap();
        assert_eq!(bt.model, model.name());
        assert_eq!(bt.cumulative_pnl(), vec![2.0, 2.0]);
        let summary = bt.summary();
        assert_eq!(summary.bars, 2);
        assert_eq!(summary.days, 2);
    }
}

#[test]
fn invalid_mode_string_is_an_error() {
    assert!(matches!(
        "gross".parse::<PnlMode>(),
        Err(EngineError::InvalidPnlMode(_))
    ));
}

#[test]
fn unsorted_input_is_rejected() {
    let bars = rows(&[(at(2, 9, 0), 50.0, 1.0), (at(1, 9, 0), 51.0, 1.0)]);
    assert_eq!(
        StockModel::default().evaluate(&bars, PnlMode::Raw).unwrap_err(),
        EngineError::UnsortedTimestamps { tick: 1 }
    );
}
