use std::collections::VecDeque;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::data::day_ids;
use crate::error::EngineError;

/// Quantities below this are treated as zero.
pub const QTY_EPSILON: f64 = 1e-12;

/// A purchased block of quantity and the session it was bought in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lot {
    pub remaining: f64,
    pub entry_day_id: usize,
}

/// Allocator output, one entry per tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    /// Position actually held after each tick; never negative.
    pub effective_position: Vec<f64>,
    /// Signed quantity traded at each tick (positive buys).
    pub trade_qty: Vec<f64>,
}

impl Allocation {
    pub fn len(&self) -> usize {
        self.trade_qty.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trade_qty.is_empty()
    }
}

/// Incremental FIFO allocator. Feed ticks in order with `step`.
#[derive(Debug, Clone, PartialEq)]
pub struct LotAllocator {
    min_hold_days: usize,
    lots: VecDeque<Lot>,
    effective: f64,
}

impl LotAllocator {
    pub fn new(min_hold_days: usize) -> Self {
        Self {
            min_hold_days,
            lots: VecDeque::new(),
            effective: 0.0,
        }
    }

    /// Move toward `desired` on session `day_id`; returns the signed traded
    /// quantity.
    ///
    /// Buys are always filled. Sells draw from the oldest lots first but
    /// skip lots younger than `min_hold_days` sessions, so a sell may be
    /// partial or empty.
    pub fn step(&mut self, day_id: usize, desired: f64) -> f64 {
        let desired = if desired.is_finite() { desired.max(0.0) } else { 0.0 };

        if desired > self.effective {
            let buy_qty = desired - self.effective;
            if buy_qty > QTY_EPSILON {
                self.lots.push_back(Lot {
                    remaining: buy_qty,
                    entry_day_id: day_id,
                });
                self.effective += buy_qty;
                return buy_qty;
            }
        } else if desired < self.effective {
            let mut to_sell = self.effective - desired;
            if to_sell > QTY_EPSILON {
                let mut sold = 0.0;
                for lot in self.lots.iter_mut() {
                    if to_sell <= QTY_EPSILON {
                        break;
                    }
                    if lot.remaining <= QTY_EPSILON {
                        continue;
                    }
                    if day_id.saturating_sub(lot.entry_day_id) >= self.min_hold_days {
                        let amount = lot.remaining.min(to_sell);
                        lot.remaining -= amount;
                        to_sell -= amount;
                        sold += amount;
                    }
                }
                self.lots.retain(|lot| lot.remaining > QTY_EPSILON);
                if sold > QTY_EPSILON {
                    self.effective -= sold;
                    return -sold;
                }
            }
        }
        0.0
    }

    /// Position currently held.
    pub fn effective(&self) -> f64 {
        self.effective
    }

    /// Open lots, oldest first.
    pub fn lots(&self) -> impl Iterator<Item = &Lot> {
        self.lots.iter()
    }

    pub fn min_hold_days(&self) -> usize {
        self.min_hold_days
    }
}

/// Run the allocator over a whole series.
///
/// `dates` only drive session grouping; `desired` is clamped at zero.
/// Both slices must have one entry per tick.
pub fn allocate(
    dates: &[NaiveDate],
    desired: &[f64],
    min_hold_days: usize,
) -> Result<Allocation, EngineError> {
    if dates.len() != desired.len() {
        return Err(EngineError::AllocationLengthMismatch {
            timestamps: dates.len(),
            quantities: desired.len(),
        });
    }
    let ids = day_ids(dates.iter().copied());
    let mut allocator = LotAllocator::new(min_hold_days);
    let mut out = Allocation {
        effective_position: Vec::with_capacity(ids.len()),
        trade_qty: Vec::with_capacity(ids.len()),
    };
    for (&day_id, &want) in ids.iter().zip(desired) {
        let traded = allocator.step(day_id, want);
        out.trade_qty.push(traded);
        out.effective_position.push(allocator.effective());
    }
    Ok(out)
}
