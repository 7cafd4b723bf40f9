//! Settlement buckets for markets where bought shares settle with a delay.
//!
//! Shares move T0 → T1 → T2 → sellable, one step per calendar-day boundary.
//! Only sellable shares may back a sell order.

use crate::domain::Shares;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementBuckets {
    /// Bought in the current session.
    pub t0: Shares,
    /// Bought one session ago.
    pub t1: Shares,
    /// Bought two sessions ago.
    pub t2: Shares,
    /// Settled and available to sell.
    pub sellable: Shares,
}

impl SettlementBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance one session: `sellable += t2; t2 = t1; t1 = t0; t0 = 0`.
    pub fn roll_forward(&mut self) {
        self.sellable += self.t2;
        self.t2 = self.t1;
        self.t1 = self.t0;
        self.t0 = 0;
    }

    /// Record a purchase made this session.
    pub fn buy(&mut self, shares: Shares) {
        self.t0 += shares;
    }

    /// Take up to `shares` from the sellable bucket, returning what was taken.
    pub fn sell(&mut self, shares: Shares) -> Shares {
        let taken = shares.min(self.sellable);
        self.sellable -= taken;
        taken
    }

    /// Shares held across every bucket.
    pub fn total(&self) -> Shares {
        self.t0 + self.t1 + self.t2 + self.sellable
    }

    /// Shares bought but not yet settled.
    pub fn unsettled(&self) -> Shares {
        self.t0 + self.t1 + self.t2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purchase_becomes_sellable_after_three_rolls() {
        let mut b = SettlementBuckets::new();
        b.buy(300);
        assert_eq!(b.sellable, 0);
        b.roll_forward();
        assert_eq!((b.t0, b.t1, b.t2, b.sellable), (0, 300, 0, 0));
        b.roll_forward();
        assert_eq!((b.t0, b.t1, b.t2, b.sellable), (0, 0, 300, 0));
        b.roll_forward();
        assert_eq!((b.t0, b.t1, b.t2, b.sellable), (0, 0, 0, 300));
    }

    #[test]
    fn roll_preserves_total() {
        let mut b = SettlementBuckets {
            t0: 100,
            t1: 200,
            t2: 300,
            sellable: 400,
        };
        let before = b.total();
        b.roll_forward();
        assert_eq!(b.total(), before);
        assert_eq!(b.sellable, 700);
        assert_eq!(b.t0, 0);
        assert_eq!(b.unsettled(), 500);
    }

    #[test]
    fn sell_is_capped_by_sellable() {
        let mut b = SettlementBuckets {
            sellable: 200,
            t0: 500,
            ..Default::default()
        };
        assert_eq!(b.sell(300), 200);
        assert_eq!(b.sellable, 0);
        assert_eq!(b.t0, 500, "unsettled shares are never sold");
    }
}
