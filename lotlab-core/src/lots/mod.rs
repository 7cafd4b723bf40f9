//! FIFO lot allocation under a minimum holding period.
//!
//! Converts a desired long-only position path into the position that can
//! actually be held when a lot may only be sold `min_hold_days` sessions
//! after it was bought.

mod allocator;

pub use allocator::{allocate, Allocation, Lot, LotAllocator, QTY_EPSILON};
