//! Price-series checks and calendar-day grouping.
//!
//! Loading itself lives in the runner; the engine only accepts series that
//! pass these checks.

pub mod calendar;
pub mod validate;

pub use calendar::{day_ids, DayGroups};
pub use validate::{validate_bars, validate_signals, REQUIRED_COLUMNS};
