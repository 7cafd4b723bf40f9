//! Domain types for lotlab

pub mod action;
pub mod bar;
pub mod ids;
pub mod record;

pub use action::Action;
pub use bar::Bar;
pub use ids::{ConfigId, DatasetHash, RunId};
pub use record::HistoryRecord;

/// Whole-share quantity.
pub type Shares = u64;
