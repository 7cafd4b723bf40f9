//! Engine error taxonomy.
//!
//! Everything here is fatal and raised before the first tick is processed.
//! Soft execution conditions (selling with nothing settled) never surface as
//! errors; they are absorbed into the pending-sell backlog.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("invalid pnl mode '{0}' (expected 'raw' or 'after_fees')")]
    InvalidPnlMode(String),

    #[error("price series is empty")]
    EmptySeries,

    #[error("signal series has {actual} values but the price series has {expected} bars")]
    SignalLengthMismatch { expected: usize, actual: usize },

    #[error("allocator got {timestamps} timestamps but {quantities} desired quantities")]
    AllocationLengthMismatch { timestamps: usize, quantities: usize },

    #[error("signal at tick {tick} is {value}, expected a finite value in [-1, 1]")]
    InvalidSignal { tick: usize, value: f64 },

    #[error("close at tick {tick} is {value}, expected a finite positive price")]
    InvalidPrice { tick: usize, value: f64 },

    #[error("position at tick {tick} is {value}, expected a finite quantity")]
    InvalidPosition { tick: usize, value: f64 },

    #[error("timestamps must be strictly ascending (violated at tick {tick})")]
    UnsortedTimestamps { tick: usize },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("engine was stepped before reset")]
    NotReset,

    #[error("tick {got} stepped out of order (expected tick {expected})")]
    OutOfOrderTick { expected: usize, got: usize },

    #[error("tick {tick} is out of range for a series of {len} bars")]
    TickOutOfRange { tick: usize, len: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_signal_names_tick_and_value() {
        let err = EngineError::InvalidSignal {
            tick: 7,
            value: 1.5,
        };
        assert_eq!(
            err.to_string(),
            "signal at tick 7 is 1.5, expected a finite value in [-1, 1]"
        );
    }

    #[test]
    fn length_mismatch_message() {
        let err = EngineError::SignalLengthMismatch {
            expected: 5,
            actual: 4,
        };
        assert!(err.to_string().contains("4 values"));
        assert!(err.to_string().contains("5 bars"));
    }
}
