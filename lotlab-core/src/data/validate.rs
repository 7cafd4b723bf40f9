use crate::domain::Bar;
use crate::error::EngineError;

/// Columns a loaded price table must provide. `Volume` is optional and
/// defaults to zero.
pub const REQUIRED_COLUMNS: [&str; 4] = ["Open", "High", "Low", "Close"];

/// Check a price series before a run: non-empty, strictly ascending
/// timestamps, finite positive closes.
pub fn validate_bars(bars: &[Bar]) -> Result<(), EngineError> {
    if bars.is_empty() {
        return Err(EngineError::EmptySeries);
    }
    for (tick, bar) in bars.iter().enumerate() {
        if !bar.close.is_finite() || bar.close <= 0.0 {
            return Err(EngineError::InvalidPrice {
                tick,
                value: bar.close,
            });
        }
        if tick > 0 && bar.timestamp <= bars[tick - 1].timestamp {
            return Err(EngineError::UnsortedTimestamps { tick });
        }
    }
    Ok(())
}

/// Check a signal series against the number of bars it must align with.
pub fn validate_signals(signals: &[f64], bar_count: usize) -> Result<(), EngineError> {
    if signals.len() != bar_count {
        return Err(EngineError::SignalLengthMismatch {
            expected: bar_count,
            actual: signals.len(),
        });
    }
    for (tick, &value) in signals.iter().enumerate() {
        if !value.is_finite() || !(-1.0..=1.0).contains(&value) {
            return Err(EngineError::InvalidSignal { tick, value });
        }
    }
    Ok(())
}
