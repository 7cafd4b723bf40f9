//! Content fingerprints for reproducibility checks.
//!
//! - `fingerprint_bars`: identity of the input price series (dataset hash).
//! - `fingerprint_records`: identity of a run's output ledger.
//!
//! Floats are hashed by bit pattern, so two ledgers match only if they are
//! bit-for-bit identical.

use crate::domain::{Bar, DatasetHash, HistoryRecord};

/// BLAKE3 over every bar's timestamp and OHLCV values, in series order.
pub fn fingerprint_bars(bars: &[Bar]) -> DatasetHash {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(bar.timestamp.to_string().as_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.high.to_le_bytes());
        hasher.update(&bar.low.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
        hasher.update(&bar.volume.to_le_bytes());
    }
    DatasetHash::from_hash(hasher.finalize().to_hex().as_str())
}

/// BLAKE3 over every ledger row, in tick order.
pub fn fingerprint_records(records: &[HistoryRecord]) -> String {
    let mut hasher = blake3::Hasher::new();
    for r in records {
        hasher.update(r.time.to_string().as_bytes());
        hasher.update(&(r.current_tick as u64).to_le_bytes());
        hasher.update(r.action.code().as_bytes());
        hasher.update(&r.amount.to_le_bytes());
        for v in [
            r.signal,
            r.value,
            r.price,
            r.fee,
            r.equity,
            r.bm_equity,
            r.step_ret,
            r.cum_ret,
            r.bm_step_ret,
            r.bm_cum_ret,
        ] {
            hasher.update(&v.to_bits().to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}
