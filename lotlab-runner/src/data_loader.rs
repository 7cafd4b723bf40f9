//! Bar loading and data resolution for the runner.
//!
//! Three inputs are read from CSV:
//! - price bars (`Date`[, `time`], `Open`, `High`, `Low`, `Close`[, `Volume`])
//! - position series for the accounting models (`Date`[, `time`], `Close`, `position`)
//! - precomputed signals (`signal`)
//!
//! When no file is configured, `DataConfig::Synthetic` produces a seeded
//! random walk. Synthetic data is a developer-only debug mode and results
//! produced on it are tagged.

use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use lotlab_core::accounting::PositionBar;
use lotlab_core::data::{validate_bars, REQUIRED_COLUMNS};
use lotlab_core::domain::{Bar, DatasetHash};
use lotlab_core::fingerprint::fingerprint_bars;
use lotlab_core::EngineError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::DataConfig;

/// Column names accepted for the date (or full timestamp) field.
const DATE_COLUMNS: [&str; 6] = ["Date", "date", "Datetime", "datetime", "timestamp", "Timestamp"];
/// Column names accepted for a separate time-of-day field.
const TIME_COLUMNS: [&str; 2] = ["time", "Time"];
const VOLUME_COLUMNS: [&str; 2] = ["Volume", "volume"];
const POSITION_COLUMNS: [&str; 2] = ["position", "Position"];
const SIGNAL_COLUMNS: [&str; 2] = ["signal", "Signal"];

const DATETIME_FORMATS: [&str; 7] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
];
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("'{path}' is missing required columns: {}", .columns.join(", "))]
    MissingColumns { path: PathBuf, columns: Vec<String> },

    #[error("'{path}' line {line}: {reason}")]
    BadRow {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("no usable rows in '{0}'")]
    Empty(PathBuf),
}

/// Where a run's bars came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Csv,
    Synthetic,
}

/// Result of loading bars, including data source provenance.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub bars: Vec<Bar>,
    pub source: DataSource,
    /// BLAKE3 over all bar data, for run ids.
    pub dataset_hash: DatasetHash,
    pub has_synthetic: bool,
}

/// Load the bars described by `data`.
///
/// `symbol` seeds the synthetic walk; CSV loading ignores it.
pub fn load_bars(data: &DataConfig, symbol: &str) -> Result<LoadedData, LoadError> {
    let (bars, source) = match data {
        DataConfig::Csv { path } => (load_csv_bars(path)?, DataSource::Csv),
        DataConfig::Synthetic { start, end } => {
            warn!(symbol, "generating synthetic data; results will be tagged as synthetic");
            let bars = generate_synthetic_bars(symbol, *start, *end);
            validate_bars(&bars)?;
            (bars, DataSource::Synthetic)
        }
    };
    let dataset_hash = fingerprint_bars(&bars);
    debug!(bars = bars.len(), hash = %dataset_hash, "bars loaded");
    Ok(LoadedData {
        bars,
        source,
        dataset_hash,
        has_synthetic: source == DataSource::Synthetic,
    })
}

/// Read an OHLCV CSV into bars sorted by timestamp.
///
/// Every row must parse; a malformed row is an error naming its line.
/// Missing or empty volume reads as zero.
pub fn load_csv_bars(path: &Path) -> Result<Vec<Bar>, LoadError> {
    let mut reader = open_reader(path)?;
    let headers = reader.headers()?.clone();
    let ts = TimestampColumns::locate(&headers, path)?;

    let mut missing = Vec::new();
    let mut price_idx = [0usize; 4];
    for (slot, name) in price_idx.iter_mut().zip(REQUIRED_COLUMNS) {
        match find_column(&headers, &[name]) {
            Some(i) => *slot = i,
            None => missing.push(name.to_string()),
        }
    }
    if !missing.is_empty() {
        return Err(LoadError::MissingColumns {
            path: path.to_path_buf(),
            columns: missing,
        });
    }
    let [open_i, high_i, low_i, close_i] = price_idx;
    let volume_i = find_column(&headers, &VOLUME_COLUMNS);

    let mut bars = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map_or(0, |p| p.line());
        let bad = |reason: String| LoadError::BadRow {
            path: path.to_path_buf(),
            line,
            reason,
        };

        let timestamp = ts
            .parse(&record)
            .ok_or_else(|| bad("unparsable timestamp".into()))?;
        let field = |i: usize, name: &str| {
            parse_f64(record.get(i)).ok_or_else(|| bad(format!("unparsable {name}")))
        };
        let volume = match volume_i.map(|i| record.get(i).unwrap_or("").trim()) {
            None | Some("") => 0,
            Some(raw) => raw
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && *v >= 0.0)
                .map(|v| v as u64)
                .ok_or_else(|| bad("unparsable volume".into()))?,
        };

        bars.push(Bar {
            timestamp,
            open: field(open_i, "Open")?,
            high: field(high_i, "High")?,
            low: field(low_i, "Low")?,
            close: field(close_i, "Close")?,
            volume,
        });
    }

    if bars.is_empty() {
        return Err(LoadError::Empty(path.to_path_buf()));
    }
    bars.sort_by_key(|b| b.timestamp);
    validate_bars(&bars)?;
    Ok(bars)
}

/// Read a position series for the accounting models.
///
/// Rows whose timestamp or close cannot be parsed are dropped; an
/// unparsable position reads as flat. Rows are sorted by timestamp.
pub fn load_position_csv(path: &Path) -> Result<Vec<PositionBar>, LoadError> {
    let mut reader = open_reader(path)?;
    let headers = reader.headers()?.clone();
    let ts = TimestampColumns::locate(&headers, path)?;

    let close_i = find_column(&headers, &["Close", "close"]);
    let position_i = find_column(&headers, &POSITION_COLUMNS);
    let missing: Vec<String> = [("Close", close_i), ("position", position_i)]
        .into_iter()
        .filter(|(_, i)| i.is_none())
        .map(|(name, _)| name.to_string())
        .collect();
    let (Some(close_i), Some(position_i)) = (close_i, position_i) else {
        return Err(LoadError::MissingColumns {
            path: path.to_path_buf(),
            columns: missing,
        });
    };

    let mut rows = Vec::new();
    let mut dropped = 0usize;
    for record in reader.records() {
        let record = record?;
        let parsed = ts
            .parse(&record)
            .zip(parse_f64(record.get(close_i)).filter(|c| c.is_finite()));
        let Some((timestamp, close)) = parsed else {
            dropped += 1;
            continue;
        };
        let position = parse_f64(record.get(position_i))
            .filter(|p| p.is_finite())
            .unwrap_or(0.0);
        rows.push(PositionBar {
            timestamp,
            close,
            position,
        });
    }

    if dropped > 0 {
        warn!(dropped, path = %path.display(), "dropped rows with unparsable timestamp or close");
    }
    if rows.is_empty() {
        return Err(LoadError::Empty(path.to_path_buf()));
    }
    rows.sort_by_key(|r| r.timestamp);
    Ok(rows)
}

/// Read the `signal` column of a CSV, in file order.
///
/// Values are not range-checked here; the engine rejects out-of-range
/// signals with the offending tick.
pub fn load_signal_csv(path: &Path) -> Result<Vec<f64>, LoadError> {
    let mut reader = open_reader(path)?;
    let headers = reader.headers()?.clone();
    let Some(signal_i) = find_column(&headers, &SIGNAL_COLUMNS) else {
        return Err(LoadError::MissingColumns {
            path: path.to_path_buf(),
            columns: vec!["signal".into()],
        });
    };

    let mut signals = Vec::new();
    for record in reader.records() {
        let record = record?;
        let value = parse_f64(record.get(signal_i)).ok_or_else(|| LoadError::BadRow {
            path: path.to_path_buf(),
            line: record.position().map_or(0, |p| p.line()),
            reason: "unparsable signal".into(),
        })?;
        signals.push(value);
    }
    Ok(signals)
}

/// Generate synthetic bars for testing/development.
///
/// A random walk from 100.0 over weekdays in `[start, end]`, seeded from the
/// symbol so the same symbol always yields the same series.
pub fn generate_synthetic_bars(symbol: &str, start: NaiveDate, end: NaiveDate) -> Vec<Bar> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut bars = Vec::new();
    let mut price = 100.0_f64;
    let mut current = start;

    while current <= end {
        if matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            current += Duration::days(1);
            continue;
        }

        let daily_return: f64 = rng.gen_range(-0.03..0.03);
        let open = price;
        let close = price * (1.0 + daily_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        let volume = rng.gen_range(500_000..5_000_000u64);

        bars.push(Bar {
            timestamp: current.and_time(NaiveTime::MIN),
            open,
            high,
            low,
            close,
            volume,
        });

        price = close;
        current += Duration::days(1);
    }

    bars
}

// ─── CSV helpers ────────────────────────────────────────────────────

fn open_reader(path: &Path) -> Result<csv::Reader<File>, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file))
}

fn find_column(headers: &csv::StringRecord, candidates: &[&str]) -> Option<usize> {
    candidates
        .iter()
        .find_map(|name| headers.iter().position(|h| h == *name))
}

fn parse_f64(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
}

/// Date column plus an optional time-of-day column.
///
/// A file with only a `time` column treats it as the full timestamp.
#[derive(Debug, Clone, Copy)]
struct TimestampColumns {
    date: usize,
    time: Option<usize>,
}

impl TimestampColumns {
    fn locate(headers: &csv::StringRecord, path: &Path) -> Result<Self, LoadError> {
        let date = find_column(headers, &DATE_COLUMNS);
        let time = find_column(headers, &TIME_COLUMNS);
        match (date, time) {
            (Some(date), time) => Ok(Self { date, time }),
            (None, Some(time)) => Ok(Self {
                date: time,
                time: None,
            }),
            (None, None) => Err(LoadError::MissingColumns {
                path: path.to_path_buf(),
                columns: vec!["Date".into()],
            }),
        }
    }

    fn parse(&self, record: &csv::StringRecord) -> Option<NaiveDateTime> {
        let date = record.get(self.date)?.trim();
        match self.time.and_then(|i| record.get(i)).map(str::trim) {
            Some(time) if !time.is_empty() => parse_timestamp(&format!("{date} {time}")),
            _ => parse_timestamp(date),
        }
    }
}

/// Parse a timestamp in any of the accepted layouts. Bare dates land on
/// midnight.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}
