//! Serializable backtest configuration.
//!
//! A run is described by a TOML file with two tables:
//!
//! ```toml
//! [backtest]
//! name = "vn30_buy_and_hold"
//! symbol = "VN30"
//!
//! [backtest.data]
//! type = "CSV"
//! path = "data/vn30.csv"
//!
//! [backtest.engine]
//! initial_cash = 1_000_000_000.0
//! lot_size = 100
//! fee_rate = 0.001
//! price_scale = 1000.0
//!
//! [strategy]
//! type = "BUY_AND_HOLD"
//! ```

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use lotlab_core::domain::{ConfigId, DatasetHash, RunId};
use lotlab_core::engine::EngineConfig;
use lotlab_core::strategy::{BuyAndHold, MaCrossover, Strategy};
use lotlab_core::EngineError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data_loader::{load_signal_csv, LoadError};

/// Errors from reading or validating a run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("failed to load strategy signals: {0}")]
    Signals(#[from] LoadError),
}

/// Full configuration for one backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub backtest: BacktestSection,
    pub strategy: StrategyConfig,
}

/// The `[backtest]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSection {
    pub name: String,
    /// Instrument label; also seeds synthetic data.
    pub symbol: String,
    pub data: DataConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

/// Where bars come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataConfig {
    /// OHLCV CSV file.
    Csv { path: PathBuf },

    /// Seeded random walk over weekdays in `[start, end]`. Results are tagged
    /// as synthetic.
    Synthetic { start: NaiveDate, end: NaiveDate },
}

/// Strategy selection (serializable enum).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyConfig {
    /// Full entry on the first tick, never exit.
    BuyAndHold,

    /// Explicit signal per tick.
    Fixed { signals: Vec<f64> },

    /// Signals read from the `signal` column of a CSV file.
    SignalFile { path: PathBuf },

    /// Fast/slow simple moving average crossover on closes.
    MaCrossover {
        short_period: usize,
        long_period: usize,
    },
}

impl StrategyConfig {
    /// Instantiate the configured strategy.
    ///
    /// Replay variants are rejected: they have no bar count here, so they
    /// go through [`StrategyConfig::explicit_signals`] and the run's exact
    /// length check instead.
    pub fn build(&self, name: &str) -> Result<Box<dyn Strategy>, ConfigError> {
        Ok(match self {
            StrategyConfig::BuyAndHold => Box::new(BuyAndHold),
            StrategyConfig::Fixed { .. } | StrategyConfig::SignalFile { .. } => {
                return Err(ConfigError::Invalid(format!(
                    "strategy '{name}' replays explicit signals; use explicit_signals"
                )))
            }
            StrategyConfig::MaCrossover {
                short_period,
                long_period,
            } => Box::new(MaCrossover::new(*short_period, *long_period)?),
        })
    }

    /// Explicit signal vector, if the strategy is a replay of one.
    ///
    /// Replayed signals are length-checked against the series instead of
    /// being padded or truncated.
    pub fn explicit_signals(&self) -> Result<Option<Vec<f64>>, ConfigError> {
        match self {
            StrategyConfig::Fixed { signals } => Ok(Some(signals.clone())),
            StrategyConfig::SignalFile { path } => Ok(Some(load_signal_csv(path)?)),
            _ => Ok(None),
        }
    }
}

impl BacktestConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: BacktestConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backtest.name.trim().is_empty() {
            return Err(ConfigError::Invalid("backtest.name must not be empty".into()));
        }
        if let DataConfig::Synthetic { start, end } = &self.backtest.data {
            if start > end {
                return Err(ConfigError::Invalid(format!(
                    "synthetic data start {start} is after end {end}"
                )));
            }
        }
        self.backtest.engine.validate()?;
        Ok(())
    }

    /// BLAKE3 hash of the serialized config. Identical configs share an id.
    pub fn config_id(&self) -> ConfigId {
        // Only non-UTF-8 paths fail to serialize; hash their debug form instead.
        let json = serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"));
        ConfigId::from_hash(blake3::hash(json.as_bytes()).to_hex().as_str())
    }

    /// Run id for this config over a specific dataset.
    pub fn run_id(&self, dataset_hash: &DatasetHash) -> RunId {
        RunId::new(self.config_id(), dataset_hash.clone())
    }
}
