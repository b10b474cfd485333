use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{BacktestError, BacktestResult};
use crate::types::SimulationParams;

/// Backtest configuration for one entry/exit window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// Start of the window; the ledger opens here
    #[serde(with = "timestamp_serde")]
    pub entry_date: DateTime<Utc>,

    /// End of the window; any open position is liquidated here
    #[serde(with = "timestamp_serde")]
    pub exit_date: DateTime<Utc>,

    /// Starting capital in USD
    pub initial_capital: f64,

    /// Fractional slippage applied on both buy and sell
    #[serde(default = "default_slippage_pct")]
    pub slippage_pct: f64,

    /// Flat fee per transaction in USD
    #[serde(default = "default_trading_fee_usd")]
    pub trading_fee_usd: f64,
}

// Default value functions
pub fn default_slippage_pct() -> f64 {
    0.0075
}

pub fn default_trading_fee_usd() -> f64 {
    0.50
}

impl BacktestConfig {
    /// Config with default slippage and fee
    pub fn new(entry_date: DateTime<Utc>, exit_date: DateTime<Utc>, initial_capital: f64) -> Self {
        Self {
            entry_date,
            exit_date,
            initial_capital,
            slippage_pct: default_slippage_pct(),
            trading_fee_usd: default_trading_fee_usd(),
        }
    }

    pub fn with_slippage_pct(mut self, slippage_pct: f64) -> Self {
        self.slippage_pct = slippage_pct;
        self
    }

    pub fn with_trading_fee_usd(mut self, trading_fee_usd: f64) -> Self {
        self.trading_fee_usd = trading_fee_usd;
        self
    }

    /// Parameters used by the transition rules
    pub fn params(&self) -> SimulationParams {
        SimulationParams {
            initial_capital: self.initial_capital,
            slippage_pct: self.slippage_pct,
            trading_fee_usd: self.trading_fee_usd,
        }
    }

    /// Check the window and the cost parameters
    pub fn validate(&self) -> BacktestResult<()> {
        if self.entry_date > self.exit_date {
            return Err(BacktestError::InvalidWindow {
                entry: self.entry_date.to_rfc3339(),
                exit: self.exit_date.to_rfc3339(),
            });
        }
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(BacktestError::InvalidParameter(format!(
                "initial_capital must be positive, got {}",
                self.initial_capital
            )));
        }
        if !(0.0..1.0).contains(&self.slippage_pct) {
            return Err(BacktestError::InvalidParameter(format!(
                "slippage_pct must be in [0, 1), got {}",
                self.slippage_pct
            )));
        }
        if !self.trading_fee_usd.is_finite() || self.trading_fee_usd < 0.0 {
            return Err(BacktestError::InvalidParameter(format!(
                "trading_fee_usd must be non-negative, got {}",
                self.trading_fee_usd
            )));
        }
        Ok(())
    }

    /// Load configuration from YAML file
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> BacktestResult<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| BacktestError::ConfigError(e.to_string()))?;

        Self::from_yaml(&contents)
    }

    /// Load configuration from YAML string
    pub fn from_yaml(yaml: &str) -> BacktestResult<Self> {
        let config: BacktestConfig = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file<P: AsRef<Path>>(&self, path: P) -> BacktestResult<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)
            .map_err(|e| BacktestError::ConfigError(e.to_string()))?;
        Ok(())
    }
}

/// Timestamps are read with the feed's tolerant parser and written as RFC 3339
pub mod timestamp_serde {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        crate::feed::parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }
}
