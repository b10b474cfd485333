use ag_backtest::BacktestConfig;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
pub struct Config {
    pub data: DataConfig,
    pub backtest: BacktestConfig,
    #[serde(default)]
    pub scenarios: Vec<Scenario>,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize)]
pub struct DataConfig {
    pub csv_path: PathBuf,
}

/// Re-run of the base backtest with different costs
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub slippage_pct: Option<f64>,
    pub trading_fee_usd: Option<f64>,
}

impl Scenario {
    pub fn apply(&self, base: &BacktestConfig) -> BacktestConfig {
        let mut config = base.clone();
        if let Some(slippage_pct) = self.slippage_pct {
            config.slippage_pct = slippage_pct;
        }
        if let Some(trading_fee_usd) = self.trading_fee_usd {
            config.trading_fee_usd = trading_fee_usd;
        }
        config
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct OutputConfig {
    /// Directory for per-scenario ledger files
    pub ledger_dir: Option<PathBuf>,
    #[serde(default)]
    pub format: LedgerFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LedgerFormat {
    #[default]
    Csv,
    Json,
}

impl LedgerFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            LedgerFormat::Csv => "csv",
            LedgerFormat::Json => "json",
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.backtest.validate()?;
        for scenario in &self.scenarios {
            if scenario.name.trim().is_empty() {
                bail!("scenario names must not be empty");
            }
            scenario
                .apply(&self.backtest)
                .validate()
                .with_context(|| format!("scenario {:?}", scenario.name))?;
        }
        Ok(())
    }
}
