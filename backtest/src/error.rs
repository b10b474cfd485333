//! Error types for the backtest engine and its collaborators

use thiserror::Error;

/// Main error type for backtest operations
///
/// The simulation itself never fails. These errors come from loading
/// trade data and from validating configuration before a run.
#[derive(Error, Debug)]
pub enum BacktestError {
    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Entry/exit window is inverted
    #[error("Invalid window: entry {entry} is after exit {exit}")]
    InvalidWindow {
        entry: String,
        exit: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Timestamp could not be parsed with any supported format
    #[error("Unparsable timestamp: {0:?}")]
    TimestampParse(String),

    /// Trade side was neither buy nor sell
    #[error("Invalid trade side: {0:?}")]
    InvalidSide(String),

    /// A feed row failed validation
    #[error("Invalid trade at row {row}: {reason}")]
    InvalidTrade {
        row: usize,
        reason: String,
    },

    /// CSV read/write error
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for backtest operations
pub type BacktestResult<T> = Result<T, BacktestError>;
