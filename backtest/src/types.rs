//! Core types shared by the feed, the engine and the ledger

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::BacktestError;

/// Side of an executed trade (buy/sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "Buy"),
            Side::Sell => write!(f, "Sell"),
        }
    }
}

impl FromStr for Side {
    type Err = BacktestError;

    /// Case-insensitive; Kraken's single-letter `b`/`s` are accepted too.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" | "b" => Ok(Side::Buy),
            "sell" | "s" => Ok(Side::Sell),
            _ => Err(BacktestError::InvalidSide(s.to_string())),
        }
    }
}

/// A single executed trade from the historical feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// Execution time
    pub timestamp: DateTime<Utc>,
    /// Aggressor side
    pub side: Side,
    /// Execution price
    pub price: f64,
    /// Executed volume (carried through, not used by the strategy)
    pub volume: f64,
}

impl TradeRecord {
    pub fn new(timestamp: DateTime<Utc>, side: Side, price: f64, volume: f64) -> Self {
        Self {
            timestamp,
            side,
            price,
            volume,
        }
    }

    pub fn is_buy(&self) -> bool {
        self.side == Side::Buy
    }
}

/// Strategy parameters threaded through every state transition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationParams {
    /// Starting cash in USD
    pub initial_capital: f64,
    /// Fractional adverse price adjustment applied on entry and exit
    pub slippage_pct: f64,
    /// Flat fee charged per transaction in USD
    pub trading_fee_usd: f64,
}
