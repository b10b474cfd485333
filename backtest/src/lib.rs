//! # ag-backtest: Buy-and-Hold Backtesting over Executed Trades
//!
//! This library replays a historical stream of executed trades through a
//! single buy-and-hold strategy and records account capital and position
//! size between an entry and an exit timestamp.
//!
//! ## Core Components
//!
//! - **TradeFeed**: CSV loading, timestamp normalization and window filtering
//! - **PositionState**: Flat/long account state and its pure transition rules
//! - **Ledger**: Append-only capital/position time series
//! - **BacktestEngine**: Seeds, scans, liquidates at exit, returns the ledger
//! - **SimulationObserver**: Sink for fills and exit details (logs via `tracing`)
//!
//! ## Example Usage
//!
//! ```rust
//! use ag_backtest::{BacktestConfig, BacktestEngine, BacktestSummary, TradeFeed};
//!
//! let csv = "\
//! timestamp,side,price,volume
//! 2025-05-16 04:03:09,buy,100.0,1.0
//! ";
//! let feed = TradeFeed::from_reader(csv.as_bytes()).unwrap();
//!
//! let yaml = r#"
//! entry_date: "2025-05-16 04:03:09"
//! exit_date: "2025-05-17 00:27:20"
//! initial_capital: 1000.0
//! slippage_pct: 0.0
//! trading_fee_usd: 0.5
//! "#;
//! let engine = BacktestEngine::new(BacktestConfig::from_yaml(yaml).unwrap()).unwrap();
//!
//! let report = engine.run(feed.trades());
//! assert_eq!(report.ledger.len(), 3);
//! assert!((report.final_capital() - 999.5).abs() < 1e-9);
//!
//! let summary = BacktestSummary::from_report(&report);
//! assert!((summary.total_return + 0.5).abs() < 1e-9);
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod feed;
pub mod ledger;
pub mod observer;
pub mod position;
pub mod summary;
pub mod types;

// Re-export main types
pub use config::BacktestConfig;
pub use engine::{resolve_exit_price, BacktestEngine, BacktestReport, RoundTrip};
pub use error::{BacktestError, BacktestResult};
pub use feed::{filter_window, parse_timestamp, TradeFeed};
pub use ledger::{Ledger, LedgerRecord};
pub use observer::{
    EntryFill, ExitFill, ExitPriceSource, NullObserver, RecordingObserver, SimulationEvent,
    SimulationObserver, TracingObserver,
};
pub use position::{apply_trade, close_at_exit, PositionState, Transition};
pub use summary::BacktestSummary;
pub use types::{Side, SimulationParams, TradeRecord};
