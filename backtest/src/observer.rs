//! Simulation events and the observer seam that receives them
//!
//! The transition rules in [`crate::position`] are pure: they describe what
//! happened as a [`SimulationEvent`] instead of logging it. The engine hands
//! every event to a [`SimulationObserver`]. [`TracingObserver`] is the
//! default sink and turns events into `tracing` records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where the liquidation price came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitPriceSource {
    /// Last trade at or before the exit time
    LastTradeAtOrBeforeExit,
    /// First trade in the window
    FirstTrade,
    /// Entry price of the open position, or zero when flat
    EntryPriceFallback,
}

/// Position opened on a qualifying buy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntryFill {
    pub timestamp: DateTime<Utc>,
    /// Trade price before slippage
    pub market_price: f64,
    /// Price paid after slippage
    pub effective_price: f64,
    pub shares: f64,
    pub fee: f64,
}

/// Position closed at the exit boundary
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExitFill {
    pub timestamp: DateTime<Utc>,
    pub shares: f64,
    pub entry_price: f64,
    /// Exit price before slippage
    pub market_price: f64,
    /// Price received after slippage
    pub effective_price: f64,
    pub gross_pnl: f64,
    pub net_pnl: f64,
    /// Capital after liquidation
    pub capital: f64,
}

/// Everything the simulation reports while it runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimulationEvent {
    /// Run started over the given window
    Started {
        entry: DateTime<Utc>,
        exit: DateTime<Utc>,
        trades_in_window: usize,
    },
    /// Buy filled, position opened
    Entered(EntryFill),
    /// Buy skipped because the fee consumes all available capital
    InsufficientCapital {
        timestamp: DateTime<Utc>,
        capital: f64,
        fee: f64,
    },
    /// Liquidation price chosen
    ExitPriceResolved {
        timestamp: DateTime<Utc>,
        price: f64,
        source: ExitPriceSource,
    },
    /// Position closed with known entry price
    Exited(ExitFill),
    /// Position closed but its entry price was unknown; only the fee was applied
    ExitWithoutEntryPrice {
        timestamp: DateTime<Utc>,
        shares: f64,
        capital: f64,
    },
    /// Exit boundary reached while flat
    NothingToClose { timestamp: DateTime<Utc> },
}

/// Sink for simulation events
pub trait SimulationObserver {
    fn on_event(&mut self, event: &SimulationEvent);
}

/// Logs every event through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl SimulationObserver for TracingObserver {
    fn on_event(&mut self, event: &SimulationEvent) {
        match event {
            SimulationEvent::Started {
                entry,
                exit,
                trades_in_window,
            } => {
                tracing::info!(
                    entry = %entry,
                    exit = %exit,
                    trades = trades_in_window,
                    "Running buy-and-hold backtest"
                );
            }
            SimulationEvent::Entered(fill) => {
                tracing::info!(
                    timestamp = %fill.timestamp,
                    shares = fill.shares,
                    price = fill.effective_price,
                    "BUY filled"
                );
            }
            SimulationEvent::InsufficientCapital {
                timestamp,
                capital,
                fee,
            } => {
                tracing::debug!(
                    timestamp = %timestamp,
                    capital = %capital,
                    fee = %fee,
                    "Buy skipped, fee exceeds available capital"
                );
            }
            SimulationEvent::ExitPriceResolved {
                timestamp,
                price,
                source,
            } => {
                tracing::info!(
                    timestamp = %timestamp,
                    price = price,
                    source = ?source,
                    "Closing position at exit"
                );
            }
            SimulationEvent::Exited(fill) => {
                tracing::info!(
                    shares = fill.shares,
                    entry_price = fill.entry_price,
                    exit_price = fill.effective_price,
                    gross_pnl = fill.gross_pnl,
                    net_pnl = fill.net_pnl,
                    "SELL filled"
                );
            }
            SimulationEvent::ExitWithoutEntryPrice {
                timestamp,
                shares,
                capital,
            } => {
                tracing::warn!(
                    timestamp = %timestamp,
                    shares = %shares,
                    capital = %capital,
                    "No entry price found, applying trading fee only"
                );
            }
            SimulationEvent::NothingToClose { timestamp } => {
                tracing::debug!(timestamp = %timestamp, "No position to close at exit");
            }
        }
    }
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl SimulationObserver for NullObserver {
    fn on_event(&mut self, _event: &SimulationEvent) {}
}

/// Keeps every event in order, useful for audits and tests
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    events: Vec<SimulationEvent>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[SimulationEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<SimulationEvent> {
        self.events
    }
}

impl SimulationObserver for RecordingObserver {
    fn on_event(&mut self, event: &SimulationEvent) {
        self.events.push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_recording_observer_keeps_order() {
        let ts = Utc.with_ymd_and_hms(2025, 5, 17, 0, 27, 20).unwrap();
        let mut observer = RecordingObserver::new();

        observer.on_event(&SimulationEvent::NothingToClose { timestamp: ts });
        observer.on_event(&SimulationEvent::ExitPriceResolved {
            timestamp: ts,
            price: 0.0,
            source: ExitPriceSource::EntryPriceFallback,
        });

        let events = observer.into_events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], SimulationEvent::NothingToClose { .. }));
        assert!(matches!(events[1], SimulationEvent::ExitPriceResolved { .. }));
    }

    #[test]
    fn test_tracing_observer_accepts_every_event() {
        let ts = Utc.with_ymd_and_hms(2025, 5, 17, 0, 27, 20).unwrap();
        let mut observer = TracingObserver;
        observer.on_event(&SimulationEvent::ExitWithoutEntryPrice {
            timestamp: ts,
            shares: 1.0,
            capital: 999.5,
        });
        observer.on_event(&SimulationEvent::NothingToClose { timestamp: ts });
    }
}
