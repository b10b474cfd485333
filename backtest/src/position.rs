//! Position state and the buy-and-hold transition rules
//!
//! The strategy is always either fully in cash or fully invested. Both rules
//! here are pure functions from the current state to a [`Transition`]: the
//! next state, the ledger record describing it, and an optional event for
//! the observer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ledger::LedgerRecord;
use crate::observer::{EntryFill, ExitFill, SimulationEvent};
use crate::types::{SimulationParams, TradeRecord};

/// Account state of the strategy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PositionState {
    /// No position; all value is cash
    Flat { capital: f64 },
    /// Fully invested at a known effective entry price
    Long { size: f64, entry_price: f64 },
    /// Fully invested but the entry price was lost.
    /// Never produced by [`apply_trade`]; kept so liquidation can handle it.
    LongUnpriced { size: f64 },
}

impl PositionState {
    /// Opening state of a run
    pub fn initial(capital: f64) -> Self {
        PositionState::Flat { capital }
    }

    /// Cash capital; zero while invested
    pub fn capital(&self) -> f64 {
        match *self {
            PositionState::Flat { capital } => capital,
            PositionState::Long { .. } | PositionState::LongUnpriced { .. } => 0.0,
        }
    }

    /// Position size; zero while flat
    pub fn position_size(&self) -> f64 {
        match *self {
            PositionState::Flat { .. } => 0.0,
            PositionState::Long { size, .. } | PositionState::LongUnpriced { size } => size,
        }
    }

    pub fn entry_price(&self) -> Option<f64> {
        match *self {
            PositionState::Long { entry_price, .. } => Some(entry_price),
            _ => None,
        }
    }

    pub fn is_flat(&self) -> bool {
        matches!(self, PositionState::Flat { .. })
    }

    pub fn is_long(&self) -> bool {
        !self.is_flat()
    }

    /// Ledger snapshot of this state at `timestamp`
    pub fn snapshot(&self, timestamp: DateTime<Utc>) -> LedgerRecord {
        LedgerRecord::new(timestamp, self.capital(), self.position_size())
    }
}

/// Result of applying one rule to a state
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: PositionState,
    pub record: LedgerRecord,
    pub event: Option<SimulationEvent>,
}

/// Process one trade from the feed.
///
/// Only a buy while flat can change the state. Sells and anything seen while
/// long are no-ops; liquidation happens exclusively in [`close_at_exit`].
/// The returned record always carries the trade's timestamp so every trade
/// yields exactly one ledger entry.
pub fn apply_trade(
    state: PositionState,
    trade: &TradeRecord,
    params: &SimulationParams,
) -> Transition {
    let (next, event) = match state {
        PositionState::Flat { capital } if trade.is_buy() => {
            let effective_price = trade.price * (1.0 + params.slippage_pct);
            let available = capital - params.trading_fee_usd;

            if available > 0.0 {
                let shares = available / effective_price;
                let fill = EntryFill {
                    timestamp: trade.timestamp,
                    market_price: trade.price,
                    effective_price,
                    shares,
                    fee: params.trading_fee_usd,
                };
                (
                    PositionState::Long {
                        size: shares,
                        entry_price: effective_price,
                    },
                    Some(SimulationEvent::Entered(fill)),
                )
            } else {
                let event = SimulationEvent::InsufficientCapital {
                    timestamp: trade.timestamp,
                    capital,
                    fee: params.trading_fee_usd,
                };
                (state, Some(event))
            }
        }
        _ => (state, None),
    };

    Transition {
        state: next,
        record: next.snapshot(trade.timestamp),
        event,
    }
}

/// Force-close any open position at the exit boundary.
///
/// Capital after a priced exit is `initial_capital + net_pnl`. That equals
/// the cash proceeds only because the whole account went into the single
/// position; partial sizing would need to re-derive it.
pub fn close_at_exit(
    state: PositionState,
    exit_time: DateTime<Utc>,
    exit_price: f64,
    params: &SimulationParams,
) -> Transition {
    let fee = params.trading_fee_usd;

    let (next, event) = match state {
        PositionState::Long { size, entry_price } => {
            let effective_price = exit_price * (1.0 - params.slippage_pct);
            let gross_pnl = (effective_price - entry_price) * size;
            let net_pnl = gross_pnl - fee;
            let capital = params.initial_capital + net_pnl;

            let fill = ExitFill {
                timestamp: exit_time,
                shares: size,
                entry_price,
                market_price: exit_price,
                effective_price,
                gross_pnl,
                net_pnl,
                capital,
            };
            (PositionState::Flat { capital }, SimulationEvent::Exited(fill))
        }
        PositionState::LongUnpriced { size } => {
            let capital = params.initial_capital - fee;
            let event = SimulationEvent::ExitWithoutEntryPrice {
                timestamp: exit_time,
                shares: size,
                capital,
            };
            (PositionState::Flat { capital }, event)
        }
        PositionState::Flat { .. } => (
            state,
            SimulationEvent::NothingToClose {
                timestamp: exit_time,
            },
        ),
    };

    Transition {
        state: next,
        record: LedgerRecord::new(exit_time, next.capital(), 0.0),
        event: Some(event),
    }
}
