//! Backtesting engine implementation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::BacktestConfig;
use crate::error::BacktestResult;
use crate::feed::filter_window;
use crate::ledger::{Ledger, LedgerRecord};
use crate::observer::{
    ExitPriceSource, SimulationEvent, SimulationObserver, TracingObserver,
};
use crate::position::{apply_trade, close_at_exit, PositionState, Transition};
use crate::types::{SimulationParams, TradeRecord};

/// The single entry/exit pair of a run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoundTrip {
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub shares: f64,
    /// Effective entry price after slippage
    pub entry_price: f64,
    /// Effective exit price after slippage
    pub exit_price: f64,
    pub gross_pnl: f64,
    pub net_pnl: f64,
}

/// Backtesting result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    /// Capital/position time series
    pub ledger: Ledger,

    /// Entry/exit details, if a position was opened and closed at a known price
    pub round_trip: Option<RoundTrip>,

    /// Starting capital in USD
    pub initial_capital: f64,

    /// Cash after liquidation at the exit date
    pub settled_capital: f64,
}

impl BacktestReport {
    /// Cash after liquidation.
    ///
    /// Usually equal to the last ledger record's capital. When the last
    /// trade lands exactly on the exit date the liquidation record is not
    /// appended, so the ledger still ends on the open position while this
    /// value reflects the sale.
    pub fn final_capital(&self) -> f64 {
        self.settled_capital
    }
}

/// Run phases, strictly in this order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Phase {
    NotStarted,
    Seeded,
    Scanning,
    Liquidating,
    Done,
}

/// One run of the simulation over a filtered window
struct Simulation<'a> {
    params: SimulationParams,
    entry: DateTime<Utc>,
    exit: DateTime<Utc>,
    observer: &'a mut dyn SimulationObserver,
    phase: Phase,
    state: PositionState,
    ledger: Ledger,
    entered_at: Option<DateTime<Utc>>,
    round_trip: Option<RoundTrip>,
}

impl<'a> Simulation<'a> {
    fn new(config: &BacktestConfig, observer: &'a mut dyn SimulationObserver) -> Self {
        let params = config.params();
        Self {
            params,
            entry: config.entry_date,
            exit: config.exit_date,
            observer,
            phase: Phase::NotStarted,
            state: PositionState::initial(params.initial_capital),
            ledger: Ledger::new(),
            entered_at: None,
            round_trip: None,
        }
    }

    fn advance(&mut self, next: Phase) {
        debug_assert!(next > self.phase, "phase {:?} after {:?}", next, self.phase);
        tracing::trace!(from = ?self.phase, to = ?next, "Simulation phase");
        self.phase = next;
    }

    fn seed(&mut self, trades_in_window: usize) {
        self.advance(Phase::Seeded);
        self.ledger = Ledger::seeded(self.entry, self.params.initial_capital);
        self.emit(SimulationEvent::Started {
            entry: self.entry,
            exit: self.exit,
            trades_in_window,
        });
    }

    /// No trades in the window: the account stays flat throughout
    fn finish_empty(&mut self) {
        self.ledger
            .push(LedgerRecord::new(self.exit, self.params.initial_capital, 0.0));
        self.advance(Phase::Done);
    }

    fn scan(&mut self, window: &[TradeRecord]) {
        self.advance(Phase::Scanning);
        for trade in window {
            let transition = apply_trade(self.state, trade, &self.params);
            self.commit(transition);
        }
    }

    fn liquidate(&mut self, window: &[TradeRecord]) {
        self.advance(Phase::Liquidating);

        let (exit_price, source) = resolve_exit_price(window, self.exit, &self.state);
        self.emit(SimulationEvent::ExitPriceResolved {
            timestamp: self.exit,
            price: exit_price,
            source,
        });

        let transition = close_at_exit(self.state, self.exit, exit_price, &self.params);
        self.state = transition.state;
        if let Some(event) = transition.event {
            self.emit(event);
        }
        self.ledger.push_boundary(transition.record);

        self.advance(Phase::Done);
    }

    fn commit(&mut self, transition: Transition) {
        self.state = transition.state;
        self.ledger.push(transition.record);
        if let Some(event) = transition.event {
            self.emit(event);
        }
    }

    fn emit(&mut self, event: SimulationEvent) {
        match &event {
            SimulationEvent::Entered(fill) => self.entered_at = Some(fill.timestamp),
            SimulationEvent::Exited(fill) => {
                self.round_trip = self.entered_at.map(|entry_time| RoundTrip {
                    entry_time,
                    exit_time: fill.timestamp,
                    shares: fill.shares,
                    entry_price: fill.entry_price,
                    exit_price: fill.effective_price,
                    gross_pnl: fill.gross_pnl,
                    net_pnl: fill.net_pnl,
                });
            }
            _ => {}
        }
        self.observer.on_event(&event);
    }

    fn into_report(self) -> BacktestReport {
        debug_assert_eq!(self.phase, Phase::Done);
        BacktestReport {
            ledger: self.ledger,
            round_trip: self.round_trip,
            initial_capital: self.params.initial_capital,
            settled_capital: self.state.capital(),
        }
    }
}

/// Price used to liquidate at the exit boundary.
///
/// Last trade at or before `exit`, else the first trade of the window, else
/// the open position's entry price, else zero.
pub fn resolve_exit_price(
    window: &[TradeRecord],
    exit: DateTime<Utc>,
    state: &PositionState,
) -> (f64, ExitPriceSource) {
    if let Some(trade) = window.iter().rev().find(|t| t.timestamp <= exit) {
        return (trade.price, ExitPriceSource::LastTradeAtOrBeforeExit);
    }
    if let Some(trade) = window.first() {
        return (trade.price, ExitPriceSource::FirstTrade);
    }
    (
        state.entry_price().unwrap_or(0.0),
        ExitPriceSource::EntryPriceFallback,
    )
}

/// Buy-and-hold backtesting engine
///
/// Opens one fully-invested long position on the first buy in the window
/// and liquidates it at the exit date. Runs are synchronous and
/// deterministic; the engine holds no state between runs.
#[derive(Debug, Clone)]
pub struct BacktestEngine {
    config: BacktestConfig,
}

impl BacktestEngine {
    /// Create a new backtest engine
    pub fn new(config: BacktestConfig) -> BacktestResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Run the backtest, logging events through `tracing`
    pub fn run(&self, trades: &[TradeRecord]) -> BacktestReport {
        self.run_with_observer(trades, &mut TracingObserver)
    }

    /// Run the backtest, sending every event to `observer`
    ///
    /// # Arguments
    /// * `trades` - Historical trades in any order; only those inside the
    ///   entry/exit window are used
    /// * `observer` - Receives fills, skips and exit details
    pub fn run_with_observer(
        &self,
        trades: &[TradeRecord],
        observer: &mut dyn SimulationObserver,
    ) -> BacktestReport {
        let window = filter_window(trades, self.config.entry_date, self.config.exit_date);
        let mut sim = Simulation::new(&self.config, observer);

        sim.seed(window.len());
        if window.is_empty() {
            sim.finish_empty();
            return sim.into_report();
        }

        sim.scan(&window);
        sim.liquidate(&window);
        sim.into_report()
    }
}
