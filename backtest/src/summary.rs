//! Return summary of a finished backtest

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::engine::{BacktestReport, RoundTrip};
use crate::ledger::Ledger;

/// Headline figures derived from the ledger's last record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSummary {
    pub initial_capital: f64,
    pub final_capital: f64,
    /// Final minus initial capital, USD
    pub total_return: f64,
    /// Total return as a percentage of initial capital
    pub return_pct: f64,
    pub round_trip: Option<RoundTrip>,
}

impl BacktestSummary {
    /// Summarize a ledger. An empty ledger reports zero return.
    pub fn from_ledger(ledger: &Ledger, initial_capital: f64) -> Self {
        let final_capital = ledger.final_capital().unwrap_or(initial_capital);
        let total_return = final_capital - initial_capital;
        let return_pct = (final_capital / initial_capital - 1.0) * 100.0;

        Self {
            initial_capital,
            final_capital,
            total_return,
            return_pct,
            round_trip: None,
        }
    }

    /// Summarize a run using its settled capital, which also covers a
    /// ledger that ends on the open position at the exit date.
    pub fn from_report(report: &BacktestReport) -> Self {
        let initial_capital = report.initial_capital;
        let final_capital = report.final_capital();

        Self {
            initial_capital,
            final_capital,
            total_return: final_capital - initial_capital,
            return_pct: (final_capital / initial_capital - 1.0) * 100.0,
            round_trip: report.round_trip,
        }
    }
}

impl fmt::Display for BacktestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Backtest Results:")?;
        writeln!(f, "  Initial Capital: ${:.2}", self.initial_capital)?;
        writeln!(f, "  Final Capital: ${:.2}", self.final_capital)?;
        writeln!(f, "  Total Return: ${:.2}", self.total_return)?;
        write!(f, "  Return %: {:.2}%", self.return_pct)?;

        if let Some(trip) = &self.round_trip {
            writeln!(f)?;
            writeln!(
                f,
                "  Entry: {:.6} @ ${:.4} ({})",
                trip.shares, trip.entry_price, trip.entry_time
            )?;
            writeln!(f, "  Exit: ${:.4} ({})", trip.exit_price, trip.exit_time)?;
            write!(
                f,
                "  Gross PnL: ${:.2}, Net PnL (after fees): ${:.2}",
                trip.gross_pnl, trip.net_pnl
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::LedgerRecord;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn test_summary_from_ledger() {
        let t0 = Utc.with_ymd_and_hms(2025, 5, 16, 4, 3, 9).unwrap();
        let mut ledger = Ledger::seeded(t0, 1000.0);
        ledger.push(LedgerRecord::new(t0 + Duration::hours(1), 1050.0, 0.0));

        let summary = BacktestSummary::from_ledger(&ledger, 1000.0);
        assert_eq!(summary.final_capital, 1050.0);
        assert_relative_eq!(summary.total_return, 50.0);
        assert_relative_eq!(summary.return_pct, 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_summary_of_empty_ledger() {
        let summary = BacktestSummary::from_ledger(&Ledger::new(), 1000.0);
        assert_eq!(summary.final_capital, 1000.0);
        assert_eq!(summary.total_return, 0.0);
        assert_eq!(summary.return_pct, 0.0);
    }

    #[test]
    fn test_summary_display() {
        let t0 = Utc.with_ymd_and_hms(2025, 5, 16, 4, 3, 9).unwrap();
        let mut ledger = Ledger::seeded(t0, 1000.0);
        ledger.push(LedgerRecord::new(t0 + Duration::hours(1), 999.5, 0.0));

        let text = BacktestSummary::from_ledger(&ledger, 1000.0).to_string();
        assert!(text.contains("Initial Capital: $1000.00"));
        assert!(text.contains("Final Capital: $999.50"));
        assert!(text.contains("Total Return: $-0.50"));
        assert!(text.contains("Return %: -0.05%"));
        assert!(!text.contains("Gross PnL"));
    }

    #[test]
    fn test_report_summary_agrees_with_round_trip_on_exit_boundary() {
        use crate::config::BacktestConfig;
        use crate::engine::BacktestEngine;
        use crate::types::{Side, TradeRecord};

        let t0 = Utc.with_ymd_and_hms(2025, 5, 16, 4, 3, 9).unwrap();
        let exit = t0 + Duration::hours(1);
        let config = BacktestConfig::new(t0, exit, 1000.0)
            .with_slippage_pct(0.0)
            .with_trading_fee_usd(0.5);
        let trades = [
            TradeRecord::new(t0, Side::Buy, 100.0, 1.0),
            TradeRecord::new(exit, Side::Sell, 120.0, 1.0),
        ];
        let report = BacktestEngine::new(config).unwrap().run(&trades);

        let summary = BacktestSummary::from_report(&report);
        let trip = summary.round_trip.unwrap();
        assert_relative_eq!(summary.final_capital, 1000.0 + trip.net_pnl, epsilon = 1e-9);
        assert_relative_eq!(summary.total_return, trip.net_pnl, epsilon = 1e-9);
        assert!(summary.return_pct > 0.0);
    }
}
