//! Historical trade feed
//!
//! Loads executed trades from CSV, normalizes timestamps to UTC and keeps
//! them sorted ascending. The engine only relies on [`filter_window`].

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{BacktestError, BacktestResult};
use crate::types::{Side, TradeRecord};

/// Naive date-time layouts tried after RFC 3339, in order.
/// `%.f` also matches a missing fractional part.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parse a timestamp in any of the layouts the feed and config accept.
///
/// Accepted: RFC 3339, `YYYY-MM-DD HH:MM:SS[.fraction]`,
/// `YYYY-MM-DDTHH:MM:SS[.fraction]`, `YYYY-MM-DD` (midnight) and Unix epoch
/// seconds with optional fraction. Naive values are taken as UTC.
pub fn parse_timestamp(raw: &str) -> BacktestResult<DateTime<Utc>> {
    let s = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    if let Ok(secs) = s.parse::<f64>() {
        if let Some(dt) = from_epoch_seconds(secs) {
            return Ok(dt);
        }
    }

    Err(BacktestError::TimestampParse(raw.to_string()))
}

fn from_epoch_seconds(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::<Utc>::from_timestamp(whole as i64, nanos)
}

/// Trades in `[entry, exit]` inclusive, stable-sorted by timestamp
pub fn filter_window(
    trades: &[TradeRecord],
    entry: DateTime<Utc>,
    exit: DateTime<Utc>,
) -> Vec<TradeRecord> {
    let mut window: Vec<TradeRecord> = trades
        .iter()
        .filter(|t| t.timestamp >= entry && t.timestamp <= exit)
        .cloned()
        .collect();
    window.sort_by_key(|t| t.timestamp);
    window
}

/// One CSV row before validation. Extra columns are ignored.
#[derive(Debug, Deserialize)]
struct RawTrade {
    timestamp: String,
    side: String,
    price: f64,
    volume: f64,
}

impl RawTrade {
    fn into_record(self, row: usize) -> BacktestResult<TradeRecord> {
        let timestamp = parse_timestamp(&self.timestamp)?;
        let side: Side = self.side.parse()?;

        if !self.price.is_finite() || self.price <= 0.0 {
            return Err(BacktestError::InvalidTrade {
                row,
                reason: format!("price must be positive, got {}", self.price),
            });
        }
        if !self.volume.is_finite() || self.volume < 0.0 {
            return Err(BacktestError::InvalidTrade {
                row,
                reason: format!("volume must be non-negative, got {}", self.volume),
            });
        }

        Ok(TradeRecord::new(timestamp, side, self.price, self.volume))
    }
}

/// Sorted, immutable sequence of historical trades
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradeFeed {
    trades: Vec<TradeRecord>,
}

impl TradeFeed {
    /// Build a feed from records in any order
    pub fn from_records(mut trades: Vec<TradeRecord>) -> Self {
        trades.sort_by_key(|t| t.timestamp);
        Self { trades }
    }

    /// Load trades from a CSV file with `timestamp,side,price,volume` columns
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> BacktestResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "Failed to open trade feed");
            e
        })?;
        let feed = Self::from_reader(file)?;

        tracing::info!(
            path = %path.display(),
            trades = feed.len(),
            "Loaded trade feed"
        );
        Ok(feed)
    }

    /// Load trades from any CSV source
    pub fn from_reader<R: Read>(reader: R) -> BacktestResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut trades = Vec::new();
        for (index, result) in reader.deserialize::<RawTrade>().enumerate() {
            // Row 1 is the header
            let row = index + 2;
            let raw = result?;
            trades.push(raw.into_record(row)?);
        }

        Ok(Self::from_records(trades))
    }

    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    /// Trades in `[entry, exit]` inclusive
    pub fn window(&self, entry: DateTime<Utc>, exit: DateTime<Utc>) -> Vec<TradeRecord> {
        filter_window(&self.trades, entry, exit)
    }

    /// First and last timestamps in the feed
    pub fn time_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match (self.trades.first(), self.trades.last()) {
            (Some(first), Some(last)) => Some((first.timestamp, last.timestamp)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Duration, Timelike};

    fn ts(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 16, h, m, s).unwrap()
    }

    #[test]
    fn test_parse_plain_datetime() {
        assert_eq!(parse_timestamp("2025-05-16 04:03:09").unwrap(), ts(4, 3, 9));
        assert_eq!(parse_timestamp("2025-05-16T04:03:09").unwrap(), ts(4, 3, 9));
    }

    #[test]
    fn test_parse_fractional_seconds() {
        let parsed = parse_timestamp("2025-05-17 00:27:20.726655960").unwrap();
        assert_eq!(parsed.day(), 17);
        assert_eq!(parsed.second(), 20);
        assert_eq!(parsed.nanosecond(), 726_655_960);
    }

    #[test]
    fn test_parse_rfc3339_with_offset() {
        let parsed = parse_timestamp("2025-05-16T06:03:09+02:00").unwrap();
        assert_eq!(parsed, ts(4, 3, 9));
    }

    #[test]
    fn test_parse_date_only() {
        assert_eq!(parse_timestamp("2025-05-16").unwrap(), ts(0, 0, 0));
    }

    #[test]
    fn test_parse_epoch_seconds() {
        let epoch = ts(4, 3, 9).timestamp();
        assert_eq!(parse_timestamp(&epoch.to_string()).unwrap(), ts(4, 3, 9));

        let parsed = parse_timestamp(&format!("{}.5", epoch)).unwrap();
        assert_eq!(parsed, ts(4, 3, 9) + Duration::milliseconds(500));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = parse_timestamp("yesterday").unwrap_err();
        assert!(matches!(err, BacktestError::TimestampParse(_)));
    }

    #[test]
    fn test_filter_window_is_inclusive_and_sorted() {
        let trades = vec![
            TradeRecord::new(ts(4, 0, 3), Side::Sell, 1.0, 1.0),
            TradeRecord::new(ts(4, 0, 0), Side::Buy, 2.0, 1.0),
            TradeRecord::new(ts(4, 0, 1), Side::Buy, 3.0, 1.0),
            TradeRecord::new(ts(3, 59, 59), Side::Buy, 4.0, 1.0),
            TradeRecord::new(ts(4, 0, 4), Side::Buy, 5.0, 1.0),
        ];

        let window = filter_window(&trades, ts(4, 0, 0), ts(4, 0, 3));
        let prices: Vec<f64> = window.iter().map(|t| t.price).collect();
        assert_eq!(prices, vec![2.0, 3.0, 1.0]);
    }

    #[test]
    fn test_filter_window_sort_is_stable() {
        let trades = vec![
            TradeRecord::new(ts(4, 0, 1), Side::Buy, 1.0, 1.0),
            TradeRecord::new(ts(4, 0, 0), Side::Sell, 2.0, 1.0),
            TradeRecord::new(ts(4, 0, 1), Side::Sell, 3.0, 1.0),
        ];

        let window = filter_window(&trades, ts(4, 0, 0), ts(5, 0, 0));
        let prices: Vec<f64> = window.iter().map(|t| t.price).collect();
        assert_eq!(prices, vec![2.0, 1.0, 3.0]);
    }

    #[test]
    fn test_feed_from_csv() {
        let csv = "\
timestamp,side,price,volume,ord_type
2025-05-16 04:03:10,sell,1.10,25.0,market
2025-05-16 04:03:09,BUY,1.05,10.5,limit
";
        let feed = TradeFeed::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(feed.len(), 2);
        assert_eq!(feed.trades()[0].side, Side::Buy);
        assert_eq!(feed.trades()[0].price, 1.05);
        assert_eq!(feed.trades()[1].side, Side::Sell);
        assert_eq!(feed.time_range(), Some((ts(4, 3, 9), ts(4, 3, 10))));
    }

    #[test]
    fn test_feed_rejects_non_positive_price() {
        let csv = "\
timestamp,side,price,volume
2025-05-16 04:03:09,buy,1.0,1.0
2025-05-16 04:03:10,buy,0.0,1.0
";
        let err = TradeFeed::from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, BacktestError::InvalidTrade { row: 3, .. }));
    }

    #[test]
    fn test_feed_rejects_negative_volume() {
        let csv = "timestamp,side,price,volume\n2025-05-16 04:03:09,buy,1.0,-1.0\n";
        let err = TradeFeed::from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, BacktestError::InvalidTrade { row: 2, .. }));
    }

    #[test]
    fn test_feed_rejects_unknown_side() {
        let csv = "timestamp,side,price,volume\n2025-05-16 04:03:09,hold,1.0,1.0\n";
        let err = TradeFeed::from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, BacktestError::InvalidSide(_)));
    }

    #[test]
    fn test_feed_from_missing_file() {
        let err = TradeFeed::from_csv_path("/nonexistent/trades.csv").unwrap_err();
        assert!(matches!(err, BacktestError::IoError(_)));
    }
}
