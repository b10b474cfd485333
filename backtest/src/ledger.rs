//! Append-only ledger of capital/position snapshots

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

use crate::error::BacktestResult;

/// Snapshot of the account after one processed event
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LedgerRecord {
    /// Event time
    pub timestamp: DateTime<Utc>,
    /// Cash capital in USD (0 while a position is open)
    pub capital: f64,
    /// Position size in units of the traded asset
    pub position: f64,
}

impl LedgerRecord {
    pub fn new(timestamp: DateTime<Utc>, capital: f64, position: f64) -> Self {
        Self {
            timestamp,
            capital,
            position,
        }
    }
}

/// Chronological, append-only sequence of ledger records
///
/// Records are never reordered or removed. The only place a record is
/// withheld is the exit boundary, see [`Ledger::push_boundary`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
    records: Vec<LedgerRecord>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger seeded with the opening record
    pub fn seeded(timestamp: DateTime<Utc>, initial_capital: f64) -> Self {
        Self {
            records: vec![LedgerRecord::new(timestamp, initial_capital, 0.0)],
        }
    }

    pub fn push(&mut self, record: LedgerRecord) {
        self.records.push(record);
    }

    /// Append the exit-boundary record unless the last record already sits
    /// on the same timestamp. Returns whether the record was appended.
    pub fn push_boundary(&mut self, record: LedgerRecord) -> bool {
        if self.last().map(|r| r.timestamp) == Some(record.timestamp) {
            return false;
        }
        self.records.push(record);
        true
    }

    pub fn records(&self) -> &[LedgerRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<LedgerRecord> {
        self.records
    }

    pub fn first(&self) -> Option<&LedgerRecord> {
        self.records.first()
    }

    pub fn last(&self) -> Option<&LedgerRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LedgerRecord> {
        self.records.iter()
    }

    /// Capital on the last record
    pub fn final_capital(&self) -> Option<f64> {
        self.last().map(|r| r.capital)
    }

    /// Write the ledger as CSV with a `timestamp,capital,position` header
    pub fn write_csv<W: Write>(&self, writer: W) -> BacktestResult<()> {
        let mut writer = csv::Writer::from_writer(writer);
        for record in &self.records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Write the ledger as CSV to a file
    pub fn to_csv_file<P: AsRef<Path>>(&self, path: P) -> BacktestResult<()> {
        let file = std::fs::File::create(path)?;
        self.write_csv(file)
    }

    /// Write the ledger as pretty-printed JSON to a file
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> BacktestResult<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, &self.records)?;
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Ledger {
    type Item = &'a LedgerRecord;
    type IntoIter = std::slice::Iter<'a, LedgerRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
