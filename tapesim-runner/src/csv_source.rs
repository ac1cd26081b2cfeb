//! CSV bar files → replayable event sources.
//!
//! Expected header:
//! `ts,open_bid,open_ask,close_bid,close_ask,high,low,volume,bid_size,ask_size`
//! with `ts` in RFC 3339. Rows may be in any order; the source sorts them.

use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use tapesim_core::dispatch::ReplaySource;
use tapesim_core::domain::{PeriodicBar, Quote, SecurityId};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to open bar file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse bar row: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid bar at row {row}: {reason}")]
    InvalidBar { row: usize, reason: String },
}

#[derive(Debug, Deserialize)]
struct BarRow {
    ts: chrono::DateTime<chrono::Utc>,
    open_bid: f64,
    open_ask: f64,
    close_bid: f64,
    close_ask: f64,
    high: f64,
    low: f64,
    volume: u64,
    bid_size: u32,
    ask_size: u32,
}

impl BarRow {
    fn into_bar(self) -> PeriodicBar {
        PeriodicBar {
            open: Quote {
                bid_price: self.open_bid,
                bid_size: self.bid_size,
                ask_price: self.open_ask,
                ask_size: self.ask_size,
            },
            close: Quote {
                bid_price: self.close_bid,
                bid_size: self.bid_size,
                ask_price: self.close_ask,
                ask_size: self.ask_size,
            },
            high: self.high,
            low: self.low,
            volume: self.volume,
            ts: self.ts,
        }
    }
}

/// Load one security's bar file into a [`ReplaySource`]. Invalid rows
/// (non-positive prices, zero quote sizes) are rejected rather than
/// skipped so a bad data file fails loudly.
pub fn load_bar_file(security: SecurityId, path: &Path) -> Result<ReplaySource, SourceError> {
    let file = std::fs::File::open(path).map_err(|source| SourceError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let source = read_bars(security, file)?;
    debug!(%security, path = %path.display(), "loaded bar file");
    Ok(source)
}

/// CSV → source from any reader. Exposed for tests and in-memory feeds.
pub fn read_bars<R: Read>(security: SecurityId, reader: R) -> Result<ReplaySource, SourceError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut bars = Vec::new();
    for (row, record) in csv_reader.deserialize::<BarRow>().enumerate() {
        let bar = record?.into_bar();
        if !bar.is_valid() {
            return Err(SourceError::InvalidBar {
                // +2: one for the header line, one for 1-based counting.
                row: row + 2,
                reason: format!("non-positive price or zero size at {}", bar.ts),
            });
        }
        bars.push(bar);
    }
    Ok(ReplaySource::new(security, bars))
}
