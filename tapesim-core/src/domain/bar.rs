//! Periodic bar — the market data unit the kernel replays.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An intraday best quote: bid/ask prices and sizes at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub bid_price: f64,
    pub bid_size: u32,
    pub ask_price: f64,
    pub ask_size: u32,
}

impl Quote {
    pub fn is_valid(&self) -> bool {
        self.bid_price > 0.0 && self.ask_price > 0.0 && self.bid_size > 0 && self.ask_size > 0
    }

    /// Midpoint of the quoted spread.
    pub fn mid(&self) -> f64 {
        (self.bid_price + self.ask_price) / 2.0
    }
}

/// OHLCV bar for one security over one sampling period.
///
/// Open and close are full quotes; high/low are trade-price extremes. The
/// timestamp marks the end of the period and is the time under which the
/// dispatcher sequences the bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodicBar {
    pub open: Quote,
    pub close: Quote,
    pub high: f64,
    pub low: f64,
    pub volume: u64,
    pub ts: DateTime<Utc>,
}

impl PeriodicBar {
    pub fn is_valid(&self) -> bool {
        self.low > 0.0 && self.high > 0.0 && self.open.is_valid() && self.close.is_valid()
    }

    /// Mid price of the closing quote — the price the book publishes to the
    /// exchange on each update.
    pub fn mid_close(&self) -> f64 {
        self.close.mid()
    }
}
