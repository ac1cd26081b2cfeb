use serde::{Deserialize, Serialize};

/// Where the current logical time sits relative to a security's trading
/// window. A book that has not yet seen a date change reports `None` status
/// via `Option<TradingStatus>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradingStatus {
    PreOpen,
    Trading,
    PostClose,
}

/// Kind of the latest event a market book has absorbed.
///
/// Only periodic bars exist today; the enum stays so that tick-level feeds
/// can slot in without touching the exchange's event filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketEventKind {
    PeriodicBar,
}
