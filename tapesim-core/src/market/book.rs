//! Market book — latest market snapshot for one security.
//!
//! One book per security. The book absorbs bars delivered by the session,
//! derives the security's trading status from its trading window, publishes
//! a snapshot to its consumers (in registration order), and invalidates
//! itself when the trading date changes.

use crate::domain::{MarketEventKind, PeriodicBar, SecurityId, TradingStatus};
use crate::orders::Commands;

/// What a consumer sees per market event: the bar plus the book's derived
/// state at delivery time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BookSnapshot {
    pub security: SecurityId,
    pub status: TradingStatus,
    pub last_price: f64,
    pub kind: MarketEventKind,
    pub bar: PeriodicBar,
}

/// Strategy-level receiver of market events for one security's book.
///
/// Called once per delivered event, after the clock has accepted the
/// event's timestamp. Order placement happens through the command buffer.
pub trait MarketEventConsumer {
    fn on_market_event(&mut self, snapshot: &BookSnapshot, commands: &mut Commands);
}

pub struct MarketBook {
    security: SecurityId,
    /// Trading window, as offsets (seconds) from the trading-day reference.
    open_offset_secs: i64,
    close_offset_secs: i64,
    latest_bar: Option<PeriodicBar>,
    latest_price: Option<f64>,
    latest_event: Option<MarketEventKind>,
    status: Option<TradingStatus>,
    consumers: Vec<Box<dyn MarketEventConsumer>>,
}

impl MarketBook {
    pub fn new(security: SecurityId, open_offset_secs: i64, close_offset_secs: i64) -> Self {
        Self {
            security,
            open_offset_secs,
            close_offset_secs,
            latest_bar: None,
            latest_price: None,
            latest_event: None,
            status: None,
            consumers: Vec::new(),
        }
    }

    pub fn security(&self) -> SecurityId {
        self.security
    }

    pub fn trading_status(&self) -> Option<TradingStatus> {
        self.status
    }

    pub fn latest_price(&self) -> Option<f64> {
        self.latest_price
    }

    pub fn latest_bar(&self) -> Option<&PeriodicBar> {
        self.latest_bar.as_ref()
    }

    pub fn latest_event(&self) -> Option<MarketEventKind> {
        self.latest_event
    }

    pub fn add_consumer(&mut self, consumer: Box<dyn MarketEventConsumer>) {
        self.consumers.push(consumer);
    }

    /// Invalidate the previous day's view. Called by the session on every
    /// trading-date change.
    pub fn on_date_change(&mut self) {
        self.latest_bar = None;
        self.latest_price = None;
        self.latest_event = None;
        self.status = None;
    }

    /// Absorb one bar and fan the resulting snapshot out to consumers.
    /// `secs_since_midnight` is the clock's committed offset for the bar's
    /// timestamp.
    pub fn apply_bar(
        &mut self,
        bar: &PeriodicBar,
        secs_since_midnight: i64,
        commands: &mut Commands,
    ) -> BookSnapshot {
        let status = if secs_since_midnight < self.open_offset_secs {
            TradingStatus::PreOpen
        } else if secs_since_midnight > self.close_offset_secs {
            TradingStatus::PostClose
        } else {
            TradingStatus::Trading
        };

        self.status = Some(status);
        self.latest_bar = Some(*bar);
        self.latest_price = Some(bar.mid_close());
        self.latest_event = Some(MarketEventKind::PeriodicBar);

        let snapshot = BookSnapshot {
            security: self.security,
            status,
            last_price: bar.mid_close(),
            kind: MarketEventKind::PeriodicBar,
            bar: *bar,
        };
        for consumer in &mut self.consumers {
            consumer.on_market_event(&snapshot, commands);
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Quote;
    use chrono::{TimeZone, Utc};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn bar() -> PeriodicBar {
        let quote = Quote { bid_price: 101.0, bid_size: 5, ask_price: 102.0, ask_size: 5 };
        PeriodicBar {
            open: quote,
            close: quote,
            high: 102.0,
            low: 101.0,
            volume: 10,
            ts: Utc.with_ymd_and_hms(2024, 1, 2, 15, 0, 0).unwrap(),
        }
    }

    #[test]
    fn status_tracks_trading_window() {
        // Window 09:30–16:00 as offsets from a midnight reference.
        let mut book = MarketBook::new(SecurityId(0), 34_200, 57_600);
        let mut commands = Commands::default();

        assert_eq!(book.apply_bar(&bar(), 30_000, &mut commands).status, TradingStatus::PreOpen);
        assert_eq!(book.apply_bar(&bar(), 34_200, &mut commands).status, TradingStatus::Trading);
        assert_eq!(book.apply_bar(&bar(), 57_600, &mut commands).status, TradingStatus::Trading);
        assert_eq!(book.apply_bar(&bar(), 60_000, &mut commands).status, TradingStatus::PostClose);
        assert_eq!(book.latest_price(), Some(101.5));
    }

    #[test]
    fn date_change_invalidates_view() {
        let mut book = MarketBook::new(SecurityId(0), 0, 86_400);
        let mut commands = Commands::default();
        book.apply_bar(&bar(), 100, &mut commands);
        assert!(book.latest_bar().is_some());

        book.on_date_change();
        assert!(book.latest_bar().is_none());
        assert!(book.trading_status().is_none());
        assert!(book.latest_event().is_none());
    }

    struct Recorder(Rc<RefCell<Vec<f64>>>);
    impl MarketEventConsumer for Recorder {
        fn on_market_event(&mut self, snapshot: &BookSnapshot, _commands: &mut Commands) {
            self.0.borrow_mut().push(snapshot.last_price);
        }
    }

    #[test]
    fn consumers_see_each_snapshot_in_registration_order() {
        let seen_a = Rc::new(RefCell::new(Vec::new()));
        let seen_b = Rc::new(RefCell::new(Vec::new()));
        let mut book = MarketBook::new(SecurityId(0), 0, 86_400);
        book.add_consumer(Box::new(Recorder(Rc::clone(&seen_a))));
        book.add_consumer(Box::new(Recorder(Rc::clone(&seen_b))));

        let mut commands = Commands::default();
        book.apply_bar(&bar(), 100, &mut commands);
        assert_eq!(*seen_a.borrow(), vec![101.5]);
        assert_eq!(*seen_b.borrow(), vec![101.5]);
    }
}
