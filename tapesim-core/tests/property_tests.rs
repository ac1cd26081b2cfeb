//! Property tests for kernel invariants.
//!
//! Uses proptest to verify:
//! 1. Merge ordering — the dispatcher delivers events in non-decreasing
//!    timestamp order regardless of how they are split across sources
//! 2. Per-source order — events from one source are never reordered
//! 3. Fill conservation — requested = remaining + executed at every step,
//!    and overfills are rejected
//! 4. Daily completeness — every registered daily offset fires exactly
//!    once per observed trading date

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;
use tapesim_core::clock::{Clock, UtcCalendar};
use tapesim_core::dispatch::{EventSink, HistoricalDispatcher, ReplaySource};
use tapesim_core::domain::{OrderKind, ParticipantId, PeriodicBar, Quote, SecurityId, Side};
use tapesim_core::orders::OrderManager;
use tapesim_core::KernelError;

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 2, 14, 0, 0).unwrap()
}

fn bar_at_secs(secs: i64) -> PeriodicBar {
    let quote = Quote { bid_price: 101.0, bid_size: 10, ask_price: 102.0, ask_size: 10 };
    PeriodicBar {
        open: quote,
        close: quote,
        high: 102.0,
        low: 101.0,
        volume: 100,
        ts: base_time() + Duration::seconds(secs),
    }
}

/// Sink that records (security, timestamp) pairs in delivery order.
#[derive(Default)]
struct Recorder {
    delivered: Vec<(SecurityId, DateTime<Utc>)>,
}

impl EventSink for Recorder {
    fn deliver(&mut self, security: SecurityId, bar: &PeriodicBar) -> Result<(), KernelError> {
        self.delivered.push((security, bar.ts));
        Ok(())
    }
}

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_source_offsets() -> impl Strategy<Value = Vec<Vec<i64>>> {
    prop::collection::vec(prop::collection::vec(0..10_000_i64, 0..40), 1..6)
}

// ── 1 & 2. Merge ordering ────────────────────────────────────────────

proptest! {
    /// The merged stream is globally non-decreasing and loses nothing.
    #[test]
    fn merge_is_globally_ordered_and_complete(offsets in arb_source_offsets()) {
        let mut dispatcher = HistoricalDispatcher::new();
        let mut total = 0;
        for (slot, secs) in offsets.iter().enumerate() {
            total += secs.len();
            let bars: Vec<PeriodicBar> = secs.iter().map(|&s| bar_at_secs(s)).collect();
            dispatcher.add_source(Box::new(ReplaySource::new(SecurityId(slot as u32), bars)));
        }

        let mut sink = Recorder::default();
        dispatcher.run(&mut sink).unwrap();

        prop_assert_eq!(sink.delivered.len(), total);
        for pair in sink.delivered.windows(2) {
            prop_assert!(pair[0].1 <= pair[1].1, "merge reordered {} after {}", pair[0].1, pair[1].1);
        }
    }

    /// Within one source, delivery order matches the source's own
    /// (sorted) order even when other sources interleave.
    #[test]
    fn per_source_order_is_preserved(offsets in arb_source_offsets()) {
        let mut dispatcher = HistoricalDispatcher::new();
        let mut expected: Vec<Vec<i64>> = Vec::new();
        for (slot, secs) in offsets.iter().enumerate() {
            let mut sorted = secs.clone();
            sorted.sort_unstable();
            expected.push(sorted);
            let bars: Vec<PeriodicBar> = secs.iter().map(|&s| bar_at_secs(s)).collect();
            dispatcher.add_source(Box::new(ReplaySource::new(SecurityId(slot as u32), bars)));
        }

        let mut sink = Recorder::default();
        dispatcher.run(&mut sink).unwrap();

        for (slot, sorted) in expected.iter().enumerate() {
            let seen: Vec<i64> = sink
                .delivered
                .iter()
                .filter(|(sec, _)| *sec == SecurityId(slot as u32))
                .map(|(_, ts)| (*ts - base_time()).num_seconds())
                .collect();
            prop_assert_eq!(&seen, sorted);
        }
    }
}

// ── 3. Fill conservation ─────────────────────────────────────────────

proptest! {
    /// requested = remaining + executed after every partial fill, and a
    /// fill beyond the remaining size is rejected without corrupting the
    /// order.
    #[test]
    fn fill_conservation_holds_under_partial_fills(
        requested in 1..1_000_u32,
        chunks in prop::collection::vec(1..200_u32, 1..10),
    ) {
        let mut manager = OrderManager::new(ParticipantId(0));
        let security = SecurityId(7);
        let order = manager.prepare_order(security, Side::Buy, OrderKind::Market, requested, 0.0);
        manager.on_acknowledged(order.id, security);

        let mut filled = 0_u32;
        for chunk in chunks {
            let remaining = requested - filled;
            if remaining == 0 {
                break;
            }
            if chunk > remaining {
                prop_assert!(manager.on_filled(order.id, security, chunk, 101.5).is_err());
                // The failed fill must not have changed anything.
                let live = &manager.confirmed_orders(security)[0];
                prop_assert!(live.sizes_conserved());
                prop_assert_eq!(live.size_executed, filled);
                continue;
            }
            manager.on_filled(order.id, security, chunk, 101.5).unwrap();
            filled += chunk;
            if filled < requested {
                let live = &manager.confirmed_orders(security)[0];
                prop_assert!(live.sizes_conserved());
                prop_assert_eq!(live.size_remaining, requested - filled);
            } else {
                // Complete orders leave the book.
                prop_assert!(manager.confirmed_orders(security).is_empty());
            }
        }
        prop_assert!(manager.faults().is_empty());
    }

    /// Completion fires exactly once, with the total executed size.
    #[test]
    fn completion_reports_total_size_once(
        requested in 2..500_u32,
        split in 1..100_u32,
    ) {
        let first = split.min(requested - 1);
        let mut manager = OrderManager::new(ParticipantId(0));
        let security = SecurityId(1);
        let completions = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&completions);
        manager.register_completion(Box::new(move |_, total, _, _| {
            log.borrow_mut().push(total);
        }));

        let order = manager.prepare_order(security, Side::Sell, OrderKind::Market, requested, 0.0);
        manager.on_acknowledged(order.id, security);
        manager.on_filled(order.id, security, first, 100.0).unwrap();
        prop_assert!(completions.borrow().is_empty());
        manager.on_filled(order.id, security, requested - first, 100.0).unwrap();
        prop_assert_eq!(&*completions.borrow(), &vec![requested]);
    }
}

// ── 4. Daily completeness ────────────────────────────────────────────

proptest! {
    /// Every registered daily offset fires exactly once per trading date
    /// the clock observes, no matter where within the day the events land.
    #[test]
    fn daily_offsets_fire_once_per_date(
        offsets in prop::collection::hash_set(0..86_400_i64, 1..8),
        event_secs in prop::collection::vec(0..86_400_i64, 1..20),
        days in 1..4_i64,
    ) {
        let mut clock = Clock::new(Box::new(UtcCalendar), 300, 3600);
        let fired = Rc::new(RefCell::new(Vec::new()));
        for &offset in &offsets {
            let log = Rc::clone(&fired);
            clock.register_daily(offset, Box::new(move |ts| {
                log.borrow_mut().push((ts.date_naive(), offset));
            }));
        }

        let mut events = Vec::new();
        for day in 0..days {
            let midnight = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()
                + Duration::days(day);
            for &s in &event_secs {
                events.push(midnight + Duration::seconds(s));
            }
        }
        events.sort_unstable();
        for t in events {
            let _ = clock.on_new_event_time(t).unwrap();
        }
        clock.flush_pending_daily();

        // Each (date, offset) pair appears exactly once.
        let mut log = fired.borrow().clone();
        let total = log.len();
        log.sort_unstable();
        log.dedup();
        prop_assert_eq!(total, log.len(), "a daily offset fired twice on one date");
        prop_assert_eq!(total, offsets.len() * days as usize);
    }
}
