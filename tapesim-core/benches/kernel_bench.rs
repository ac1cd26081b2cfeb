//! Criterion benchmarks for kernel hot paths.
//!
//! Benchmarks:
//! 1. Dispatcher merge (heap-ordered delivery across many sources)
//! 2. Clock timestamp ingestion (daily + periodic schedule checks)
//! 3. Exchange market-order matching under resting load

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use chrono::{DateTime, Duration, TimeZone, Utc};
use tapesim_core::clock::{Clock, UtcCalendar};
use tapesim_core::dispatch::{EventSink, HistoricalDispatcher, ReplaySource};
use tapesim_core::domain::{
    MarketEventKind, Order, OrderId, OrderKind, ParticipantId, PeriodicBar, Quote, SecurityId,
    Side, TradingStatus,
};
use tapesim_core::exchange::SimulatedExchange;
use tapesim_core::KernelError;

// ── Helpers ──────────────────────────────────────────────────────────

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 2, 14, 0, 0).unwrap()
}

fn make_bars(n: usize, stride_secs: i64, phase_secs: i64) -> Vec<PeriodicBar> {
    let quote = Quote { bid_price: 101.0, bid_size: 10, ask_price: 102.0, ask_size: 10 };
    (0..n)
        .map(|i| PeriodicBar {
            open: quote,
            close: quote,
            high: 102.0,
            low: 101.0,
            volume: 1_000,
            ts: base_time() + Duration::seconds(phase_secs + i as i64 * stride_secs),
        })
        .collect()
}

/// Sink that only counts deliveries, so the benchmark measures the merge
/// and not the payload handling.
#[derive(Default)]
struct CountingSink {
    delivered: usize,
}

impl EventSink for CountingSink {
    fn deliver(&mut self, _security: SecurityId, _bar: &PeriodicBar) -> Result<(), KernelError> {
        self.delivered += 1;
        Ok(())
    }
}

// ── 1. Dispatcher Merge ──────────────────────────────────────────────

fn bench_dispatcher_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatcher_merge");

    for &source_count in &[1usize, 8, 64] {
        let bars_per_source = 10_000 / source_count;
        group.bench_with_input(
            BenchmarkId::new("10k_events", source_count),
            &source_count,
            |b, &sources| {
                b.iter(|| {
                    let mut dispatcher = HistoricalDispatcher::new();
                    for slot in 0..sources {
                        // Phase-shifted sources force constant re-keying.
                        dispatcher.add_source(Box::new(ReplaySource::new(
                            SecurityId(slot as u32),
                            make_bars(bars_per_source, sources as i64, slot as i64),
                        )));
                    }
                    let mut sink = CountingSink::default();
                    dispatcher.run(&mut sink).unwrap();
                    black_box(sink.delivered)
                });
            },
        );
    }

    group.finish();
}

// ── 2. Clock Ingestion ───────────────────────────────────────────────

fn bench_clock_ingestion(c: &mut Criterion) {
    let mut group = c.benchmark_group("clock_ingestion");

    group.bench_function("60k_seconds_one_day", |b| {
        b.iter(|| {
            let mut clock = Clock::new(Box::new(UtcCalendar), 300, 3600);
            for offset in [34_200_i64, 43_200, 57_600] {
                clock.register_daily(offset, Box::new(|ts| {
                    black_box(ts);
                }));
            }
            let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
            for s in 0..60_000_i64 {
                let _ = clock.on_new_event_time(start + Duration::seconds(s)).unwrap();
            }
            black_box(clock.secs_since_midnight())
        });
    });

    group.finish();
}

// ── 3. Exchange Matching ─────────────────────────────────────────────

fn bench_exchange_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("exchange_matching");

    let security = SecurityId(0);
    group.bench_function("fill_100_market_orders", |b| {
        b.iter(|| {
            let mut exchange = SimulatedExchange::new();
            for i in 0..100u64 {
                let order = Order::new(
                    OrderId(i),
                    security,
                    ParticipantId(0),
                    Side::Buy,
                    OrderKind::Market,
                    100,
                    0.0,
                );
                exchange.submit(order);
            }
            let events = exchange.on_market_update(
                security,
                TradingStatus::Trading,
                MarketEventKind::PeriodicBar,
                black_box(101.5),
            );
            black_box(events)
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_dispatcher_merge,
    bench_clock_ingestion,
    bench_exchange_matching,
);
criterion_main!(benches);
