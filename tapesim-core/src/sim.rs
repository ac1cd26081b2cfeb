//! Simulation context — explicit ownership of the whole kernel.
//!
//! One [`Session`] owns one clock, one exchange, the per-security market
//! books, and the per-participant order managers; nothing in the kernel is
//! a process-wide singleton. The session is the [`EventSink`] the
//! dispatcher drains into, and the only place where the pieces talk to
//! each other:
//!
//! clock ── date-change ──▶ books ── snapshot ──▶ exchange ── events ──▶ managers
//!
//! Everything runs on one logical thread of control; an event delivery
//! finishes completely before the dispatcher hands over the next one.

use crate::clock::{
    Clock, DailyCallback, DateChangeCallback, PeriodKind, PeriodicCallback, YearChangeCallback,
};
use crate::dispatch::{EventSink, EventSource, HistoricalDispatcher};
use crate::domain::{OrderId, OrderKind, ParticipantId, PeriodicBar, SecurityId, Side};
use crate::error::KernelError;
use crate::exchange::{ExchangeEvent, ExchangeEventKind, SimulatedExchange};
use crate::market::{MarketBook, MarketEventConsumer};
use crate::orders::{Commands, OrderCommand, OrderManager};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::warn;

pub struct Session {
    clock: Clock,
    exchange: SimulatedExchange,
    books: BTreeMap<SecurityId, MarketBook>,
    managers: BTreeMap<ParticipantId, OrderManager>,
    next_participant: u32,
}

impl Session {
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            exchange: SimulatedExchange::new(),
            books: BTreeMap::new(),
            managers: BTreeMap::new(),
            next_participant: 0,
        }
    }

    // ── Assembly ───────────────────────────────────────────────────────

    /// Create the market book for `security` with its trading window given
    /// as offsets (seconds) from the trading-day reference time.
    pub fn add_security(&mut self, security: SecurityId, open_offset_secs: i64, close_offset_secs: i64) {
        self.books
            .insert(security, MarketBook::new(security, open_offset_secs, close_offset_secs));
    }

    /// Register a participant and its order manager.
    pub fn add_participant(&mut self) -> ParticipantId {
        let participant = ParticipantId(self.next_participant);
        self.next_participant += 1;
        self.managers.insert(participant, OrderManager::new(participant));
        participant
    }

    /// Attach a market-data consumer to `security`'s book. Panics if the
    /// security was never added — that is an assembly error, not a runtime
    /// condition.
    pub fn add_consumer(&mut self, security: SecurityId, consumer: Box<dyn MarketEventConsumer>) {
        self.books
            .get_mut(&security)
            .unwrap_or_else(|| panic!("no book for {security}; call add_security first"))
            .add_consumer(consumer);
    }

    pub fn register_daily(&mut self, offset_secs: i64, callback: DailyCallback) {
        self.clock.register_daily(offset_secs, callback);
    }

    pub fn register_periodic(&mut self, kind: PeriodKind, callback: PeriodicCallback) {
        self.clock.register_periodic(kind, callback);
    }

    pub fn register_date_change(&mut self, callback: DateChangeCallback) {
        self.clock.register_date_change(callback);
    }

    pub fn register_year_change(&mut self, callback: YearChangeCallback) {
        self.clock.register_year_change(callback);
    }

    // ── Order entry ────────────────────────────────────────────────────

    /// Submit an order on behalf of `participant`. The allocated id is
    /// returned for local tracking; acknowledgement (and everything after
    /// it) arrives through the manager's callbacks. Panics on an unknown
    /// participant, which is an assembly error.
    pub fn submit_order(
        &mut self,
        participant: ParticipantId,
        security: SecurityId,
        side: Side,
        kind: OrderKind,
        size: u32,
        limit_price: f64,
    ) -> Result<OrderId, KernelError> {
        let manager = self
            .managers
            .get_mut(&participant)
            .unwrap_or_else(|| panic!("no manager for {participant}; call add_participant first"));
        let order = manager.prepare_order(security, side, kind, size, limit_price);
        let id = order.id;
        let ack = self.exchange.submit(order);
        self.route_exchange_events(vec![ack])?;
        Ok(id)
    }

    /// Ask the exchange to cancel. No local state changes until the
    /// exchange responds with cancelled or cancel-rejected.
    pub fn cancel_order(
        &mut self,
        participant: ParticipantId,
        security: SecurityId,
        order_id: OrderId,
    ) -> Result<(), KernelError> {
        let event = self.exchange.cancel(participant, security, order_id);
        self.route_exchange_events(vec![event])
    }

    // ── Access ─────────────────────────────────────────────────────────

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn exchange(&self) -> &SimulatedExchange {
        &self.exchange
    }

    pub fn book(&self, security: SecurityId) -> Option<&MarketBook> {
        self.books.get(&security)
    }

    pub fn manager(&self, participant: ParticipantId) -> Option<&OrderManager> {
        self.managers.get(&participant)
    }

    pub fn manager_mut(&mut self, participant: ParticipantId) -> Option<&mut OrderManager> {
        self.managers.get_mut(&participant)
    }

    /// End-of-run hook: daily callbacks the event stream never reached
    /// still fire, with synthesized timestamps.
    pub fn finish(&mut self) {
        self.clock.flush_pending_daily();
    }

    // ── Internals ──────────────────────────────────────────────────────

    fn route_exchange_events(&mut self, events: Vec<ExchangeEvent>) -> Result<(), KernelError> {
        for event in events {
            let Some(manager) = self.managers.get_mut(&event.participant) else {
                warn!(participant = %event.participant, order_id = %event.order_id,
                      "exchange event for unknown participant dropped");
                continue;
            };
            match event.kind {
                ExchangeEventKind::Acknowledged => {
                    manager.on_acknowledged(event.order_id, event.security);
                }
                ExchangeEventKind::Filled { size, price } => {
                    manager.on_filled(event.order_id, event.security, size, price)?;
                }
                ExchangeEventKind::Cancelled => {
                    manager.on_cancelled(event.order_id, event.security);
                }
                ExchangeEventKind::Rejected => {
                    manager.on_rejected(event.order_id, event.security);
                }
                ExchangeEventKind::CancelRejected => {
                    manager.on_cancel_rejected(event.order_id, event.security);
                }
            }
        }
        Ok(())
    }

    fn execute_commands(&mut self, commands: Vec<OrderCommand>) -> Result<(), KernelError> {
        for command in commands {
            match command {
                OrderCommand::Submit { participant, security, side, kind, size, limit_price } => {
                    self.submit_order(participant, security, side, kind, size, limit_price)?;
                }
                OrderCommand::Cancel { participant, security, order_id } => {
                    self.cancel_order(participant, security, order_id)?;
                }
            }
        }
        Ok(())
    }
}

impl EventSink for Session {
    /// One event delivery, start to finish. The clock observes the
    /// timestamp before anything else happens; only then does the payload
    /// reach the book, the exchange, and the participants.
    fn deliver(&mut self, security: SecurityId, bar: &PeriodicBar) -> Result<(), KernelError> {
        let date_changed = self.clock.on_new_event_time(bar.ts)?;
        if date_changed.is_some() {
            for book in self.books.values_mut() {
                book.on_date_change();
            }
        }

        let Some(book) = self.books.get_mut(&security) else {
            warn!(%security, ts = %bar.ts, "event for security without a book dropped");
            return Ok(());
        };

        let mut commands = Commands::default();
        let snapshot = book.apply_bar(bar, self.clock.secs_since_midnight(), &mut commands);

        let events = self.exchange.on_market_update(
            security,
            snapshot.status,
            snapshot.kind,
            snapshot.last_price,
        );
        self.route_exchange_events(events)?;
        self.execute_commands(commands.drain())
    }
}

/// A full backtest: the dispatcher plus the session it drains into.
pub struct Simulation {
    dispatcher: HistoricalDispatcher,
    session: Session,
}

impl Simulation {
    pub fn new(session: Session) -> Self {
        Self { dispatcher: HistoricalDispatcher::new(), session }
    }

    pub fn add_source(&mut self, source: Box<dyn EventSource>) {
        self.dispatcher.add_source(source);
    }

    /// Pre-roll all sources past `t` (first call only).
    pub fn seek_to(&mut self, t: DateTime<Utc>) {
        self.dispatcher.seek_all_to(t);
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Replay everything, then flush the clock's outstanding daily
    /// schedule.
    pub fn run(&mut self) -> Result<(), KernelError> {
        self.dispatcher.run(&mut self.session)?;
        self.session.finish();
        Ok(())
    }
}
