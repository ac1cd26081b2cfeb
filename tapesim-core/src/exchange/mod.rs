//! Simulated exchange — resting books, acknowledgement, and matching.
//!
//! The exchange keeps its own authoritative copy of every resting order,
//! keyed by security. It never calls anyone back directly: each operation
//! returns [`ExchangeEvent`]s and the session routes them to the owning
//! participant's order manager in emission order.
//!
//! Matching is deliberately minimal: on a market update during trading
//! hours every resting *market* order fills completely at the update's
//! last price. Limit and fill-or-kill orders are accepted, acknowledged,
//! and then rest untouched: a documented limitation, not an oversight.
//! The submission path likewise never rejects; `Rejected` exists only as
//! a vestigial hook.

use crate::domain::{
    MarketEventKind, Order, OrderId, OrderKind, ParticipantId, SecurityId, TradingStatus,
};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExchangeEventKind {
    Acknowledged,
    Filled { size: u32, price: f64 },
    Cancelled,
    /// Unreachable from the submission path today; kept so the order
    /// lifecycle contract stays complete.
    Rejected,
    CancelRejected,
}

/// One lifecycle notification, addressed to the participant that owns the
/// order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExchangeEvent {
    pub participant: ParticipantId,
    pub security: SecurityId,
    pub order_id: OrderId,
    pub kind: ExchangeEventKind,
}

#[derive(Default)]
pub struct SimulatedExchange {
    resting: BTreeMap<SecurityId, Vec<Order>>,
}

impl SimulatedExchange {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept an order. Always acknowledges: there is no rejection path for
    /// initial submission in this design.
    pub fn submit(&mut self, order: Order) -> ExchangeEvent {
        let event = ExchangeEvent {
            participant: order.participant,
            security: order.security,
            order_id: order.id,
            kind: ExchangeEventKind::Acknowledged,
        };
        self.resting.entry(order.security).or_default().push(order);
        event
    }

    /// Cancel the resting order matching `(participant, order_id)`, or
    /// cancel-reject when no such order rests — a normal protocol outcome,
    /// not an error.
    pub fn cancel(
        &mut self,
        participant: ParticipantId,
        security: SecurityId,
        order_id: OrderId,
    ) -> ExchangeEvent {
        let book = self.resting.entry(security).or_default();
        let kind = match book
            .iter()
            .position(|o| o.participant == participant && o.id == order_id)
        {
            Some(idx) => {
                book.remove(idx);
                ExchangeEventKind::Cancelled
            }
            None => {
                debug!(%participant, %security, %order_id, "cancel-reject: order not resting");
                ExchangeEventKind::CancelRejected
            }
        };
        ExchangeEvent { participant, security, order_id, kind }
    }

    /// React to a market update for `security`. Outside trading hours (or
    /// with no event to price off) nothing matches.
    pub fn on_market_update(
        &mut self,
        security: SecurityId,
        status: TradingStatus,
        kind: MarketEventKind,
        last_price: f64,
    ) -> Vec<ExchangeEvent> {
        if status != TradingStatus::Trading {
            return Vec::new();
        }
        match kind {
            // Only bar-driven matching exists; new event kinds must decide
            // here whether they carry a matchable price.
            MarketEventKind::PeriodicBar => {}
        }

        let book = match self.resting.get_mut(&security) {
            Some(book) if !book.is_empty() => book,
            _ => return Vec::new(),
        };

        let mut events = Vec::new();
        book.retain_mut(|order| {
            if order.kind != OrderKind::Market {
                // No matching logic for limit/FOK; they stay resting.
                return true;
            }
            order.execute(order.size_remaining);
            events.push(ExchangeEvent {
                participant: order.participant,
                security,
                order_id: order.id,
                kind: ExchangeEventKind::Filled { size: order.size_executed, price: last_price },
            });
            false
        });
        events
    }

    /// Number of orders resting for `security`.
    pub fn resting_count(&self, security: SecurityId) -> usize {
        self.resting.get(&security).map_or(0, Vec::len)
    }
}
