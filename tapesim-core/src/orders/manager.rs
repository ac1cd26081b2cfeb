//! Order manager — one participant's view of its own orders.
//!
//! Orders live in two buckets per security: unconfirmed (sent, not yet
//! acknowledged) and confirmed. Every transition is driven by an exchange
//! callback routed through the session; the manager itself never talks to
//! the exchange.
//!
//! Lifecycle callbacks that cannot be matched to exactly one order are
//! consistency faults: recorded and logged, but never fatal, since the
//! dispatch loop must keep running.

use crate::domain::{Order, OrderId, OrderKind, ParticipantId, SecurityId, Side};
use crate::error::KernelError;
use std::collections::BTreeMap;
use tracing::warn;

/// Fired when an order is fully executed: `(security, total_size, side,
/// last_fill_price)`.
pub type CompletionCallback = Box<dyn FnMut(SecurityId, u32, Side, f64)>;

/// Fired on every fill increment: `(security, fill_size, side, fill_price)`.
pub type PositionCallback = Box<dyn FnMut(SecurityId, u32, Side, f64)>;

/// Which lifecycle callback hit the inconsistency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStage {
    Acknowledge,
    Fill,
    Cancel,
    Reject,
}

/// A lifecycle callback referenced an order id found zero or multiple times
/// in the buckets it searched. Recoverable; recorded for inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsistencyFault {
    pub stage: LifecycleStage,
    pub order_id: OrderId,
    pub security: SecurityId,
    pub matches: usize,
}

#[derive(Default)]
struct Buckets {
    unconfirmed: BTreeMap<SecurityId, Vec<Order>>,
    confirmed: BTreeMap<SecurityId, Vec<Order>>,
}

impl Buckets {
    /// Index of the unique order with `order_id`, or the offending match
    /// count.
    fn locate(orders: &[Order], order_id: OrderId) -> Result<usize, usize> {
        let mut found = None;
        let mut count = 0;
        for (idx, order) in orders.iter().enumerate() {
            if order.id == order_id {
                found = Some(idx);
                count += 1;
            }
        }
        match (found, count) {
            (Some(idx), 1) => Ok(idx),
            _ => Err(count),
        }
    }
}

pub struct OrderManager {
    participant: ParticipantId,
    next_order_id: u64,
    buckets: Buckets,
    completion_callbacks: Vec<CompletionCallback>,
    position_callbacks: Vec<PositionCallback>,
    faults: Vec<ConsistencyFault>,
}

impl OrderManager {
    pub fn new(participant: ParticipantId) -> Self {
        Self {
            participant,
            next_order_id: 0,
            buckets: Buckets::default(),
            completion_callbacks: Vec::new(),
            position_callbacks: Vec::new(),
            faults: Vec::new(),
        }
    }

    pub fn participant(&self) -> ParticipantId {
        self.participant
    }

    /// Allocate the next order id, file the order as unconfirmed, and hand
    /// back the copy to forward to the exchange. Acknowledgement arrives
    /// asynchronously via [`on_acknowledged`](Self::on_acknowledged).
    pub fn prepare_order(
        &mut self,
        security: SecurityId,
        side: Side,
        kind: OrderKind,
        size: u32,
        limit_price: f64,
    ) -> Order {
        let id = OrderId(self.next_order_id);
        self.next_order_id += 1;
        let order = Order::new(id, security, self.participant, side, kind, size, limit_price);
        self.buckets.unconfirmed.entry(security).or_default().push(order.clone());
        order
    }

    pub fn on_acknowledged(&mut self, order_id: OrderId, security: SecurityId) {
        let unconfirmed = self.buckets.unconfirmed.entry(security).or_default();
        match Buckets::locate(unconfirmed, order_id) {
            Ok(idx) => {
                let order = unconfirmed.remove(idx);
                self.buckets.confirmed.entry(security).or_default().push(order);
            }
            Err(matches) => self.fault(LifecycleStage::Acknowledge, order_id, security, matches),
        }
    }

    /// Apply a fill. Searches confirmed orders first, falling back to
    /// unconfirmed to tolerate a fill racing ahead of its acknowledgement.
    /// A fill exceeding the remaining size is fatal.
    pub fn on_filled(
        &mut self,
        order_id: OrderId,
        security: SecurityId,
        size: u32,
        price: f64,
    ) -> Result<(), KernelError> {
        let confirmed = self.buckets.confirmed.entry(security).or_default();
        match Buckets::locate(confirmed, order_id) {
            Ok(idx) => return Self::apply_fill(
                confirmed,
                idx,
                size,
                price,
                &mut self.completion_callbacks,
                &mut self.position_callbacks,
            ),
            Err(0) => {}
            Err(matches) => {
                self.fault(LifecycleStage::Fill, order_id, security, matches);
                return Ok(());
            }
        }

        let unconfirmed = self.buckets.unconfirmed.entry(security).or_default();
        match Buckets::locate(unconfirmed, order_id) {
            Ok(idx) => Self::apply_fill(
                unconfirmed,
                idx,
                size,
                price,
                &mut self.completion_callbacks,
                &mut self.position_callbacks,
            ),
            Err(matches) => {
                self.fault(LifecycleStage::Fill, order_id, security, matches);
                Ok(())
            }
        }
    }

    fn apply_fill(
        orders: &mut Vec<Order>,
        idx: usize,
        size: u32,
        price: f64,
        completion_callbacks: &mut [CompletionCallback],
        position_callbacks: &mut [PositionCallback],
    ) -> Result<(), KernelError> {
        let order = &mut orders[idx];
        if size > order.size_remaining {
            return Err(KernelError::OverFill {
                order_id: order.id,
                security: order.security,
                filled: size,
                remaining: order.size_remaining,
            });
        }
        let side = order.side;
        let security = order.security;
        order.execute(size);
        debug_assert!(order.sizes_conserved());

        if order.is_complete() {
            let total = order.size_executed;
            orders.remove(idx);
            for cb in completion_callbacks.iter_mut() {
                cb(security, total, side, price);
            }
        }
        for cb in position_callbacks.iter_mut() {
            cb(security, size, side, price);
        }
        Ok(())
    }

    pub fn on_cancelled(&mut self, order_id: OrderId, security: SecurityId) {
        self.remove_from_either_bucket(LifecycleStage::Cancel, order_id, security);
    }

    pub fn on_rejected(&mut self, order_id: OrderId, security: SecurityId) {
        self.remove_from_either_bucket(LifecycleStage::Reject, order_id, security);
    }

    /// Cancel-rejection is a normal protocol outcome; nothing to reconcile.
    /// Hook kept so the callback contract stays symmetric.
    pub fn on_cancel_rejected(&mut self, _order_id: OrderId, _security: SecurityId) {}

    fn remove_from_either_bucket(
        &mut self,
        stage: LifecycleStage,
        order_id: OrderId,
        security: SecurityId,
    ) {
        let unconfirmed = self.buckets.unconfirmed.entry(security).or_default();
        if let Ok(idx) = Buckets::locate(unconfirmed, order_id) {
            unconfirmed.remove(idx);
            return;
        }
        let confirmed = self.buckets.confirmed.entry(security).or_default();
        match Buckets::locate(confirmed, order_id) {
            Ok(idx) => {
                confirmed.remove(idx);
            }
            Err(matches) => self.fault(stage, order_id, security, matches),
        }
    }

    fn fault(&mut self, stage: LifecycleStage, order_id: OrderId, security: SecurityId, matches: usize) {
        warn!(?stage, %order_id, %security, matches, "order lifecycle consistency fault");
        self.faults.push(ConsistencyFault { stage, order_id, security, matches });
    }

    /// Signed pending size across both buckets: buys count positive, sells
    /// negative. Used by upstream risk/execution policy.
    pub fn pending_exposure(&self, security: SecurityId) -> i64 {
        let signed = |orders: &[Order]| -> i64 {
            orders
                .iter()
                .map(|o| match o.side {
                    Side::Buy => o.size_remaining as i64,
                    Side::Sell => -(o.size_remaining as i64),
                })
                .sum()
        };
        signed(self.buckets.unconfirmed.get(&security).map_or(&[][..], Vec::as_slice))
            + signed(self.buckets.confirmed.get(&security).map_or(&[][..], Vec::as_slice))
    }

    pub fn unconfirmed_orders(&self, security: SecurityId) -> &[Order] {
        self.buckets.unconfirmed.get(&security).map_or(&[][..], Vec::as_slice)
    }

    pub fn confirmed_orders(&self, security: SecurityId) -> &[Order] {
        self.buckets.confirmed.get(&security).map_or(&[][..], Vec::as_slice)
    }

    pub fn faults(&self) -> &[ConsistencyFault] {
        &self.faults
    }

    pub fn register_completion(&mut self, callback: CompletionCallback) {
        self.completion_callbacks.push(callback);
    }

    pub fn register_position_update(&mut self, callback: PositionCallback) {
        self.position_callbacks.push(callback);
    }
}
