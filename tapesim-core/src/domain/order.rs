//! Order — identity, sizing, and the fill-conservation invariant.

use crate::domain::{OrderId, ParticipantId, SecurityId};
use serde::{Deserialize, Serialize};

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

/// Order type. The simulated exchange only matches `Market`; `Limit` and
/// `FillOrKill` are accepted and rest forever — a documented limitation of
/// the matching logic, not a bug to fix here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderKind {
    Market,
    Limit,
    FillOrKill,
}

/// A single order. Both the participant's manager and the exchange hold
/// their own copy; the exchange's copy is authoritative for matching.
///
/// Sizing invariant: `size_remaining + size_executed == size_requested` at
/// every point in the lifecycle. `execute` is the only mutation path and
/// preserves it structurally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub security: SecurityId,
    pub participant: ParticipantId,
    pub side: Side,
    pub kind: OrderKind,
    /// Limit price; meaningless for market orders (kept at 0.0).
    pub limit_price: f64,
    pub size_requested: u32,
    pub size_remaining: u32,
    pub size_executed: u32,
}

impl Order {
    pub fn new(
        id: OrderId,
        security: SecurityId,
        participant: ParticipantId,
        side: Side,
        kind: OrderKind,
        size: u32,
        limit_price: f64,
    ) -> Self {
        Self {
            id,
            security,
            participant,
            side,
            kind,
            limit_price,
            size_requested: size,
            size_remaining: size,
            size_executed: 0,
        }
    }

    /// Apply a fill of `size`. Caller must have checked `size <= size_remaining`.
    pub fn execute(&mut self, size: u32) {
        debug_assert!(size <= self.size_remaining, "fill exceeds remaining size");
        self.size_remaining -= size;
        self.size_executed += size;
    }

    pub fn is_complete(&self) -> bool {
        self.size_remaining == 0
    }

    /// Fill-conservation check, used by tests and debug assertions.
    pub fn sizes_conserved(&self) -> bool {
        self.size_remaining + self.size_executed == self.size_requested
    }
}
