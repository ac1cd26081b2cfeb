//! Order commands issued by market-data consumers.
//!
//! Consumers never touch the exchange or a manager directly; they push
//! commands into a buffer during fan-out and the session executes the
//! buffer immediately afterwards, still inside the same event delivery.
//! This keeps every mutation on the single logical thread of control
//! without re-entrant callback graphs.

use crate::domain::{OrderId, OrderKind, ParticipantId, SecurityId, Side};

#[derive(Debug, Clone, PartialEq)]
pub enum OrderCommand {
    Submit {
        participant: ParticipantId,
        security: SecurityId,
        side: Side,
        kind: OrderKind,
        size: u32,
        limit_price: f64,
    },
    Cancel {
        participant: ParticipantId,
        security: SecurityId,
        order_id: OrderId,
    },
}

/// Command buffer handed to consumers during market-event fan-out.
#[derive(Debug, Default)]
pub struct Commands {
    queue: Vec<OrderCommand>,
}

impl Commands {
    pub fn submit(
        &mut self,
        participant: ParticipantId,
        security: SecurityId,
        side: Side,
        kind: OrderKind,
        size: u32,
        limit_price: f64,
    ) {
        self.queue.push(OrderCommand::Submit { participant, security, side, kind, size, limit_price });
    }

    pub fn cancel(&mut self, participant: ParticipantId, security: SecurityId, order_id: OrderId) {
        self.queue.push(OrderCommand::Cancel { participant, security, order_id });
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub(crate) fn drain(&mut self) -> Vec<OrderCommand> {
        std::mem::take(&mut self.queue)
    }
}
