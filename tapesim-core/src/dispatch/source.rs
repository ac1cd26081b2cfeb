//! Event source contract and the in-memory replay source.

use crate::domain::{PeriodicBar, SecurityId};
use crate::error::KernelError;
use chrono::{DateTime, Utc};

/// Receiver for drained events. Implementations must hand the timestamp to
/// the clock before any market-data consumer sees the payload; the kernel's
/// [`Session`](crate::sim::Session) is the canonical implementation.
pub trait EventSink {
    fn deliver(&mut self, security: SecurityId, bar: &PeriodicBar) -> Result<(), KernelError>;
}

/// A historical feed merged by the dispatcher.
///
/// A source with no events left goes passive: `next_pending` returns `None`
/// and the dispatcher permanently retires it. Within one source, events are
/// surrendered in the source's own order.
pub trait EventSource {
    /// Timestamp of the next buffered event, or `None` when passive.
    fn next_pending(&self) -> Option<DateTime<Utc>>;

    /// Discard events timestamped at or before `t`. Returns whether any
    /// events remain.
    fn seek_past(&mut self, t: DateTime<Utc>) -> bool;

    /// Deliver every remaining event, then go passive.
    fn drain_all(&mut self, sink: &mut dyn EventSink) -> Result<(), KernelError>;

    /// Deliver buffered events timestamped `<= limit`, keeping
    /// `next_pending` current as the cursor moves.
    fn drain_until(&mut self, limit: DateTime<Utc>, sink: &mut dyn EventSink)
        -> Result<(), KernelError>;
}

/// Time-sorted in-memory bar feed for one security.
///
/// File readers (see the runner's CSV loader) parse into a `ReplaySource`
/// rather than implementing `EventSource` themselves; the kernel's tests
/// drive it directly.
#[derive(Debug)]
pub struct ReplaySource {
    security: SecurityId,
    bars: Vec<PeriodicBar>,
    cursor: usize,
}

impl ReplaySource {
    pub fn new(security: SecurityId, mut bars: Vec<PeriodicBar>) -> Self {
        bars.sort_by_key(|b| b.ts);
        Self { security, bars, cursor: 0 }
    }

    pub fn security(&self) -> SecurityId {
        self.security
    }

    pub fn remaining(&self) -> usize {
        self.bars.len() - self.cursor
    }
}

impl EventSource for ReplaySource {
    fn next_pending(&self) -> Option<DateTime<Utc>> {
        self.bars.get(self.cursor).map(|b| b.ts)
    }

    fn seek_past(&mut self, t: DateTime<Utc>) -> bool {
        while self.cursor < self.bars.len() && self.bars[self.cursor].ts <= t {
            self.cursor += 1;
        }
        self.cursor < self.bars.len()
    }

    fn drain_all(&mut self, sink: &mut dyn EventSink) -> Result<(), KernelError> {
        while self.cursor < self.bars.len() {
            let bar = self.bars[self.cursor];
            sink.deliver(self.security, &bar)?;
            self.cursor += 1;
        }
        Ok(())
    }

    fn drain_until(
        &mut self,
        limit: DateTime<Utc>,
        sink: &mut dyn EventSink,
    ) -> Result<(), KernelError> {
        while self.cursor < self.bars.len() && self.bars[self.cursor].ts <= limit {
            let bar = self.bars[self.cursor];
            sink.deliver(self.security, &bar)?;
            self.cursor += 1;
        }
        Ok(())
    }
}
