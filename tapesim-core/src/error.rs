//! Fatal kernel errors.
//!
//! These abort the run: they mean the feed/dispatch contract around the
//! kernel was violated and the global ordering invariant can no longer be
//! trusted. Recoverable bookkeeping problems are not errors — see
//! [`ConsistencyFault`](crate::orders::ConsistencyFault).

use crate::domain::{OrderId, SecurityId};
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KernelError {
    /// The clock was handed a timestamp earlier than its current time. The
    /// dispatcher merge guarantees non-decreasing delivery, so this is a
    /// programming error in a source or in manual clock driving.
    #[error("time reversal: clock at {current}, observed {observed}")]
    TimeReversal {
        current: DateTime<Utc>,
        observed: DateTime<Utc>,
    },

    /// A fill notification exceeded the order's remaining size.
    #[error("overfill on {order_id} ({security}): filled {filled} > remaining {remaining}")]
    OverFill {
        order_id: OrderId,
        security: SecurityId,
        filled: u32,
        remaining: u32,
    },
}
