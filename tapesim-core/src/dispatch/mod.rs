//! Multi-source chronological event dispatch.

pub mod dispatcher;
pub mod source;

pub use dispatcher::HistoricalDispatcher;
pub use source::{EventSink, EventSource, ReplaySource};
