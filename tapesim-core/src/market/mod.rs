//! Per-security market view.

pub mod book;

pub use book::{BookSnapshot, MarketBook, MarketEventConsumer};
