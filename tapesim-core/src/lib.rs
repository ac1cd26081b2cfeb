//! TapeSim Core — logical clock, event dispatch, simulated exchange, order management.
//!
//! This crate contains the heart of the event-driven backtesting kernel:
//! - Domain types (quotes, periodic bars, orders, ids)
//! - Logical [`clock::Clock`] with daily and periodic schedules
//! - Time-ordered merge of historical sources ([`dispatch::HistoricalDispatcher`])
//! - Per-security market books with consumer fan-out
//! - Simulated exchange matching market orders at the last price
//! - Per-participant order lifecycle tracking ([`orders::OrderManager`])
//! - The [`sim::Session`] context that wires all of it together
//!
//! Everything runs on one logical thread of control; events are delivered
//! one at a time in non-decreasing timestamp order, and each delivery
//! completes fully before the next begins.

pub mod clock;
pub mod dispatch;
pub mod domain;
pub mod error;
pub mod exchange;
pub mod market;
pub mod orders;
pub mod sim;

pub use error::KernelError;
