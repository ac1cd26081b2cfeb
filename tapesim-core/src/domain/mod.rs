//! Domain types shared across the kernel.

pub mod bar;
pub mod ids;
pub mod market;
pub mod order;

pub use bar::{PeriodicBar, Quote};
pub use ids::{OrderId, ParticipantId, SecurityId};
pub use market::{MarketEventKind, TradingStatus};
pub use order::{Order, OrderKind, Side};
