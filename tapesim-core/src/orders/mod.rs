//! Participant-side order lifecycle.

pub mod commands;
pub mod manager;

pub use commands::{Commands, OrderCommand};
pub use manager::{
    CompletionCallback, ConsistencyFault, LifecycleStage, OrderManager, PositionCallback,
};
