//! TapeSim Runner — simulation wiring and run artifacts.
//!
//! This crate builds on `tapesim-core` to provide:
//! - TOML run configuration (`SimConfig`)
//! - CSV bar files loaded into replayable sources
//! - A runner that assembles a simulation, replays the tape, and produces
//!   a serializable `RunReport`

pub mod config;
pub mod csv_source;
pub mod runner;

pub use config::{ConfigError, SecurityConfig, SessionConfig, SimConfig};
pub use csv_source::{load_bar_file, read_bars, SourceError};
pub use runner::{
    build_simulation, run_simulation, run_simulation_with, CompletionRecord, FillRecord, RunReport,
};

/// Install the default `tracing` subscriber, filtered by `RUST_LOG`.
/// Safe to call more than once; later calls are no-ops.
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}
