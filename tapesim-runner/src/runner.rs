//! Simulation runner — wires config, bar sources, and the session together.
//!
//! Two entry points:
//! - `run_simulation()`: passive replay, reports what the tape contained.
//! - `run_simulation_with()`: same, but hands the caller the assembled
//!   simulation and a participant id first, so orders can be scripted
//!   before the tape starts.

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Context;
use serde::Serialize;
use tracing::info;

use tapesim_core::clock::{Clock, UtcCalendar};
use tapesim_core::domain::{ParticipantId, SecurityId, Side};
use tapesim_core::market::{BookSnapshot, MarketEventConsumer};
use tapesim_core::orders::Commands;
use tapesim_core::sim::{Session, Simulation};

use crate::config::SimConfig;
use crate::csv_source::load_bar_file;

/// One partial or full execution observed during the run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FillRecord {
    pub security: SecurityId,
    pub size: u32,
    pub side: Side,
    pub price: f64,
}

/// An order reaching its full requested size. `size` is the order total.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompletionRecord {
    pub security: SecurityId,
    pub size: u32,
    pub side: Side,
    pub price: f64,
}

/// What a run produced, suitable for JSON artifact output.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    /// Bars delivered per security, in security-id order.
    pub bars: Vec<(SecurityId, usize)>,
    pub fills: Vec<FillRecord>,
    pub completions: Vec<CompletionRecord>,
    /// Orders still resting at the exchange when the tape ended.
    pub resting_orders: usize,
    /// Lifecycle consistency faults the order manager recorded.
    pub fault_count: usize,
}

impl RunReport {
    /// Pretty JSON for artifact files.
    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Counts deliveries for one security's book.
struct BarCounter {
    count: Rc<RefCell<usize>>,
}

impl MarketEventConsumer for BarCounter {
    fn on_market_event(&mut self, _snapshot: &BookSnapshot, _commands: &mut Commands) {
        *self.count.borrow_mut() += 1;
    }
}

/// Assemble a simulation from config: clock, books, and one CSV-backed
/// source per security, pre-rolled if the config asks for it.
pub fn build_simulation(config: &SimConfig) -> anyhow::Result<Simulation> {
    let clock = Clock::new(
        Box::new(UtcCalendar),
        config.session.short_period_secs,
        config.session.long_period_secs,
    );
    let mut session = Session::new(clock);
    for security in &config.securities {
        session.add_security(
            SecurityId(security.id),
            config.session.open_offset_secs,
            config.session.close_offset_secs,
        );
    }

    let mut sim = Simulation::new(session);
    for security in &config.securities {
        let source = load_bar_file(SecurityId(security.id), &security.bars)
            .with_context(|| format!("loading bars for security {}", security.id))?;
        sim.add_source(Box::new(source));
    }
    if let Some(t) = config.session.seek_to {
        sim.seek_to(t);
    }
    Ok(sim)
}

/// Replay the configured tape with no orders in flight.
pub fn run_simulation(config: &SimConfig) -> anyhow::Result<RunReport> {
    run_simulation_with(config, |_, _| {})
}

/// Replay the configured tape. `setup` runs after assembly and may submit
/// orders through the session before the first event is delivered.
pub fn run_simulation_with(
    config: &SimConfig,
    setup: impl FnOnce(&mut Simulation, ParticipantId),
) -> anyhow::Result<RunReport> {
    let mut sim = build_simulation(config)?;
    let participant = sim.session_mut().add_participant();

    let mut counters = Vec::new();
    for security in &config.securities {
        let count = Rc::new(RefCell::new(0));
        sim.session_mut().add_consumer(
            SecurityId(security.id),
            Box::new(BarCounter { count: Rc::clone(&count) }),
        );
        counters.push((SecurityId(security.id), count));
    }

    let fills = Rc::new(RefCell::new(Vec::new()));
    let completions = Rc::new(RefCell::new(Vec::new()));
    {
        let manager = sim
            .session_mut()
            .manager_mut(participant)
            .context("participant registered above is missing")?;
        let log = Rc::clone(&fills);
        manager.register_position_update(Box::new(move |security, size, side, price| {
            log.borrow_mut().push(FillRecord { security, size, side, price });
        }));
        let log = Rc::clone(&completions);
        manager.register_completion(Box::new(move |security, size, side, price| {
            log.borrow_mut().push(CompletionRecord { security, size, side, price });
        }));
    }

    setup(&mut sim, participant);
    sim.run()?;

    let mut report = RunReport {
        bars: counters.into_iter().map(|(id, count)| (id, *count.borrow())).collect(),
        fills: fills.borrow().clone(),
        completions: completions.borrow().clone(),
        resting_orders: 0,
        fault_count: 0,
    };
    let session = sim.session();
    for security in &config.securities {
        report.resting_orders += session.exchange().resting_count(SecurityId(security.id));
    }
    if let Some(manager) = session.manager(participant) {
        report.fault_count = manager.faults().len();
    }

    info!(
        bars = report.bars.iter().map(|(_, n)| n).sum::<usize>(),
        fills = report.fills.len(),
        completions = report.completions.len(),
        faults = report.fault_count,
        "simulation finished"
    );
    Ok(report)
}
