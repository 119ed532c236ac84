//! Run driver.
//!
//! [`run`] builds a [`Simulation`] from a validated configuration, seeds the
//! initial population, and pops events until the next one falls at or past
//! the horizon. Exit records and the daily census are streamed to a
//! [`SimulationObserver`] as they are produced; symbionts still resident at
//! the horizon get a final record each.

use chrono::{DateTime, Utc};
use symbiosis_types::{ExitRecord, PopulationSample, RunId};
use tracing::{info, warn};

use crate::census::Census;
use crate::config::SimulationConfig;
use crate::lifecycle::{ArrivalReport, EventReport};
use crate::simulation::{Simulation, SimulationError};

/// Why the event loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// The next event fell at or past the horizon.
    HorizonReached,
    /// No events were left.
    CalendarExhausted,
}

/// Event counts of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunTally {
    /// Events popped and handled.
    pub events: u64,
    /// Pool symbionts that took up residence after time zero.
    pub arrivals_placed: u64,
    /// Pool arrivals turned away.
    pub arrivals_rejected: u64,
    /// Divisions completed.
    pub divisions: u64,
    /// Exit records written before the horizon.
    pub exits: u64,
}

impl RunTally {
    fn record(&mut self, report: &EventReport) {
        self.events = self.events.saturating_add(1);
        match report {
            EventReport::Arrival(ArrivalReport::Placed { .. }) => {
                self.arrivals_placed = self.arrivals_placed.saturating_add(1);
            }
            EventReport::Arrival(_) => {
                self.arrivals_rejected = self.arrivals_rejected.saturating_add(1);
            }
            EventReport::Division(_) => self.divisions = self.divisions.saturating_add(1),
            EventReport::Exit(_) | EventReport::EndOfG0 { .. } => {}
        }
        let departures = u64::try_from(report.departures().count()).unwrap_or(0);
        self.exits = self.exits.saturating_add(departures);
    }
}

/// Result of one run.
#[derive(Debug, Clone)]
pub struct SimulationResult {
    /// Identifier of the run.
    pub run_id: RunId,
    /// Why the loop stopped.
    pub end_reason: EndReason,
    /// Simulated time of the last handled event.
    pub last_event_time: f64,
    /// Configured horizon.
    pub horizon: f64,
    /// Event counts.
    pub tally: RunTally,
    /// Symbionts still resident at the horizon.
    pub still_resident: u32,
    /// Census at the horizon.
    pub final_population: Option<PopulationSample>,
    /// Wall-clock start.
    pub started_at: DateTime<Utc>,
    /// Wall-clock end.
    pub finished_at: DateTime<Utc>,
}

/// Receives telemetry as the run produces it.
pub trait SimulationObserver {
    /// A symbiont left, or was still resident at the horizon.
    fn on_exit(&mut self, record: &ExitRecord);

    /// A day's census is complete.
    fn on_population(&mut self, sample: &PopulationSample);
}

/// An observer that discards everything.
pub struct NoOpObserver;

impl SimulationObserver for NoOpObserver {
    fn on_exit(&mut self, _record: &ExitRecord) {}

    fn on_population(&mut self, _sample: &PopulationSample) {}
}

/// An observer that keeps everything in memory.
#[derive(Debug, Default)]
pub struct CollectingObserver {
    /// Exit records in emission order.
    pub exits: Vec<ExitRecord>,
    /// Census samples in day order.
    pub population: Vec<PopulationSample>,
}

impl SimulationObserver for CollectingObserver {
    fn on_exit(&mut self, record: &ExitRecord) {
        self.exits.push(record.clone());
    }

    fn on_population(&mut self, sample: &PopulationSample) {
        self.population.push(sample.clone());
    }
}

/// Run one simulation to its horizon.
///
/// # Errors
///
/// Returns [`SimulationError::Config`] for an invalid configuration, or the
/// first error raised while seeding or handling events. A failed run
/// produces no result.
pub fn run(
    config: &SimulationConfig,
    observer: &mut dyn SimulationObserver,
) -> Result<SimulationResult, SimulationError> {
    config.validate()?;
    let run_id = RunId::new();
    let started_at = Utc::now();
    let horizon = config.run.max_simulated_time;

    info!(
        run_id = %run_id,
        seed = config.run.seed,
        horizon,
        grid = %config.grid.dimensions(),
        topology = ?config.grid.topology,
        clades = config.clades.len(),
        "Simulation starting"
    );

    let mut sim = Simulation::new(config)?;
    sim.populate(config.run.initial_symbionts, config.run.initial_placement)?;
    sim.schedule_arrival()?;

    let (mut census, day_zero) = Census::start(sim.population(), sim.population_by_clade());
    observer.on_population(&day_zero);

    let mut tally = RunTally::default();
    let end_reason = loop {
        let Some(next) = sim.next_event_time() else {
            break EndReason::CalendarExhausted;
        };
        if next >= horizon {
            break EndReason::HorizonReached;
        }
        for sample in census.observe(next, sim.population(), &sim.population_by_clade()) {
            observer.on_population(&sample);
        }
        let Some(report) = sim.handle_next()? else {
            break EndReason::CalendarExhausted;
        };
        for record in report.departures() {
            observer.on_exit(record);
        }
        tally.record(&report);
    };
    let last_event_time = sim.now();

    let residents = sim.residents_at(horizon)?;
    for record in &residents {
        observer.on_exit(record);
    }
    let closing = census.observe(horizon, sim.population(), &sim.population_by_clade());
    for sample in &closing {
        observer.on_population(sample);
    }

    Ok(SimulationResult {
        run_id,
        end_reason,
        last_event_time,
        horizon,
        tally,
        still_resident: u32::try_from(residents.len()).unwrap_or(u32::MAX),
        final_population: closing.last().cloned(),
        started_at,
        finished_at: Utc::now(),
    })
}

/// Log a summary of a finished run.
pub fn log_simulation_end(result: &SimulationResult) {
    let elapsed_ms = result
        .finished_at
        .signed_duration_since(result.started_at)
        .num_milliseconds();
    info!(
        run_id = %result.run_id,
        reason = ?result.end_reason,
        last_event_time = result.last_event_time,
        events = result.tally.events,
        divisions = result.tally.divisions,
        exits = result.tally.exits,
        arrivals_placed = result.tally.arrivals_placed,
        arrivals_rejected = result.tally.arrivals_rejected,
        still_resident = result.still_resident,
        elapsed_ms,
        "Simulation ended"
    );

    if result.still_resident == 0 {
        warn!(
            horizon = result.horizon,
            "No symbionts resident at the horizon"
        );
    } else if let Some(ref sample) = result.final_population {
        info!(
            day = sample.day,
            total = sample.total,
            per_clade = ?sample.per_clade,
            "Final census"
        );
    }
}
