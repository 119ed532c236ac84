//! Discrete-event core for the Symbiosis simulation.
//!
//! Symbionts live in the cells of a sponge lattice, grow, divide, and leave
//! on a continuous time line. Every state change is an event in a single
//! calendar; the loop pops the earliest event, routes it by the owning
//! symbiont's phase, and lets the handler schedule what comes next.
//!
//! # Modules
//!
//! - [`calendar`] -- Priority queue of events with lazy cancel and reschedule
//! - [`census`] -- Daily population samples
//! - [`config`] -- YAML configuration and validation
//! - [`context`] -- Per-run id counter, clades, and random streams
//! - [`dispatch`] -- Phase and kind to handler routing
//! - [`lifecycle`] -- Growth, division, exit, and arrival handlers
//! - [`placement`] -- Initial seeding strategies
//! - [`runner`] -- Run driver and telemetry observer
//! - [`simulation`] -- Simulation state and occupancy bookkeeping

pub mod calendar;
pub mod census;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod lifecycle;
pub mod placement;
pub mod runner;
pub mod simulation;

pub use calendar::{CalendarError, Event, EventCalendar};
pub use census::Census;
pub use config::{ConfigError, GridConfig, OutputConfig, RunConfig, SimulationConfig};
pub use context::SimulationContext;
pub use dispatch::{Handler, dispatch};
pub use lifecycle::{ArrivalReport, DivisionReport, EventReport};
pub use runner::{
    CollectingObserver, EndReason, NoOpObserver, RunTally, SimulationObserver, SimulationResult,
    log_simulation_end, run,
};
pub use simulation::{Simulation, SimulationError};
