//! Shared type definitions for the Symbiosis simulation.
//!
//! This crate is the single source of truth for the identifiers, enums and
//! value records used across the Symbiosis workspace.
//!
//! # Modules
//!
//! - [`ids`] -- Agent, clade and run identifiers
//! - [`enums`] -- Event kinds, random streams, topology, outcomes, exit statuses
//! - [`structs`] -- Grid geometry and telemetry records

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{
    DivisionOutcome, EventKind, ExitStatus, HowArrived, MutationType, Phase, Placement, Stream,
    Topology,
};
pub use ids::{AgentId, CladeId, RunId};
pub use structs::{CellCoord, ExitRecord, GridDimensions, PopulationSample};
