//! The sponge lattice and random stream service for the Symbiosis simulation.
//!
//! This crate models where symbionts live: a 3D grid of host cells with
//! bounded single-clade occupancy, neighbor enumeration for square and hex
//! lattices, and the open-cell searches used at arrival and division. It
//! also provides the per-component random streams every stochastic decision
//! draws from.
//!
//! # Modules
//!
//! - [`cell`] -- [`Cell`] occupancy with capacity and clade exclusivity.
//! - [`error`] -- Error types for grid operations and random draws.
//! - [`grid`] -- [`Grid`] ownership of all cells plus open-cell searches.
//! - [`streams`] -- [`RandomStreams`], one seeded generator per stream.
//! - [`topology`] -- Neighbor offsets and the structural neighbor maximum.

pub mod cell;
pub mod error;
pub mod grid;
pub mod streams;
pub mod topology;

// Re-export primary types at crate root.
pub use cell::Cell;
pub use error::{StreamError, WorldError};
pub use grid::{Grid, Region, Vacancy};
pub use streams::RandomStreams;
pub use topology::max_neighbors;
