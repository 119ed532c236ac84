//! Error types for the `symbiosis-world` crate.
//!
//! Grid operations return [`WorldError`]; the random stream service returns
//! [`StreamError`], which converts into [`WorldError`] where a grid search
//! draws variates.

use symbiosis_types::{AgentId, CellCoord, CladeId, GridDimensions, Stream};

/// Errors that can occur during grid operations.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// A coordinate lies outside the lattice.
    #[error("cell {coord} is outside the {dims} grid")]
    OutOfBounds {
        /// The offending coordinate.
        coord: CellCoord,
        /// The lattice extent.
        dims: GridDimensions,
    },

    /// The cell already holds its maximum number of symbionts.
    #[error("cell {coord} is at capacity ({capacity})")]
    CellAtCapacity {
        /// The full cell.
        coord: CellCoord,
        /// Maximum occupants.
        capacity: u32,
    },

    /// The cell is held by a different clade.
    #[error("cell {coord} holds clade {resident}, cannot admit clade {incoming}")]
    CladeConflict {
        /// The contested cell.
        coord: CellCoord,
        /// Clade already resident.
        resident: CladeId,
        /// Clade attempting to enter.
        incoming: CladeId,
    },

    /// The symbiont is not an occupant of the cell.
    #[error("agent {agent} is not in cell {coord}")]
    AgentNotInCell {
        /// The symbiont.
        agent: AgentId,
        /// The cell.
        coord: CellCoord,
    },

    /// The symbiont is already an occupant of the cell.
    #[error("agent {agent} is already in cell {coord}")]
    AgentAlreadyInCell {
        /// The symbiont.
        agent: AgentId,
        /// The cell.
        coord: CellCoord,
    },

    /// The grid dimensions or capacity cannot form a lattice.
    #[error("invalid grid dimensions: {reason}")]
    InvalidDimensions {
        /// What is wrong with the dimensions.
        reason: String,
    },

    /// A search region is empty or extends past the lattice.
    #[error("invalid region: {reason}")]
    InvalidRegion {
        /// What is wrong with the region.
        reason: String,
    },

    /// A random draw failed.
    #[error("stream error: {source}")]
    Stream {
        /// The underlying stream error.
        #[from]
        source: StreamError,
    },
}

/// Errors raised by the random stream service.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// A distribution parameter is out of its domain.
    #[error("invalid {distribution} parameters: {reason}")]
    InvalidParameter {
        /// Name of the distribution.
        distribution: &'static str,
        /// What is wrong with the parameters.
        reason: String,
    },

    /// An integer range with `low > high`.
    #[error("empty integer range [{low}, {high}]")]
    EmptyRange {
        /// Lower bound (inclusive).
        low: usize,
        /// Upper bound (inclusive).
        high: usize,
    },

    /// A rejection sampler gave up without an acceptable draw.
    #[error("no acceptable draw on stream {stream:?} after {attempts} attempts")]
    RejectionLimit {
        /// The stream being sampled.
        stream: Stream,
        /// Number of draws made.
        attempts: u32,
    },

    /// No generator exists for the stream.
    #[error("no generator for stream {0:?}")]
    MissingStream(Stream),
}
