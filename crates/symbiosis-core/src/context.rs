//! Per-run bookkeeping shared by every handler.
//!
//! One [`SimulationContext`] exists per run. It hands out agent ids, owns the
//! clade table, and owns the random streams, so two runs in the same process
//! never share state.

use symbiosis_agents::{AgentError, CladeConfig, CladeTable};
use symbiosis_types::{AgentId, CladeId};
use symbiosis_world::RandomStreams;

/// Id counter, clades, and random streams of one run.
#[derive(Debug, Clone)]
pub struct SimulationContext {
    next_agent: Option<AgentId>,
    clades: CladeTable,
    streams: RandomStreams,
}

impl SimulationContext {
    /// Create a context seeded with `seed`. Agent ids start at 1.
    pub fn new(clades: CladeTable, seed: u64) -> Self {
        Self {
            next_agent: Some(AgentId(1)),
            clades,
            streams: RandomStreams::new(seed),
        }
    }

    /// Take the next agent id, or `None` once the id space is exhausted.
    pub const fn allocate_agent_id(&mut self) -> Option<AgentId> {
        let id = self.next_agent;
        if let Some(current) = id {
            self.next_agent = current.next();
        }
        id
    }

    /// The clade table.
    pub const fn clades(&self) -> &CladeTable {
        &self.clades
    }

    /// Parameters of one clade.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::UnknownClade`] for an id past the table.
    pub fn clade(&self, id: CladeId) -> Result<&CladeConfig, AgentError> {
        self.clades.get(id)
    }

    /// The random streams.
    pub const fn streams_mut(&mut self) -> &mut RandomStreams {
        &mut self.streams
    }

    /// Borrow one clade's parameters and the streams at the same time.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::UnknownClade`] for an id past the table.
    pub fn clade_and_streams(
        &mut self,
        id: CladeId,
    ) -> Result<(&CladeConfig, &mut RandomStreams), AgentError> {
        let clade = self.clades.get(id)?;
        Ok((clade, &mut self.streams))
    }
}
