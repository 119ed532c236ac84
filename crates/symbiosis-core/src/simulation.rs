//! Simulation state and the bookkeeping shared by every event handler.
//!
//! [`Simulation`] owns the sponge grid, the symbiont arena, the event
//! calendar, and the per-run [`SimulationContext`]. Cells hold agent ids;
//! symbionts hold their cell coordinate. Each resident symbiont has exactly
//! one live calendar event, its next milestone, mirrored in `scheduled` so
//! that a changed milestone can be found and cancelled or moved.
//!
//! Occupancy changes follow one discipline:
//!
//! 1. commit every occupant of an affected cell at the current time, using
//!    the old occupant count;
//! 2. change occupancy;
//! 3. re-project the remaining occupants with the new count and sync their
//!    calendar events;
//! 4. refresh the cell's cached next-event time.

use std::collections::{BTreeMap, BTreeSet};

use symbiosis_agents::{AgentError, CladeTable, Site, Symbiont};
use symbiosis_types::{AgentId, CellCoord, CladeId, EventKind, ExitRecord, ExitStatus, Phase, Stream};
use symbiosis_world::{Grid, StreamError, WorldError};
use tracing::debug;

use crate::calendar::{CalendarError, EventCalendar};
use crate::config::{ConfigError, SimulationConfig};
use crate::context::SimulationContext;
use crate::dispatch::{Handler, dispatch};
use crate::lifecycle::EventReport;

/// Errors that abort a run.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    /// The configuration is unusable.
    #[error("config error: {source}")]
    Config {
        /// The underlying configuration error.
        #[from]
        source: ConfigError,
    },

    /// A calendar operation failed.
    #[error("calendar error: {source}")]
    Calendar {
        /// The underlying calendar error.
        #[from]
        source: CalendarError,
    },

    /// A grid operation failed.
    #[error("world error: {source}")]
    World {
        /// The underlying grid error.
        #[from]
        source: WorldError,
    },

    /// A symbiont operation failed.
    #[error("agent error: {source}")]
    Agent {
        /// The underlying symbiont error.
        #[from]
        source: AgentError,
    },

    /// A random draw failed.
    #[error("stream error: {source}")]
    Stream {
        /// The underlying stream error.
        #[from]
        source: StreamError,
    },

    /// An event reached a symbiont in a phase that cannot handle it.
    #[error("no handler for {kind} in phase {phase:?}")]
    PhaseMismatch {
        /// Phase of the owning symbiont, `None` for unowned events.
        phase: Option<Phase>,
        /// The event kind.
        kind: EventKind,
    },

    /// An event or cell names a symbiont that is not resident.
    #[error("agent {0} is not resident")]
    UnknownAgent(AgentId),

    /// The agent id space is used up.
    #[error("agent ids exhausted")]
    IdsExhausted,

    /// Initial placement found no room for a symbiont.
    #[error("initial placement failed: {reason}")]
    Placement {
        /// What could not be placed.
        reason: String,
    },
}

/// The complete mutable state of one run.
#[derive(Debug)]
pub struct Simulation {
    pub(crate) context: SimulationContext,
    pub(crate) grid: Grid,
    pub(crate) agents: BTreeMap<AgentId, Symbiont>,
    pub(crate) calendar: EventCalendar,
    pub(crate) scheduled: BTreeMap<AgentId, (f64, EventKind)>,
    pub(crate) arrival_mean: Option<f64>,
    pub(crate) now: f64,
}

impl Simulation {
    /// Build the sponge and an empty population from `config`.
    ///
    /// Cell demands are drawn from the run's streams, so two simulations
    /// built from the same config are identical.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Agent`] for an empty clade list and
    /// [`SimulationError::World`] for an empty lattice.
    pub fn new(config: &SimulationConfig) -> Result<Self, SimulationError> {
        let clades = CladeTable::new(config.clades.clone())?;
        let mut context = SimulationContext::new(clades, config.run.seed);
        let grid = Grid::new(
            config.grid.dimensions(),
            config.grid.topology,
            config.grid.capacity_per_cell,
            config.grid.host_cell_demand,
            config.grid.host_cell_demand_fuzz,
            context.streams_mut(),
        )?;
        let arrival_mean = config
            .run
            .arrivals_enabled
            .then_some(config.run.mean_time_between_arrivals);
        Ok(Self::from_parts(context, grid, arrival_mean))
    }

    /// Assemble a simulation from a prepared grid and context.
    pub const fn from_parts(
        context: SimulationContext,
        grid: Grid,
        arrival_mean: Option<f64>,
    ) -> Self {
        Self {
            context,
            grid,
            agents: BTreeMap::new(),
            calendar: EventCalendar::new(),
            scheduled: BTreeMap::new(),
            arrival_mean,
            now: 0.0,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Current simulated time.
    pub const fn now(&self) -> f64 {
        self.now
    }

    /// The sponge.
    pub const fn grid(&self) -> &Grid {
        &self.grid
    }

    /// The event calendar.
    pub const fn calendar(&self) -> &EventCalendar {
        &self.calendar
    }

    /// Per-run context.
    pub const fn context(&self) -> &SimulationContext {
        &self.context
    }

    /// A resident symbiont.
    pub fn agent(&self, id: AgentId) -> Option<&Symbiont> {
        self.agents.get(&id)
    }

    /// All resident symbionts in id order.
    pub fn agents(&self) -> impl Iterator<Item = &Symbiont> {
        self.agents.values()
    }

    /// Number of resident symbionts.
    pub fn population(&self) -> u32 {
        u32::try_from(self.agents.len()).unwrap_or(u32::MAX)
    }

    /// Resident symbionts per clade, indexed by clade id.
    pub fn population_by_clade(&self) -> Vec<u32> {
        let mut counts = vec![0_u32; self.context.clades().len()];
        for agent in self.agents.values() {
            if let Some(count) = counts.get_mut(agent.clade().index()) {
                *count = count.saturating_add(1);
            }
        }
        counts
    }

    /// The milestone currently in the calendar for `id`.
    pub fn scheduled_event(&self, id: AgentId) -> Option<(f64, EventKind)> {
        self.scheduled.get(&id).copied()
    }

    // -----------------------------------------------------------------------
    // Driving
    // -----------------------------------------------------------------------

    /// Schedule the next pool arrival an exponential gap after the current
    /// time, if arrivals are enabled.
    ///
    /// # Errors
    ///
    /// Returns stream or calendar errors.
    pub fn schedule_arrival(&mut self) -> Result<(), SimulationError> {
        if let Some(mean) = self.arrival_mean {
            let gap = self
                .context
                .streams_mut()
                .exponential(mean, Stream::Arrivals)?;
            self.calendar.insert(self.now + gap, EventKind::Arrival, None)?;
        }
        Ok(())
    }

    /// Time of the next live event.
    pub fn next_event_time(&mut self) -> Option<f64> {
        self.calendar.peek_time()
    }

    /// Pop and handle the next event. Returns `None` once the calendar is
    /// exhausted.
    ///
    /// # Errors
    ///
    /// Any invariant violation aborts the run.
    pub fn handle_next(&mut self) -> Result<Option<EventReport>, SimulationError> {
        let Some(event) = self.calendar.pop_next() else {
            return Ok(None);
        };
        self.now = event.time;

        let phase = match event.agent {
            Some(id) => {
                self.scheduled.remove(&id);
                Some(self.resident(id)?.phase())
            }
            None => None,
        };
        debug!(
            time = event.time,
            kind = %event.kind,
            agent = ?event.agent,
            phase = ?phase,
            "Dispatching event"
        );

        let handler = dispatch(phase, event.kind)?;
        let owner = event.agent.ok_or(SimulationError::PhaseMismatch {
            phase,
            kind: event.kind,
        });
        let report = match handler {
            Handler::EndOfG0 => self.on_end_g0(owner?)?,
            Handler::Division => self.on_end_g1sg2m(owner?)?,
            Handler::Digestion => self.on_digestion(owner?)?,
            Handler::Escape => self.on_escape(owner?)?,
            Handler::Denouement => self.on_denouement(owner?)?,
            Handler::Arrival => self.on_arrival()?,
        };
        Ok(Some(report))
    }

    /// Exit records for every symbiont still resident at `time`, with banks
    /// committed to `time`.
    ///
    /// # Errors
    ///
    /// Returns commit errors.
    pub fn residents_at(&mut self, time: f64) -> Result<Vec<ExitRecord>, SimulationError> {
        let cells: BTreeSet<CellCoord> = self.agents.values().filter_map(Symbiont::cell).collect();
        for cell in cells {
            self.commit_cell(cell, time)?;
        }
        Ok(self
            .agents
            .values()
            .map(|agent| agent.exit_record(ExitStatus::StillInResidence, time))
            .collect())
    }

    // -----------------------------------------------------------------------
    // Shared bookkeeping
    // -----------------------------------------------------------------------

    pub(crate) fn resident(&self, id: AgentId) -> Result<&Symbiont, SimulationError> {
        self.agents.get(&id).ok_or(SimulationError::UnknownAgent(id))
    }

    pub(crate) fn resident_mut(&mut self, id: AgentId) -> Result<&mut Symbiont, SimulationError> {
        self.agents
            .get_mut(&id)
            .ok_or(SimulationError::UnknownAgent(id))
    }

    /// Host cell of a resident symbiont.
    pub(crate) fn host_cell(&self, id: AgentId) -> Result<CellCoord, SimulationError> {
        self.resident(id)?
            .cell()
            .ok_or(SimulationError::Agent {
                source: AgentError::NotHosted(id),
            })
    }

    /// Flip a coin on `stream` that comes up with probability `prob`.
    pub(crate) fn coin(&mut self, stream: Stream, prob: f64) -> Result<bool, SimulationError> {
        Ok(self.context.streams_mut().random(stream)? < prob)
    }

    /// Hosting details of `coord` for a symbiont constructor.
    pub(crate) fn site(&self, coord: CellCoord) -> Result<Site, SimulationError> {
        Ok(Site {
            coord,
            demand: self.grid.cell(coord)?.demand(),
            rows: self.grid.dimensions().rows,
        })
    }

    /// Commit every occupant of `coord` to `time` at the current count.
    pub(crate) fn commit_cell(&mut self, coord: CellCoord, time: f64) -> Result<(), SimulationError> {
        let cell = self.grid.cell(coord)?;
        let count = cell.occupant_count();
        for id in cell.occupants() {
            let agent = self
                .agents
                .get_mut(id)
                .ok_or(SimulationError::UnknownAgent(*id))?;
            agent.commit(time, count)?;
        }
        Ok(())
    }

    /// Re-project every occupant of `coord` not in `skip` with the current
    /// count, syncing the calendar for any whose milestone moved.
    pub(crate) fn reproject_cell(
        &mut self,
        coord: CellCoord,
        skip: &[AgentId],
    ) -> Result<(), SimulationError> {
        let cell = self.grid.cell(coord)?;
        let count = cell.occupant_count();
        let occupants = cell.occupants().to_vec();
        for id in occupants {
            if skip.contains(&id) {
                continue;
            }
            let agent = self
                .agents
                .get_mut(&id)
                .ok_or(SimulationError::UnknownAgent(id))?;
            let (clade, streams) = self.context.clade_and_streams(agent.clade())?;
            if agent.reproject(count, clade, streams)? {
                debug!(
                    agent = %id,
                    cell = %coord,
                    occupants = count,
                    next = ?agent.next_milestone(),
                    "Milestone moved after occupancy change"
                );
                self.sync_schedule(id)?;
            }
        }
        Ok(())
    }

    /// Make the calendar hold exactly `id`'s next milestone.
    ///
    /// A milestone of the same kind that moved earlier is rescheduled in
    /// place; anything else is cancelled and reinserted.
    pub(crate) fn sync_schedule(&mut self, id: AgentId) -> Result<(), SimulationError> {
        let desired = self.agents.get(&id).and_then(Symbiont::next_milestone);
        let current = self.scheduled.get(&id).copied();
        match (current, desired) {
            (None, None) => {}
            (Some((old, old_kind)), Some((new, new_kind)))
                if old_kind == new_kind && old.to_bits() == new.to_bits() => {}
            (Some((old, old_kind)), Some((new, new_kind))) if old_kind == new_kind && new < old => {
                self.calendar.reschedule(old, new, new_kind, Some(id))?;
                self.scheduled.insert(id, (new, new_kind));
            }
            (current, desired) => {
                if let Some((old, old_kind)) = current {
                    self.calendar.cancel(old, old_kind, Some(id))?;
                    self.scheduled.remove(&id);
                }
                if let Some((new, new_kind)) = desired {
                    self.calendar.insert(new, new_kind, Some(id))?;
                    self.scheduled.insert(id, (new, new_kind));
                }
            }
        }
        Ok(())
    }

    /// Cancel whatever the calendar holds for `id`.
    pub(crate) fn unschedule(&mut self, id: AgentId) -> Result<(), SimulationError> {
        if let Some((time, kind)) = self.scheduled.remove(&id) {
            self.calendar.cancel(time, kind, Some(id))?;
        }
        Ok(())
    }

    /// Recompute the cached earliest milestone of `coord`'s occupants.
    pub(crate) fn refresh_cell_cache(&mut self, coord: CellCoord) -> Result<(), SimulationError> {
        let next = self
            .grid
            .cell(coord)?
            .occupants()
            .iter()
            .filter_map(|id| self.agents.get(id))
            .filter_map(Symbiont::next_milestone)
            .map(|(time, _)| time)
            .fold(f64::INFINITY, f64::min);
        self.grid.cell_mut(coord)?.set_next_event_time(next);
        Ok(())
    }

    /// Draw the first milestones of a symbiont that just took up residence
    /// and put its next one in the calendar.
    pub(crate) fn schedule_new_resident(&mut self, id: AgentId) -> Result<(), SimulationError> {
        let now = self.now;
        let coord = self.host_cell(id)?;
        let count = self.grid.cell(coord)?.occupant_count();
        let agent = self
            .agents
            .get_mut(&id)
            .ok_or(SimulationError::UnknownAgent(id))?;
        let (clade, streams) = self.context.clade_and_streams(agent.clade())?;
        let deadline = agent.begin_residence(clade, now, streams)?;
        agent.schedule_milestone(EventKind::EndG0, deadline, count, clade, streams)?;
        self.sync_schedule(id)
    }

    /// Bring a new pool symbiont of `clade` into `coord` at the current time.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::World`] if the cell has no room for the
    /// clade, or stream and calendar errors.
    pub fn place_symbiont(
        &mut self,
        clade: CladeId,
        coord: CellCoord,
    ) -> Result<AgentId, SimulationError> {
        let now = self.now;
        let site = self.site(coord)?;
        if !self.grid.cell(coord)?.is_room_for(clade) {
            return Err(SimulationError::World {
                source: WorldError::CellAtCapacity {
                    coord,
                    capacity: self.grid.capacity_per_cell(),
                },
            });
        }
        self.commit_cell(coord, now)?;

        let id = self
            .context
            .allocate_agent_id()
            .ok_or(SimulationError::IdsExhausted)?;
        let (config, streams) = self.context.clade_and_streams(clade)?;
        let symbiont = Symbiont::from_pool(id, clade, config, site, now, streams)?;

        self.grid.add_occupant(coord, id, clade)?;
        self.agents.insert(id, symbiont);
        self.schedule_new_resident(id)?;
        self.reproject_cell(coord, &[id])?;
        self.refresh_cell_cache(coord)?;
        Ok(id)
    }
}
