//! Host cell with bounded, single-clade occupancy.
//!
//! A [`Cell`] holds the ids of the symbionts living in it, in arrival order.
//! The first occupant fixes the cell's clade until the cell empties again.
//! The cell also caches the earliest next-event time among its occupants;
//! the simulation refreshes it whenever occupancy or a schedule changes.

use symbiosis_types::{AgentId, CellCoord, CladeId};

use crate::error::WorldError;

/// A single host cell in the sponge lattice.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    coord: CellCoord,
    demand: f64,
    capacity: u32,
    occupants: Vec<AgentId>,
    clade: Option<CladeId>,
    next_event_time: f64,
}

impl Cell {
    /// Create an empty cell with a fixed photosynthate demand per unit time.
    pub const fn new(coord: CellCoord, demand: f64, capacity: u32) -> Self {
        Self {
            coord,
            demand,
            capacity,
            occupants: Vec::new(),
            clade: None,
            next_event_time: f64::INFINITY,
        }
    }

    /// Position of this cell.
    pub const fn coord(&self) -> CellCoord {
        self.coord
    }

    /// Photosynthate the host demands per unit time, shared by all occupants.
    pub const fn demand(&self) -> f64 {
        self.demand
    }

    /// Maximum number of occupants.
    pub const fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Clade of the current occupants, `None` when empty.
    pub const fn clade(&self) -> Option<CladeId> {
        self.clade
    }

    /// Occupant ids in arrival order.
    pub fn occupants(&self) -> &[AgentId] {
        &self.occupants
    }

    /// Number of occupants.
    pub fn occupant_count(&self) -> u32 {
        u32::try_from(self.occupants.len()).unwrap_or(u32::MAX)
    }

    /// Whether no symbiont lives here.
    pub fn is_empty(&self) -> bool {
        self.occupants.is_empty()
    }

    /// Whether another occupant fits, ignoring clade.
    pub fn has_spare_capacity(&self) -> bool {
        self.occupant_count() < self.capacity
    }

    /// Whether a symbiont of `clade` may move in.
    ///
    /// True if the cell is empty, or if it has spare capacity and its
    /// occupants belong to `clade`.
    pub fn is_room_for(&self, clade: CladeId) -> bool {
        if self.is_empty() {
            return true;
        }
        self.has_spare_capacity() && self.clade == Some(clade)
    }

    /// Whether `agent` lives here.
    pub fn contains(&self, agent: AgentId) -> bool {
        self.occupants.contains(&agent)
    }

    /// Admit `agent` of `clade`.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::CellAtCapacity`] if the cell is full,
    /// [`WorldError::CladeConflict`] if another clade holds it, or
    /// [`WorldError::AgentAlreadyInCell`] on a duplicate insert.
    pub fn add_occupant(&mut self, agent: AgentId, clade: CladeId) -> Result<(), WorldError> {
        if !self.has_spare_capacity() {
            return Err(WorldError::CellAtCapacity {
                coord: self.coord,
                capacity: self.capacity,
            });
        }
        if let Some(resident) = self.clade.filter(|resident| *resident != clade) {
            return Err(WorldError::CladeConflict {
                coord: self.coord,
                resident,
                incoming: clade,
            });
        }
        if self.contains(agent) {
            return Err(WorldError::AgentAlreadyInCell {
                agent,
                coord: self.coord,
            });
        }
        self.occupants.push(agent);
        self.clade = Some(clade);
        Ok(())
    }

    /// Remove `agent`, releasing the clade claim when the cell empties.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::AgentNotInCell`] if `agent` does not live here.
    pub fn remove_occupant(&mut self, agent: AgentId) -> Result<(), WorldError> {
        let position = self
            .occupants
            .iter()
            .position(|id| *id == agent)
            .ok_or(WorldError::AgentNotInCell {
                agent,
                coord: self.coord,
            })?;
        self.occupants.remove(position);
        if self.occupants.is_empty() {
            self.clade = None;
            self.next_event_time = f64::INFINITY;
        }
        Ok(())
    }

    /// Cached earliest next-event time among occupants (`+inf` when empty).
    pub const fn next_event_time(&self) -> f64 {
        self.next_event_time
    }

    /// Store the earliest next-event time computed from the occupants.
    pub const fn set_next_event_time(&mut self, time: f64) {
        self.next_event_time = time;
    }
}
