//! The sponge: a 3D lattice of host cells.
//!
//! [`Grid`] owns every [`Cell`] in row-major order and answers the three
//! placement questions the simulation asks:
//!
//! - where can a dividing symbiont's offspring go? ([`Grid::find_open_cell_near`])
//! - where can a pool arrival settle? ([`Grid::find_open_cell_global`])
//! - where can an initial symbiont settle inside a band or quadrant?
//!   ([`Grid::find_open_cell_in_region`])

use std::ops::Range;

use symbiosis_types::{AgentId, CellCoord, CladeId, GridDimensions, Stream, Topology};
use tracing::debug;

use crate::cell::Cell;
use crate::error::WorldError;
use crate::streams::RandomStreams;
use crate::topology;

/// Result of searching for room near a dividing symbiont.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vacancy {
    /// A cell with room: the origin itself or one of its neighbors.
    Cell(CellCoord),
    /// The open cell lies past the boundary of the modeled region.
    OutsideGrid,
    /// Neither the origin nor any neighbor has room.
    Unavailable,
}

/// Box of cells with inclusive lower and exclusive upper bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    /// Levels covered.
    pub levels: Range<u32>,
    /// Rows covered.
    pub rows: Range<u32>,
    /// Columns covered.
    pub cols: Range<u32>,
}

impl Region {
    /// The whole lattice.
    pub const fn all(dims: GridDimensions) -> Self {
        Self {
            levels: 0..dims.levels,
            rows: 0..dims.rows,
            cols: 0..dims.cols,
        }
    }

    fn coords(&self) -> impl Iterator<Item = CellCoord> + '_ {
        self.levels.clone().flat_map(move |level| {
            self.rows.clone().flat_map(move |row| {
                self.cols
                    .clone()
                    .map(move |col| CellCoord::new(level, row, col))
            })
        })
    }
}

/// The host cell lattice.
#[derive(Debug, Clone)]
pub struct Grid {
    dims: GridDimensions,
    topology: Topology,
    capacity: u32,
    cells: Vec<Cell>,
}

impl Grid {
    /// Build a lattice whose cell demands are drawn by fuzzing
    /// `host_cell_demand` on [`Stream::HostCellDemand`], in row-major order.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidDimensions`] for an empty lattice or zero
    /// capacity, or a stream error if a demand cannot be drawn.
    pub fn new(
        dims: GridDimensions,
        topology: Topology,
        capacity: u32,
        host_cell_demand: f64,
        demand_fuzz: f64,
        streams: &mut RandomStreams,
    ) -> Result<Self, WorldError> {
        let count = Self::check_dimensions(dims, capacity)?;
        let mut cells = Vec::with_capacity(count);
        for coord in dims.coords() {
            let demand = streams.fuzz(host_cell_demand, demand_fuzz, Stream::HostCellDemand)?;
            cells.push(Cell::new(coord, demand, capacity));
        }
        debug!(%dims, ?topology, capacity, cells = cells.len(), "Sponge grid created");
        Ok(Self {
            dims,
            topology,
            capacity,
            cells,
        })
    }

    /// Build a lattice where every cell has the same demand.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidDimensions`] for an empty lattice or zero
    /// capacity.
    pub fn uniform(
        dims: GridDimensions,
        topology: Topology,
        capacity: u32,
        demand: f64,
    ) -> Result<Self, WorldError> {
        Self::check_dimensions(dims, capacity)?;
        let cells = dims
            .coords()
            .map(|coord| Cell::new(coord, demand, capacity))
            .collect();
        Ok(Self {
            dims,
            topology,
            capacity,
            cells,
        })
    }

    fn check_dimensions(dims: GridDimensions, capacity: u32) -> Result<usize, WorldError> {
        if dims.levels == 0 || dims.rows == 0 || dims.cols == 0 {
            return Err(WorldError::InvalidDimensions {
                reason: format!("{dims} has an empty axis"),
            });
        }
        if capacity == 0 {
            return Err(WorldError::InvalidDimensions {
                reason: "cell capacity must be at least 1".to_owned(),
            });
        }
        dims.cell_count().ok_or_else(|| WorldError::InvalidDimensions {
            reason: format!("{dims} overflows the cell count"),
        })
    }

    /// Lattice extent.
    pub const fn dimensions(&self) -> GridDimensions {
        self.dims
    }

    /// Lattice shape.
    pub const fn topology(&self) -> Topology {
        self.topology
    }

    /// Capacity of every cell.
    pub const fn capacity_per_cell(&self) -> u32 {
        self.capacity
    }

    /// Structural maximum neighbor count for this lattice.
    pub const fn max_neighbors(&self) -> u32 {
        topology::max_neighbors(self.topology, self.dims.levels)
    }

    /// Total number of symbionts the sponge can hold.
    pub fn max_occupancy(&self) -> u32 {
        let cells = u32::try_from(self.cells.len()).unwrap_or(u32::MAX);
        cells.saturating_mul(self.capacity)
    }

    /// Number of symbionts currently resident.
    pub fn population(&self) -> u32 {
        self.cells
            .iter()
            .fold(0_u32, |total, cell| total.saturating_add(cell.occupant_count()))
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    /// Borrow the cell at `coord`.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::OutOfBounds`] if `coord` is outside the lattice.
    pub fn cell(&self, coord: CellCoord) -> Result<&Cell, WorldError> {
        self.dims
            .flat_index(coord)
            .and_then(|i| self.cells.get(i))
            .ok_or(WorldError::OutOfBounds {
                coord,
                dims: self.dims,
            })
    }

    /// Mutably borrow the cell at `coord`.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::OutOfBounds`] if `coord` is outside the lattice.
    pub fn cell_mut(&mut self, coord: CellCoord) -> Result<&mut Cell, WorldError> {
        let dims = self.dims;
        dims.flat_index(coord)
            .and_then(|i| self.cells.get_mut(i))
            .ok_or(WorldError::OutOfBounds { coord, dims })
    }

    /// Admit `agent` of `clade` into the cell at `coord`.
    ///
    /// # Errors
    ///
    /// Returns bounds, capacity, or clade errors from the cell.
    pub fn add_occupant(
        &mut self,
        coord: CellCoord,
        agent: AgentId,
        clade: CladeId,
    ) -> Result<(), WorldError> {
        self.cell_mut(coord)?.add_occupant(agent, clade)
    }

    /// Remove `agent` from the cell at `coord`.
    ///
    /// # Errors
    ///
    /// Returns bounds errors or [`WorldError::AgentNotInCell`].
    pub fn remove_occupant(&mut self, coord: CellCoord, agent: AgentId) -> Result<(), WorldError> {
        self.cell_mut(coord)?.remove_occupant(agent)
    }

    /// Neighbors of `coord` in enumeration order.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::OutOfBounds`] if `coord` is outside the lattice.
    pub fn neighbors(&self, coord: CellCoord) -> Result<Vec<CellCoord>, WorldError> {
        self.cell(coord)?;
        Ok(topology::neighbors(self.dims, self.topology, coord))
    }

    /// Find room for the offspring of a symbiont of `clade` living at `origin`.
    ///
    /// The origin wins whenever it has a free slot. Otherwise the neighbors
    /// are shuffled on [`Stream::CheckForOpenCell`] and taken from the end
    /// until one is empty or holds `clade` with a free slot. When the origin
    /// is on the boundary (fewer neighbors than [`Grid::max_neighbors`]),
    /// the found cell is kept with probability `actual / max`, drawn on
    /// [`Stream::InfectCellOutside`]; otherwise the offspring lands outside
    /// the modeled region.
    ///
    /// # Errors
    ///
    /// Returns bounds errors or stream errors.
    pub fn find_open_cell_near(
        &self,
        origin: CellCoord,
        clade: CladeId,
        streams: &mut RandomStreams,
    ) -> Result<Vacancy, WorldError> {
        if self.cell(origin)?.has_spare_capacity() {
            return Ok(Vacancy::Cell(origin));
        }

        let mut candidates = self.neighbors(origin)?;
        let neighbor_count = u32::try_from(candidates.len()).unwrap_or(u32::MAX);
        streams.shuffle(&mut candidates, Stream::CheckForOpenCell)?;

        let mut found = None;
        while let Some(coord) = candidates.pop() {
            if self.cell(coord)?.is_room_for(clade) {
                found = Some(coord);
                break;
            }
        }

        let Some(open) = found else {
            return Ok(Vacancy::Unavailable);
        };

        let max = self.max_neighbors();
        if neighbor_count < max {
            let inside = f64::from(neighbor_count) / f64::from(max);
            let u = streams.uniform(0.0, 1.0, Stream::InfectCellOutside)?;
            if u > inside {
                return Ok(Vacancy::OutsideGrid);
            }
        }
        Ok(Vacancy::Cell(open))
    }

    /// Pick a cell with room for `clade` uniformly among the whole lattice.
    ///
    /// # Errors
    ///
    /// Returns stream errors.
    pub fn find_open_cell_global(
        &self,
        clade: CladeId,
        streams: &mut RandomStreams,
    ) -> Result<Option<CellCoord>, WorldError> {
        self.find_open_cell_in_region(&Region::all(self.dims), clade, streams)
    }

    /// Pick a cell with room for `clade` uniformly within `region`, drawing
    /// on [`Stream::OpenCellOnArrival`].
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidRegion`] if the region reaches past the
    /// lattice, or stream errors.
    pub fn find_open_cell_in_region(
        &self,
        region: &Region,
        clade: CladeId,
        streams: &mut RandomStreams,
    ) -> Result<Option<CellCoord>, WorldError> {
        if region.levels.end > self.dims.levels
            || region.rows.end > self.dims.rows
            || region.cols.end > self.dims.cols
        {
            return Err(WorldError::InvalidRegion {
                reason: format!(
                    "levels {:?} rows {:?} cols {:?} exceed {}",
                    region.levels, region.rows, region.cols, self.dims
                ),
            });
        }

        let mut open = Vec::new();
        for coord in region.coords() {
            if self.cell(coord)?.is_room_for(clade) {
                open.push(coord);
            }
        }
        let Some(last) = open.len().checked_sub(1) else {
            return Ok(None);
        };
        let which = streams.randint(0, last, Stream::OpenCellOnArrival)?;
        Ok(open.get(which).copied())
    }
}
