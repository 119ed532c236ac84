//! Core value structs shared across the workspace.
//!
//! Grid coordinates and dimensions, plus the two telemetry records a run
//! emits: one [`ExitRecord`] per symbiont and one [`PopulationSample`] per
//! simulated day.

use serde::{Deserialize, Serialize};

use crate::enums::{EventKind, ExitStatus, HowArrived};
use crate::ids::{AgentId, CladeId};

// ---------------------------------------------------------------------------
// Grid geometry
// ---------------------------------------------------------------------------

/// Position of a host cell: level, row, column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellCoord {
    /// Level index, `0` is the bottom level.
    pub level: u32,
    /// Row index; production falls off with increasing row.
    pub row: u32,
    /// Column index.
    pub col: u32,
}

impl CellCoord {
    /// Build a coordinate.
    pub const fn new(level: u32, row: u32, col: u32) -> Self {
        Self { level, row, col }
    }
}

impl core::fmt::Display for CellCoord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({},{},{})", self.level, self.row, self.col)
    }
}

/// Extent of the sponge lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridDimensions {
    /// Number of stacked levels.
    pub levels: u32,
    /// Rows per level.
    pub rows: u32,
    /// Columns per row.
    pub cols: u32,
}

impl GridDimensions {
    /// Build a dimensions value.
    pub const fn new(levels: u32, rows: u32, cols: u32) -> Self {
        Self { levels, rows, cols }
    }

    /// Whether `coord` lies inside the lattice.
    pub const fn contains(&self, coord: CellCoord) -> bool {
        coord.level < self.levels && coord.row < self.rows && coord.col < self.cols
    }

    /// Total number of cells, or `None` on overflow.
    pub fn cell_count(&self) -> Option<usize> {
        let levels = usize::try_from(self.levels).ok()?;
        let rows = usize::try_from(self.rows).ok()?;
        let cols = usize::try_from(self.cols).ok()?;
        levels.checked_mul(rows)?.checked_mul(cols)
    }

    /// Row-major flat index of `coord` (level, then row, then column).
    pub fn flat_index(&self, coord: CellCoord) -> Option<usize> {
        if !self.contains(coord) {
            return None;
        }
        let rows = usize::try_from(self.rows).ok()?;
        let cols = usize::try_from(self.cols).ok()?;
        let level = usize::try_from(coord.level).ok()?;
        let row = usize::try_from(coord.row).ok()?;
        let col = usize::try_from(coord.col).ok()?;
        level
            .checked_mul(rows)?
            .checked_add(row)?
            .checked_mul(cols)?
            .checked_add(col)
    }

    /// Coordinates of every cell, in flat-index order.
    pub fn coords(&self) -> impl Iterator<Item = CellCoord> + '_ {
        (0..self.levels).flat_map(move |level| {
            (0..self.rows)
                .flat_map(move |row| (0..self.cols).map(move |col| CellCoord::new(level, row, col)))
        })
    }
}

impl core::fmt::Display for GridDimensions {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}x{}x{}", self.levels, self.rows, self.cols)
    }
}

// ---------------------------------------------------------------------------
// Telemetry
// ---------------------------------------------------------------------------

/// Everything recorded about a symbiont when it leaves the sponge, or when
/// the run ends while it is still resident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitRecord {
    /// The symbiont.
    pub id: AgentId,
    /// Pool arrival or division.
    pub how_arrived: HowArrived,
    /// Parent symbiont, for division children.
    pub parent: Option<AgentId>,
    /// Root pool arrival of this lineage.
    pub agent_zero: AgentId,
    /// Clade of the symbiont.
    pub clade: CladeId,
    /// Mitotic cost rate at exit.
    pub mitotic_cost_rate: f64,
    /// Production rate at exit.
    pub production_rate: f64,
    /// Time the symbiont entered the sponge.
    pub arrival_time: f64,
    /// Time the symbiont left (the horizon for still-resident symbionts).
    pub exit_time: f64,
    /// Why the symbiont left.
    pub exit_status: ExitStatus,
    /// Time of the last event the symbiont handled.
    pub last_event_time: f64,
    /// Kind of the last event the symbiont handled.
    pub last_event_kind: EventKind,
    /// `exit_time - arrival_time`.
    pub residence_time: f64,
    /// Photosynthate bank on arrival.
    pub bank_on_arrival: f64,
    /// Photosynthate bank on exit.
    pub bank_on_exit: f64,
    /// Number of divisions this symbiont went through as parent.
    pub divisions: u32,
    /// Pending escape time, if one was scheduled.
    pub escape_time: Option<f64>,
    /// Pending digestion time, if one was scheduled.
    pub digestion_time: Option<f64>,
    /// Scheduled denouement time, if any.
    pub denouement_time: Option<f64>,
    /// Whether the record was written at the horizon.
    pub still_in_residence: bool,
    /// Cells the symbiont occupied, in order.
    pub cells: Vec<CellCoord>,
    /// Time of each cell visit.
    pub visit_times: Vec<f64>,
    /// Demand of each visited cell.
    pub cell_demands: Vec<f64>,
    /// Drawn growth phase lengths.
    pub g0_durations: Vec<f64>,
    /// Drawn division phase lengths.
    pub g1sg2m_durations: Vec<f64>,
}

/// Population census for one simulated day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationSample {
    /// Whole day number, starting at `0`.
    pub day: u64,
    /// Total resident symbionts.
    pub total: u32,
    /// Resident symbionts per clade, indexed by [`CladeId::index`].
    pub per_clade: Vec<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_index_is_row_major() {
        let dims = GridDimensions::new(2, 3, 4);
        assert_eq!(dims.cell_count(), Some(24));
        assert_eq!(dims.flat_index(CellCoord::new(0, 0, 0)), Some(0));
        assert_eq!(dims.flat_index(CellCoord::new(0, 1, 0)), Some(4));
        assert_eq!(dims.flat_index(CellCoord::new(1, 0, 0)), Some(12));
        assert_eq!(dims.flat_index(CellCoord::new(1, 2, 3)), Some(23));
        assert_eq!(dims.flat_index(CellCoord::new(2, 0, 0)), None);
    }

    #[test]
    fn coords_follow_flat_order() {
        let dims = GridDimensions::new(2, 2, 2);
        for (i, coord) in dims.coords().enumerate() {
            assert_eq!(dims.flat_index(coord), Some(i));
        }
    }

    #[test]
    fn coord_display() {
        assert_eq!(CellCoord::new(0, 4, 7).to_string(), "(0,4,7)");
    }
}
