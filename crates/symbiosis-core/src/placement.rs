//! Initial seeding of the sponge.
//!
//! Initial symbionts are assigned to clades in blocks by the cumulative
//! clade proportions, then placed by one of four strategies:
//!
//! - `randomize` -- anywhere with room
//! - `horizontal` -- each clade in its own band of rows
//! - `vertical` -- each clade in its own band of columns
//! - `quadrant` -- two clades on opposite diagonals, each clade switching
//!   quadrant halfway through its block

use symbiosis_types::{AgentId, CladeId, GridDimensions, Placement};
use symbiosis_world::Region;
use tracing::info;

use crate::simulation::{Simulation, SimulationError};

/// `fraction` of `extent`, truncated, as a cell index bound.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn scaled(extent: u32, fraction: f64) -> u32 {
    let bound = (f64::from(extent) * fraction).floor();
    if bound <= 0.0 {
        0
    } else {
        (bound as u32).min(extent)
    }
}

/// Quadrant for a clade. The first half of a clade's block lands in the
/// lower quadrant of its diagonal, the rest in the upper one.
fn quadrant(dims: GridDimensions, clade: CladeId, upper: bool) -> Region {
    let mid_row = scaled(dims.rows, 0.5);
    let mid_col = scaled(dims.cols, 0.5);
    let rows = if upper { 0..mid_row } else { mid_row..dims.rows };
    let left = 0..mid_col;
    let right = mid_col..dims.cols;
    let cols = match (clade.index() == 0, upper) {
        (true, true) | (false, false) => left,
        (true, false) | (false, true) => right,
    };
    Region {
        levels: 0..dims.levels,
        rows,
        cols,
    }
}

/// Tracks which clade the next initial symbiont belongs to.
struct CladeBlocks {
    cumulative: Vec<f64>,
    proportions: Vec<f64>,
    total: u32,
    which: usize,
    previous: f64,
    placed_in_block: u32,
    block_size: u32,
}

impl CladeBlocks {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn block_size(proportion: f64, total: u32) -> u32 {
        (proportion * f64::from(total)).floor().max(0.0) as u32
    }

    fn new(cumulative: Vec<f64>, proportions: Vec<f64>, total: u32) -> Self {
        let block_size = Self::block_size(proportions.first().copied().unwrap_or(1.0), total);
        Self {
            cumulative,
            proportions,
            total,
            which: 0,
            previous: 0.0,
            placed_in_block: 0,
            block_size,
        }
    }

    fn current_bound(&self) -> f64 {
        self.cumulative.get(self.which).copied().unwrap_or(1.0)
    }

    /// Advance to symbiont number `n`, moving past every block that `n`
    /// has outgrown or that holds no symbionts at all. The last clade takes
    /// whatever remains.
    fn advance(&mut self, n: u32) {
        let fraction = f64::from(n) / f64::from(self.total);
        while self.which.saturating_add(1) < self.cumulative.len() {
            let bound = self.current_bound();
            if fraction <= bound && self.block_size > 0 {
                break;
            }
            self.previous = bound;
            self.which = self.which.saturating_add(1);
            self.placed_in_block = 0;
            let proportion = self.proportions.get(self.which).copied().unwrap_or(0.0);
            self.block_size = Self::block_size(proportion, self.total);
        }
    }

    fn clade(&self) -> CladeId {
        CladeId(u32::try_from(self.which).unwrap_or(u32::MAX))
    }

    /// Whether the current block is more than half placed.
    fn past_half(&self) -> bool {
        f64::from(self.placed_in_block) > f64::from(self.block_size) / 2.0
    }
}

impl Simulation {
    /// Place `count` pool symbionts at the current time using `placement`.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Placement`] when a symbiont finds no open
    /// cell in its region; the configuration cannot seed that many.
    pub fn populate(
        &mut self,
        count: u32,
        placement: Placement,
    ) -> Result<Vec<AgentId>, SimulationError> {
        let clades = self.context.clades();
        let proportions = clades.iter().map(|(_, clade)| clade.proportion).collect();
        let mut blocks = CladeBlocks::new(clades.cumulative().to_vec(), proportions, count);
        let dims = self.grid.dimensions();

        let mut placed = Vec::with_capacity(usize::try_from(count).unwrap_or(0));
        for n in 0..count {
            blocks.advance(n);
            let clade = blocks.clade();
            let region = match placement {
                Placement::Randomize => Region::all(dims),
                Placement::Horizontal => Region {
                    levels: 0..dims.levels,
                    rows: scaled(dims.rows, blocks.previous)..scaled(dims.rows, blocks.current_bound()),
                    cols: 0..dims.cols,
                },
                Placement::Vertical => Region {
                    levels: 0..dims.levels,
                    rows: 0..dims.rows,
                    cols: scaled(dims.cols, blocks.previous)..scaled(dims.cols, blocks.current_bound()),
                },
                Placement::Quadrant => quadrant(dims, clade, blocks.past_half()),
            };

            let cell = if placement == Placement::Randomize {
                self.grid.find_open_cell_global(clade, self.context.streams_mut())?
            } else {
                self.grid
                    .find_open_cell_in_region(&region, clade, self.context.streams_mut())?
            };
            let Some(cell) = cell else {
                return Err(SimulationError::Placement {
                    reason: format!(
                        "no open cell for initial symbiont {n} of clade {clade} in rows {:?} cols {:?}",
                        region.rows, region.cols
                    ),
                });
            };

            blocks.placed_in_block = blocks.placed_in_block.saturating_add(1);
            placed.push(self.place_symbiont(clade, cell)?);
        }

        info!(
            symbionts = placed.len(),
            placement = ?placement,
            per_clade = ?self.population_by_clade(),
            "Initial population placed"
        );
        Ok(placed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn scaled_truncates_and_clamps() {
        assert_eq!(scaled(10, 0.0), 0);
        assert_eq!(scaled(10, 0.35), 3);
        assert_eq!(scaled(10, 1.0), 10);
        assert_eq!(scaled(10, 1.5), 10);
        assert_eq!(scaled(7, 0.5), 3);
    }

    #[test]
    fn quadrants_sit_on_opposite_diagonals() {
        let dims = GridDimensions::new(1, 10, 10);
        let first_lower = quadrant(dims, CladeId(0), false);
        let first_upper = quadrant(dims, CladeId(0), true);
        let second_lower = quadrant(dims, CladeId(1), false);
        let second_upper = quadrant(dims, CladeId(1), true);

        assert_eq!((first_lower.rows, first_lower.cols), (5..10, 5..10));
        assert_eq!((first_upper.rows, first_upper.cols), (0..5, 0..5));
        assert_eq!((second_lower.rows, second_lower.cols), (5..10, 0..5));
        assert_eq!((second_upper.rows, second_upper.cols), (0..5, 5..10));
    }

    #[test]
    fn blocks_follow_cumulative_proportions() {
        let mut blocks = CladeBlocks::new(vec![0.5, 1.0], vec![0.5, 0.5], 10);
        let mut clades = Vec::new();
        for n in 0..10 {
            blocks.advance(n);
            clades.push(blocks.clade().0);
        }
        // Switching happens once n/N strictly exceeds the bound.
        assert_eq!(clades, vec![0, 0, 0, 0, 0, 0, 1, 1, 1, 1]);
    }

    #[test]
    fn empty_blocks_are_skipped() {
        // 0.05 of 10 rounds to no symbionts, first or in the middle.
        let mut blocks = CladeBlocks::new(
            vec![0.05, 0.5, 0.55, 1.0],
            vec![0.05, 0.45, 0.05, 0.45],
            10,
        );
        let mut clades = Vec::new();
        for n in 0..10 {
            blocks.advance(n);
            clades.push(blocks.clade().0);
        }
        assert_eq!(clades, vec![1, 1, 1, 1, 1, 1, 3, 3, 3, 3]);
    }

    #[test]
    fn block_switch_resets_the_half_counter() {
        let mut blocks = CladeBlocks::new(vec![0.5, 1.0], vec![0.5, 0.5], 4);
        blocks.advance(0);
        blocks.placed_in_block = 3;
        assert!(blocks.past_half());
        blocks.advance(3);
        assert_eq!(blocks.clade(), CladeId(1));
        assert!(!blocks.past_half());
        assert!((blocks.previous - 0.5).abs() < 1e-12);
    }
}
