//! Neighbor enumeration for square and hexagonal lattices.
//!
//! Neighbors are produced in a fixed order (the caller shuffles them before
//! searching) and positions outside the lattice are skipped. A cell with
//! fewer neighbors than [`max_neighbors`] sits on the boundary of the
//! modeled region.

use symbiosis_types::{CellCoord, GridDimensions, Topology};

/// Lateral `(row, col)` offsets on a square lattice.
const SQUARE_LATERAL: [(i64, i64); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// `(row, col)` offsets on an adjacent level of a square lattice, including
/// the cell directly above or below.
const SQUARE_VERTICAL: [(i64, i64); 9] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 0),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Hex offsets for even rows.
const HEX_EVEN_ROW: [(i64, i64); 6] = [(-1, -1), (-1, 0), (0, -1), (0, 1), (1, -1), (1, 0)];

/// Hex offsets for odd rows.
const HEX_ODD_ROW: [(i64, i64); 6] = [(-1, 0), (-1, 1), (0, -1), (0, 1), (1, 0), (1, 1)];

/// Structural maximum number of neighbors of an interior cell.
///
/// Square: 8 on one level, 26 with several. Hex: 6 on one level, 20 with
/// several.
pub const fn max_neighbors(topology: Topology, levels: u32) -> u32 {
    match (topology, levels > 1) {
        (Topology::Square, false) => 8,
        (Topology::Square, true) => 26,
        (Topology::Hex, false) => 6,
        (Topology::Hex, true) => 20,
    }
}

/// Shift `origin` by `(dl, dr, dc)`, returning `None` outside the lattice.
fn offset(dims: GridDimensions, origin: CellCoord, dl: i64, dr: i64, dc: i64) -> Option<CellCoord> {
    let level = u32::try_from(i64::from(origin.level).checked_add(dl)?).ok()?;
    let row = u32::try_from(i64::from(origin.row).checked_add(dr)?).ok()?;
    let col = u32::try_from(i64::from(origin.col).checked_add(dc)?).ok()?;
    let coord = CellCoord::new(level, row, col);
    dims.contains(coord).then_some(coord)
}

/// Neighbors of `origin` in enumeration order.
pub fn neighbors(dims: GridDimensions, topology: Topology, origin: CellCoord) -> Vec<CellCoord> {
    match topology {
        Topology::Square => square_neighbors(dims, origin),
        Topology::Hex => hex_neighbors(dims, origin),
    }
}

fn adjacent_levels(dims: GridDimensions, origin: CellCoord) -> Vec<i64> {
    let mut levels = Vec::with_capacity(2);
    if dims.levels > 1 {
        if origin.level.saturating_add(1) < dims.levels {
            levels.push(1);
        }
        if origin.level > 0 {
            levels.push(-1);
        }
    }
    levels
}

fn square_neighbors(dims: GridDimensions, origin: CellCoord) -> Vec<CellCoord> {
    let mut found: Vec<CellCoord> = SQUARE_LATERAL
        .iter()
        .filter_map(|&(dr, dc)| offset(dims, origin, 0, dr, dc))
        .collect();
    for dl in adjacent_levels(dims, origin) {
        found.extend(
            SQUARE_VERTICAL
                .iter()
                .filter_map(|&(dr, dc)| offset(dims, origin, dl, dr, dc)),
        );
    }
    found
}

fn hex_neighbors(dims: GridDimensions, origin: CellCoord) -> Vec<CellCoord> {
    let table = if origin.row % 2 == 0 {
        &HEX_EVEN_ROW
    } else {
        &HEX_ODD_ROW
    };
    let mut found: Vec<CellCoord> = table
        .iter()
        .filter_map(|&(dr, dc)| offset(dims, origin, 0, dr, dc))
        .collect();
    for dl in adjacent_levels(dims, origin) {
        found.extend(
            table
                .iter()
                .filter_map(|&(dr, dc)| offset(dims, origin, dl, dr, dc)),
        );
        found.extend(offset(dims, origin, dl, 0, 0));
    }
    found
}
