//! Tile grid for one arena.
//!
//! The grid is a flat array of `GRID_WIDTH * GRID_HEIGHT` tile kinds,
//! row-major. Flat storage keeps snapshots trivially serializable and makes
//! 2D access a cheap index computation.

use serde::{Deserialize, Serialize};

use crate::{GRID_HEIGHT, GRID_WIDTH, TILE_SIZE};

/// What a single cell is made of.
///
/// Hard walls are immutable for the room lifetime. Soft walls may transition
/// to empty exactly once, when an explosion destroys them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileKind {
    Empty,
    HardWall,
    SoftWall,
}

impl TileKind {
    /// Wire representation: 0 = empty, 1 = hard wall, 2 = soft wall.
    pub fn code(self) -> u8 {
        match self {
            TileKind::Empty => 0,
            TileKind::HardWall => 1,
            TileKind::SoftWall => 2,
        }
    }

    pub fn from_code(code: u8) -> TileKind {
        match code {
            1 => TileKind::HardWall,
            2 => TileKind::SoftWall,
            _ => TileKind::Empty,
        }
    }
}

/// Row-major tile grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    cells: Vec<TileKind>,
}

impl Grid {
    /// An all-empty grid of the fixed arena dimensions.
    pub fn empty() -> Self {
        Self {
            cells: vec![TileKind::Empty; (GRID_WIDTH * GRID_HEIGHT) as usize],
        }
    }

    /// Rebuild a grid from the flattened wire array.
    pub fn from_flat(flat: &[u8]) -> Self {
        let mut grid = Self::empty();
        for (i, code) in flat.iter().take(grid.cells.len()).enumerate() {
            grid.cells[i] = TileKind::from_code(*code);
        }
        grid
    }

    /// Flattened wire array, length `GRID_WIDTH * GRID_HEIGHT`, values 0/1/2.
    pub fn flatten(&self) -> Vec<u8> {
        self.cells.iter().map(|t| t.code()).collect()
    }

    pub fn in_bounds(col: i32, row: i32) -> bool {
        col >= 0 && col < GRID_WIDTH && row >= 0 && row < GRID_HEIGHT
    }

    /// Tile at (col, row). Out-of-bounds reads as a hard wall so callers
    /// never index past the border.
    pub fn tile(&self, col: i32, row: i32) -> TileKind {
        if !Self::in_bounds(col, row) {
            return TileKind::HardWall;
        }
        self.cells[(row * GRID_WIDTH + col) as usize]
    }

    pub fn set_tile(&mut self, col: i32, row: i32, kind: TileKind) {
        if Self::in_bounds(col, row) {
            self.cells[(row * GRID_WIDTH + col) as usize] = kind;
        }
    }
}

/// Cell containing a pixel coordinate.
pub fn cell_of(px: f32) -> i32 {
    (px / TILE_SIZE).floor() as i32
}

/// Pixel coordinate of a cell's top-left corner.
pub fn cell_origin(cell: i32) -> f32 {
    cell as f32 * TILE_SIZE
}

/// Pixel coordinate of a cell's center.
pub fn cell_center(cell: i32) -> f32 {
    cell as f32 * TILE_SIZE + TILE_SIZE / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_codes_roundtrip() {
        for kind in [TileKind::Empty, TileKind::HardWall, TileKind::SoftWall] {
            assert_eq!(TileKind::from_code(kind.code()), kind);
        }
    }

    #[test]
    fn out_of_bounds_reads_hard() {
        let grid = Grid::empty();
        assert_eq!(grid.tile(-1, 0), TileKind::HardWall);
        assert_eq!(grid.tile(GRID_WIDTH, 0), TileKind::HardWall);
        assert_eq!(grid.tile(0, GRID_HEIGHT), TileKind::HardWall);
    }

    #[test]
    fn flatten_roundtrip() {
        let mut grid = Grid::empty();
        grid.set_tile(3, 4, TileKind::SoftWall);
        grid.set_tile(0, 0, TileKind::HardWall);
        let rebuilt = Grid::from_flat(&grid.flatten());
        assert_eq!(rebuilt, grid);
    }

    #[test]
    fn cell_math() {
        assert_eq!(cell_of(0.0), 0);
        assert_eq!(cell_of(47.9), 0);
        assert_eq!(cell_of(48.0), 1);
        assert_eq!(cell_center(0), 24.0);
        assert_eq!(cell_origin(2), 96.0);
    }
}
