//! Arena generation.
//!
//! The layout is the classic fixed frame: a hard-wall border, hard walls on
//! every cell where both coordinates are even, and random soft walls in the
//! remaining interior at the level's density. The two 3×3 spawn corners stay
//! clear so freshly spawned players always have room to move.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::Rng;

use bubble_shared::collision::aligned_pos;
use bubble_shared::{Grid, ItemKind, TileKind, GRID_HEIGHT, GRID_WIDTH};

/// Chance (percent) that a soft wall hides an item.
const ITEM_CHANCE_PCT: u32 = 30;

/// Top-left cells of the two spawn corners.
const SPAWN_CORNERS: [(i32, i32); 2] = [(1, 1), (GRID_WIDTH - 4, GRID_HEIGHT - 4)];

fn in_spawn_zone(col: i32, row: i32) -> bool {
    SPAWN_CORNERS.iter().any(|&(cx, cy)| {
        col >= cx && col < cx + 3 && row >= cy && row < cy + 3
    })
}

/// Build a fresh grid and seed the items hidden under its soft walls.
pub fn generate(rng: &mut StdRng, wall_density: f32) -> (Grid, HashMap<(i32, i32), ItemKind>) {
    let mut grid = Grid::empty();
    let mut hidden = HashMap::new();

    for row in 0..GRID_HEIGHT {
        for col in 0..GRID_WIDTH {
            let border =
                col == 0 || row == 0 || col == GRID_WIDTH - 1 || row == GRID_HEIGHT - 1;
            if border || (col % 2 == 0 && row % 2 == 0) {
                grid.set_tile(col, row, TileKind::HardWall);
                continue;
            }
            if in_spawn_zone(col, row) {
                continue;
            }
            if rng.gen::<f32>() < wall_density {
                grid.set_tile(col, row, TileKind::SoftWall);
                if rng.gen_range(0..100) < ITEM_CHANCE_PCT {
                    hidden.insert((col, row), roll_item(rng));
                }
            }
        }
    }

    (grid, hidden)
}

fn roll_item(rng: &mut StdRng) -> ItemKind {
    match rng.gen_range(0..100) {
        0..=21 => ItemKind::RangeUp,
        22..=43 => ItemKind::BombUp,
        44..=63 => ItemKind::SpeedUp,
        64..=77 => ItemKind::Kick,
        78..=87 => ItemKind::Ghost,
        _ => ItemKind::Shield,
    }
}

/// Pixel position for a player slot: slot 1 top-left, slot 2 bottom-right.
pub fn spawn_position(player_id: u8) -> (f32, f32) {
    if player_id == 1 {
        aligned_pos(1, 1)
    } else {
        aligned_pos(GRID_WIDTH - 2, GRID_HEIGHT - 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn frame_and_checkerboard_are_hard() {
        let mut rng = StdRng::seed_from_u64(7);
        let (grid, _) = generate(&mut rng, 0.9);
        for col in 0..GRID_WIDTH {
            assert_eq!(grid.tile(col, 0), TileKind::HardWall);
            assert_eq!(grid.tile(col, GRID_HEIGHT - 1), TileKind::HardWall);
        }
        for row in 0..GRID_HEIGHT {
            assert_eq!(grid.tile(0, row), TileKind::HardWall);
            assert_eq!(grid.tile(GRID_WIDTH - 1, row), TileKind::HardWall);
        }
        assert_eq!(grid.tile(2, 2), TileKind::HardWall);
        assert_eq!(grid.tile(6, 4), TileKind::HardWall);
    }

    #[test]
    fn spawn_zones_stay_clear() {
        let mut rng = StdRng::seed_from_u64(11);
        let (grid, _) = generate(&mut rng, 1.0);
        for &(cx, cy) in &SPAWN_CORNERS {
            for row in cy..cy + 3 {
                for col in cx..cx + 3 {
                    assert_ne!(grid.tile(col, row), TileKind::SoftWall);
                }
            }
        }
        // Density 1.0 fills every other interior odd cell.
        assert_eq!(grid.tile(7, 5), TileKind::SoftWall);
    }

    #[test]
    fn items_only_under_soft_walls() {
        let mut rng = StdRng::seed_from_u64(3);
        let (grid, hidden) = generate(&mut rng, 0.6);
        assert!(!hidden.is_empty());
        for (&(col, row), _) in &hidden {
            assert_eq!(grid.tile(col, row), TileKind::SoftWall);
        }
    }

    #[test]
    fn generation_is_seed_deterministic() {
        let mut a = StdRng::seed_from_u64(99);
        let mut b = StdRng::seed_from_u64(99);
        let (grid_a, items_a) = generate(&mut a, 0.5);
        let (grid_b, items_b) = generate(&mut b, 0.5);
        assert_eq!(grid_a, grid_b);
        assert_eq!(items_a, items_b);
    }
}
