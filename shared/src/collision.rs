//! Collision kernel shared by server simulation and client prediction.
//!
//! Both sides move entities through [`predict_move`], so predicted geometry
//! is bit-identical to the authoritative result for the same inputs. The
//! kernel tests the four corners of a 36 px hitbox (shrunk by a 0.1 px
//! epsilon) against the tile grid and the live bomb set.
//!
//! Corner sliding: when a move along one axis is blocked but the entity is
//! almost aligned with an open corridor (within [`CORNER_TOLERANCE`] of the
//! tile center on the orthogonal axis), the entity is nudged perpendicular
//! toward that center instead. Single-axis input therefore still rounds
//! corners.

use crate::entity::Bomb;
use crate::grid::{cell_of, Grid, TileKind};
use crate::{COLLISION_EPSILON, CORNER_TOLERANCE, ENTITY_SIZE, TILE_SIZE};

/// Collision options for one mover.
#[derive(Debug, Clone, Copy, Default)]
pub struct MoveOpts {
    /// GHOST mode: soft walls do not block.
    pub pass_soft_walls: bool,
    /// GHOST mode: bombs do not block.
    pub pass_bombs: bool,
    /// The mover's current position. Bombs whose body already overlaps the
    /// hitbox at this position never block, so an entity standing on a
    /// freshly placed bomb can still walk off its cell.
    pub origin: Option<(f32, f32)>,
}

impl MoveOpts {
    /// No pass flags, no walk-off. What enemies and sliding bombs use.
    pub fn solid() -> Self {
        Self::default()
    }

    /// Options for a player at `(x, y)` with the given ghost state.
    pub fn for_player(ghosting: bool, x: f32, y: f32) -> Self {
        Self {
            pass_soft_walls: ghosting,
            pass_bombs: ghosting,
            origin: Some((x, y)),
        }
    }
}

fn hitbox_overlaps_tile(x: f32, y: f32, tile_x: f32, tile_y: f32) -> bool {
    let e = COLLISION_EPSILON;
    !(x + ENTITY_SIZE - e <= tile_x
        || tile_x + TILE_SIZE <= x + e
        || y + ENTITY_SIZE - e <= tile_y
        || tile_y + TILE_SIZE <= y + e)
}

/// Is a hitbox at `(x, y)` blocked by the grid or a bomb?
pub fn blocked(grid: &Grid, bombs: &[Bomb], x: f32, y: f32, opts: &MoveOpts) -> bool {
    let e = COLLISION_EPSILON;
    let corners = [
        (x + e, y + e),
        (x + ENTITY_SIZE - e, y + e),
        (x + e, y + ENTITY_SIZE - e),
        (x + ENTITY_SIZE - e, y + ENTITY_SIZE - e),
    ];

    for (cx, cy) in corners {
        match grid.tile(cell_of(cx), cell_of(cy)) {
            TileKind::HardWall => return true,
            TileKind::SoftWall if !opts.pass_soft_walls => return true,
            _ => {}
        }
    }

    if !opts.pass_bombs {
        for bomb in bombs {
            if !hitbox_overlaps_tile(x, y, bomb.x, bomb.y) {
                continue;
            }
            // Walk-off: a bomb the mover already stands on does not block.
            if let Some((ox, oy)) = opts.origin {
                if hitbox_overlaps_tile(ox, oy, bomb.x, bomb.y) {
                    continue;
                }
            }
            return true;
        }
    }

    false
}

/// Signed distance from a hitbox-center coordinate to the nearest tile
/// center along one axis.
fn center_offset(center: f32) -> f32 {
    let cell = (center / TILE_SIZE).floor();
    center - (cell * TILE_SIZE + TILE_SIZE / 2.0)
}

/// Move a hitbox by one tick worth of input.
///
/// `dx`/`dy` are the input direction (-1, 0, or 1 per axis); `step` is the
/// distance to cover this tick (speed already scaled by the time factor).
/// X-axis motion is applied first, then Y, each falling back to a
/// corner-slide nudge when blocked. Returns the new top-left position.
pub fn predict_move(
    grid: &Grid,
    bombs: &[Bomb],
    x: f32,
    y: f32,
    dx: f32,
    dy: f32,
    step: f32,
    opts: &MoveOpts,
) -> (f32, f32) {
    let mut x = x;
    let mut y = y;

    if dx != 0.0 {
        let tx = x + dx.signum() * step;
        if !blocked(grid, bombs, tx, y, opts) {
            x = tx;
        } else {
            let off = center_offset(y + ENTITY_SIZE / 2.0);
            if off != 0.0 && off.abs() <= CORNER_TOLERANCE {
                let ty = y - off.signum() * off.abs().min(step);
                if !blocked(grid, bombs, x, ty, opts) {
                    y = ty;
                }
            }
        }
    }

    if dy != 0.0 {
        let ty = y + dy.signum() * step;
        if !blocked(grid, bombs, x, ty, opts) {
            y = ty;
        } else {
            let off = center_offset(x + ENTITY_SIZE / 2.0);
            if off != 0.0 && off.abs() <= CORNER_TOLERANCE {
                let tx = x - off.signum() * off.abs().min(step);
                if !blocked(grid, bombs, tx, y, opts) {
                    x = tx;
                }
            }
        }
    }

    (x, y)
}

/// Top-left position that centers a hitbox on the given cell.
pub fn aligned_pos(col: i32, row: i32) -> (f32, f32) {
    let pad = (TILE_SIZE - ENTITY_SIZE) / 2.0;
    (
        col as f32 * TILE_SIZE + pad,
        row as f32 * TILE_SIZE + pad,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Bomb;
    use crate::grid::cell_origin;

    fn bomb_at(col: i32, row: i32) -> Bomb {
        Bomb {
            id: 1,
            owner_id: 1,
            grid_x: col,
            grid_y: row,
            x: cell_origin(col),
            y: cell_origin(row),
            vx: 0.0,
            vy: 0.0,
            range: 1,
            timer: 3000.0,
        }
    }

    #[test]
    fn open_floor_is_not_blocked() {
        let grid = Grid::empty();
        let (x, y) = aligned_pos(1, 1);
        assert!(!blocked(&grid, &[], x, y, &MoveOpts::solid()));
    }

    #[test]
    fn hard_wall_blocks() {
        let mut grid = Grid::empty();
        grid.set_tile(2, 1, TileKind::HardWall);
        let (x, y) = aligned_pos(1, 1);
        let target = x + TILE_SIZE;
        assert!(blocked(&grid, &[], target, y, &MoveOpts::solid()));
    }

    #[test]
    fn ghost_passes_soft_walls_and_bombs() {
        let mut grid = Grid::empty();
        grid.set_tile(2, 1, TileKind::SoftWall);
        let bombs = [bomb_at(1, 2)];
        let (x, y) = aligned_pos(2, 1);
        let opts = MoveOpts {
            pass_soft_walls: true,
            pass_bombs: true,
            origin: None,
        };
        assert!(!blocked(&grid, &bombs, x, y, &opts));
        let (bx, by) = aligned_pos(1, 2);
        assert!(!blocked(&grid, &bombs, bx, by, &opts));
        assert!(blocked(&grid, &bombs, bx, by, &MoveOpts::solid()));
    }

    #[test]
    fn bomb_walk_off_allows_exit_but_not_reentry() {
        let grid = Grid::empty();
        let bombs = [bomb_at(1, 1)];
        let (x, y) = aligned_pos(1, 1);

        // Standing on the bomb cell: moving away is allowed.
        let opts = MoveOpts::for_player(false, x, y);
        let (nx, _) = predict_move(&grid, &bombs, x, y, 1.0, 0.0, 3.0, &opts);
        assert!(nx > x);

        // Standing one cell east: the player may press up against the bomb
        // but never overlap its cell.
        let (mut ox, oy) = aligned_pos(2, 1);
        for _ in 0..10 {
            let opts = MoveOpts::for_player(false, ox, oy);
            let (nx, _) = predict_move(&grid, &bombs, ox, oy, -1.0, 0.0, 3.0, &opts);
            ox = nx;
        }
        assert_eq!(ox, TILE_SIZE * 2.0);
    }

    #[test]
    fn corner_slide_nudges_into_corridor() {
        // Corridor through (2, 1); hard walls above and below it.
        let mut grid = Grid::empty();
        grid.set_tile(2, 0, TileKind::HardWall);
        grid.set_tile(2, 2, TileKind::HardWall);

        // Pressed against the wall column, 8 px below the corridor center.
        let (ax, ay) = aligned_pos(1, 1);
        let mut x = ax + 6.0;
        let mut y = ay + 8.0;
        let opts = MoveOpts::solid();

        let before_y = y;
        let (_, first_y) = predict_move(&grid, &[], x, y, 1.0, 0.0, 3.0, &opts);
        // The very first blocked tick already nudges toward the corridor.
        assert!(first_y < before_y);

        for _ in 0..40 {
            let (nx, ny) = predict_move(&grid, &[], x, y, 1.0, 0.0, 3.0, &opts);
            x = nx;
            y = ny;
        }
        // Nudged far enough to fit through the gap and keep moving east.
        assert!(y < before_y && y >= ay);
        assert!(x > cell_origin(2));
    }

    #[test]
    fn misalignment_beyond_tolerance_stays_blocked() {
        let mut grid = Grid::empty();
        grid.set_tile(2, 0, TileKind::HardWall);
        grid.set_tile(2, 2, TileKind::HardWall);

        let (ax, ay) = aligned_pos(1, 1);
        // 13 px off: outside CORNER_TOLERANCE, and far enough down that the
        // hitbox overlaps row 2 at the wall column.
        let mut x = ax;
        let mut y = ay + CORNER_TOLERANCE + 1.0;
        for _ in 0..40 {
            let (nx, ny) = predict_move(&grid, &[], x, y, 1.0, 0.0, 3.0, &MoveOpts::solid());
            x = nx;
            y = ny;
        }
        assert_eq!(y, ay + CORNER_TOLERANCE + 1.0);
        assert!(x < cell_origin(2));
    }
}
