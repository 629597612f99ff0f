//! Bomb lifecycle: placement, sliding kicks, fuses, chained detonation.
//!
//! Detonation walks a work queue with a visited set keyed by bomb id, so a
//! chain reaction settles within one tick and never re-enters a bomb.
//! Explosion cells are deduplicated per cell within one detonation batch;
//! overlapping crosses from chained bombs produce exactly one burning cell
//! per tile.

use std::collections::{HashSet, VecDeque};

use log::warn;

use bubble_shared::grid::{cell_of, cell_origin};
use bubble_shared::{
    Bomb, ExplosionCell, ItemDrop, LifeState, TileKind, BOMB_FUSE_MS, ENTITY_SIZE,
    EXPLOSION_TTL_MS, KICK_SPEED, TILE_SIZE,
};

use super::SimState;

/// Fuse of a boss mega-bomb, ms.
pub const BOSS_BOMB_FUSE_MS: f32 = 4000.0;
/// Blast radius of a boss mega-bomb.
pub const BOSS_BOMB_RANGE: u32 = 5;

/// Place a bomb for a player at their current cell. Every rule violation is
/// a silent reject; clients are allowed to over-send.
pub fn place_player_bomb(sim: &mut SimState, player_id: u8) {
    let Some(player) = sim.player(player_id) else {
        return;
    };
    if player.state != LifeState::Normal {
        return;
    }
    if player.active_bombs >= player.max_bombs {
        return;
    }
    let cell = player.cell();
    let range = player.bomb_range;
    if !try_place(sim, player_id, cell, range, BOMB_FUSE_MS) {
        return;
    }
    if let Some(player) = sim.player_mut(player_id) {
        player.active_bombs += 1;
    }
}

/// Place a neutral bomb (owner 0) for an enemy, if the cell is free.
pub fn place_enemy_bomb(sim: &mut SimState, cell: (i32, i32)) -> bool {
    try_place(sim, 0, cell, BOSS_BOMB_RANGE, BOSS_BOMB_FUSE_MS)
}

fn try_place(sim: &mut SimState, owner_id: u8, cell: (i32, i32), range: u32, fuse: f32) -> bool {
    if sim.grid.tile(cell.0, cell.1) != TileKind::Empty {
        return false;
    }
    if sim.bomb_at(cell) {
        return false;
    }
    let id = sim.alloc_bomb_id();
    sim.bombs.push(Bomb {
        id,
        owner_id,
        grid_x: cell.0,
        grid_y: cell.1,
        x: cell_origin(cell.0),
        y: cell_origin(cell.1),
        vx: 0.0,
        vy: 0.0,
        range,
        timer: fuse,
    });
    true
}

/// A player with the kick power-up ran into a stationary bomb: impart
/// velocity along the movement axis. A bomb already in motion is not kicked
/// again until it stops.
pub fn try_kick(sim: &mut SimState, player_id: u8, dx: f32, dy: f32) {
    let Some(player) = sim.player(player_id) else {
        return;
    };
    if !player.can_kick {
        return;
    }
    let cell = player.cell();
    let target = (cell.0 + dx.signum() as i32, cell.1 + dy.signum() as i32);
    if let Some(bomb) = sim
        .bombs
        .iter_mut()
        .find(|b| (b.grid_x, b.grid_y) == target && !b.sliding())
    {
        bomb.vx = dx.signum() * KICK_SPEED;
        bomb.vy = dy.signum() * KICK_SPEED;
    }
}

fn rects_overlap(ax: f32, ay: f32, asz: f32, bx: f32, by: f32, bsz: f32) -> bool {
    !(ax + asz <= bx || bx + bsz <= ax || ay + asz <= by || by + bsz <= ay)
}

/// Integrate sliding bombs. On contact with a wall, another bomb, a player
/// or an enemy, velocity zeroes and the bomb snaps to its current cell.
pub fn advance_slides(sim: &mut SimState, time_factor: f32) {
    for i in 0..sim.bombs.len() {
        let bomb = &sim.bombs[i];
        if !bomb.sliding() {
            continue;
        }
        let nx = bomb.x + bomb.vx * time_factor;
        let ny = bomb.y + bomb.vy * time_factor;

        // Cell the leading edge is entering.
        let lead_x = if bomb.vx > 0.0 {
            cell_of(nx + TILE_SIZE - 0.1)
        } else {
            cell_of(nx + 0.1)
        };
        let lead_y = if bomb.vy > 0.0 {
            cell_of(ny + TILE_SIZE - 0.1)
        } else {
            cell_of(ny + 0.1)
        };

        let own_cell = (sim.bombs[i].grid_x, sim.bombs[i].grid_y);
        let entering = (lead_x, lead_y) != own_cell;
        let wall_hit = entering && sim.grid.tile(lead_x, lead_y) != TileKind::Empty;
        let bomb_hit = entering
            && sim
                .bombs
                .iter()
                .enumerate()
                .any(|(j, b)| j != i && (b.grid_x, b.grid_y) == (lead_x, lead_y));
        let body_hit = sim
            .players
            .iter()
            .filter(|p| p.state != LifeState::Dead)
            .any(|p| rects_overlap(nx, ny, TILE_SIZE, p.x, p.y, ENTITY_SIZE))
            || sim
                .enemies
                .iter()
                .any(|e| rects_overlap(nx, ny, TILE_SIZE, e.x, e.y, ENTITY_SIZE));

        let bomb = &mut sim.bombs[i];
        if wall_hit || bomb_hit || body_hit {
            bomb.vx = 0.0;
            bomb.vy = 0.0;
            bomb.x = cell_origin(bomb.grid_x);
            bomb.y = cell_origin(bomb.grid_y);
        } else {
            bomb.x = nx;
            bomb.y = ny;
            bomb.grid_x = cell_of(bomb.x + TILE_SIZE / 2.0);
            bomb.grid_y = cell_of(bomb.y + TILE_SIZE / 2.0);
        }
    }
}

/// Burn fuses by raw `dt` and detonate everything that expired, including
/// chains set off by the blasts.
pub fn tick_fuses_and_detonate(sim: &mut SimState, dt: f32) {
    for bomb in &mut sim.bombs {
        bomb.timer -= dt;
    }
    let expired: Vec<u32> = sim
        .bombs
        .iter()
        .filter(|b| b.timer <= 0.0)
        .map(|b| b.id)
        .collect();
    if !expired.is_empty() {
        detonate(sim, expired);
    }
}

/// Detonate the given bombs and any bombs their rays reach.
///
/// `emitted` stays a plain vec: insertion order is the emission order, which
/// keeps explosion ids deterministic for a given seed and input history.
pub fn detonate(sim: &mut SimState, initial: Vec<u32>) {
    let mut queue: VecDeque<u32> = VecDeque::new();
    let mut visited: HashSet<u32> = HashSet::new();
    let mut emitted: Vec<((i32, i32), u8)> = Vec::new();

    fn note(emitted: &mut Vec<((i32, i32), u8)>, cell: (i32, i32), owner_id: u8) {
        if !emitted.iter().any(|(c, _)| *c == cell) {
            emitted.push((cell, owner_id));
        }
    }

    for id in initial {
        if visited.insert(id) {
            queue.push_back(id);
        }
    }

    while let Some(id) = queue.pop_front() {
        let Some(idx) = sim.bombs.iter().position(|b| b.id == id) else {
            continue;
        };
        let bomb = sim.bombs.remove(idx);

        if bomb.owner_id > 0 {
            if let Some(owner) = sim.player_mut(bomb.owner_id) {
                owner.active_bombs = owner.active_bombs.saturating_sub(1);
            }
        }

        let center = (bomb.grid_x, bomb.grid_y);
        note(&mut emitted, center, bomb.owner_id);

        for (dx, dy) in [(0, -1), (0, 1), (-1, 0), (1, 0)] {
            for dist in 1..=bomb.range as i32 {
                let cell = (center.0 + dx * dist, center.1 + dy * dist);
                match sim.grid.tile(cell.0, cell.1) {
                    TileKind::HardWall => break,
                    TileKind::SoftWall => {
                        // The wall absorbs the ray: it is destroyed and no
                        // burning cell appears on its tile.
                        sim.grid.set_tile(cell.0, cell.1, TileKind::Empty);
                        if let Some(kind) = sim.hidden_items.remove(&cell) {
                            sim.items.push(ItemDrop {
                                grid_x: cell.0,
                                grid_y: cell.1,
                                kind,
                            });
                        }
                        break;
                    }
                    TileKind::Empty => {
                        if let Some(other) =
                            sim.bombs.iter().find(|b| (b.grid_x, b.grid_y) == cell)
                        {
                            let other_id = other.id;
                            if visited.insert(other_id) {
                                queue.push_back(other_id);
                            }
                            break;
                        }
                        note(&mut emitted, cell, bomb.owner_id);
                    }
                }
            }
        }
    }

    for ((gx, gy), owner_id) in emitted {
        let id = sim.alloc_explosion_id();
        sim.explosions.push(ExplosionCell {
            id,
            owner_id,
            grid_x: gx,
            grid_y: gy,
            timer: EXPLOSION_TTL_MS,
        });
    }
}

/// Burn down explosion cells and drop the expired ones.
pub fn expire_explosions(sim: &mut SimState, dt: f32) {
    for cell in &mut sim.explosions {
        cell.timer -= dt;
    }
    sim.explosions.retain(|c| c.timer > 0.0);
}

/// One-bomb-per-cell is enforced at placement; seeing a duplicate here means
/// a bug upstream. Log it and trust the later-added bomb.
pub fn enforce_cell_uniqueness(sim: &mut SimState) {
    let mut seen: HashSet<(i32, i32)> = HashSet::new();
    let mut drop_ids: Vec<u32> = Vec::new();
    for bomb in sim.bombs.iter().rev() {
        if !seen.insert((bomb.grid_x, bomb.grid_y)) {
            drop_ids.push(bomb.id);
        }
    }
    if drop_ids.is_empty() {
        return;
    }
    warn!(
        "duplicate bombs on one cell, dropping earlier entries: {:?}",
        drop_ids
    );
    let owners: Vec<u8> = sim
        .bombs
        .iter()
        .filter(|b| drop_ids.contains(&b.id))
        .map(|b| b.owner_id)
        .collect();
    sim.bombs.retain(|b| !drop_ids.contains(&b.id));
    for owner_id in owners {
        if owner_id > 0 {
            if let Some(owner) = sim.player_mut(owner_id) {
                owner.active_bombs = owner.active_bombs.saturating_sub(1);
            }
        }
    }
}
