//! The step function: advances one room by one tick.
//!
//! Processing order (fixed; the scenario tests depend on it):
//!   1. Player timers (ghost, invincible handled in combat, trapped in combat)
//!   2. Bomb requests, then input movement with ghost-expiry relocation
//!   3. Item pickup
//!   4. Enemy AI
//!   5. Bomb slide physics
//!   6. Fuses and detonation
//!   7. Explosion TTLs
//!   8. Combat resolution
//!   9. Win / level-clear arbitration
//!
//! Velocities scale by `time_factor = dt / TICK_MS` so pixel motion is
//! frame-rate independent; timers always burn raw `dt` milliseconds so
//! real-time durations stay exact.

use std::collections::{HashSet, VecDeque};

use bubble_shared::collision::{aligned_pos, predict_move, MoveOpts};
use bubble_shared::grid::Grid;
use bubble_shared::{
    Direction, ItemKind, LifeState, TileKind, GHOST_DURATION_MS, MAX_BOMBS, MAX_BOMB_RANGE,
    MAX_PLAYER_SPEED, TICK_MS,
};

use super::level::Verdict;
use super::{bomb, combat, enemy, level, SimState};

pub fn step(sim: &mut SimState, dt: f32) -> Verdict {
    let time_factor = dt / TICK_MS;

    let ghost_expired = advance_ghost_timers(sim, dt);
    place_requested_bombs(sim);
    move_players(sim, time_factor);
    relocate_ghost_stranded(sim, &ghost_expired);
    collect_pickups(sim);
    enemy::step_enemies(sim, dt, time_factor);
    bomb::advance_slides(sim, time_factor);
    bomb::tick_fuses_and_detonate(sim, dt);
    bomb::expire_explosions(sim, dt);
    combat::resolve(sim, dt);
    bomb::enforce_cell_uniqueness(sim);

    sim.time_left -= dt / 1000.0;
    level::arbitrate(sim)
}

/// Burn ghost timers; returns the players whose ghost mode ended this tick.
fn advance_ghost_timers(sim: &mut SimState, dt: f32) -> Vec<u8> {
    let mut expired = Vec::new();
    for player in &mut sim.players {
        if player.ghost_timer > 0.0 {
            player.ghost_timer -= dt;
            if player.ghost_timer <= 0.0 {
                player.ghost_timer = 0.0;
                expired.push(player.id);
            }
        }
    }
    expired
}

fn place_requested_bombs(sim: &mut SimState) {
    let requests: Vec<u8> = sim.bomb_requests.drain(..).collect();
    for player_id in requests {
        bomb::place_player_bomb(sim, player_id);
    }
}

fn move_players(sim: &mut SimState, time_factor: f32) {
    let ids: Vec<u8> = sim.players.iter().map(|p| p.id).collect();
    for id in ids {
        let flags = sim.inputs.get(&id).copied().unwrap_or_default();
        let (dx, dy) = flags.axes();
        if dx == 0.0 && dy == 0.0 {
            continue;
        }
        let Some(player) = sim.player(id) else {
            continue;
        };
        if player.state != LifeState::Normal {
            continue;
        }
        let (x, y, speed, ghosting) = (player.x, player.y, player.speed, player.ghosting());
        let opts = MoveOpts::for_player(ghosting, x, y);
        let step_px = speed * time_factor;
        let (nx, ny) = predict_move(&sim.grid, &sim.bombs, x, y, dx, dy, step_px, &opts);

        // Kicks are a dedicated resolution after a failed axis move, never a
        // side-effect of collision testing.
        if dx != 0.0 && nx == x {
            bomb::try_kick(sim, id, dx, 0.0);
        }
        if dy != 0.0 && ny == y {
            bomb::try_kick(sim, id, 0.0, dy);
        }

        if let Some(player) = sim.player_mut(id) {
            player.x = nx;
            player.y = ny;
            player.direction = facing_of(dx, dy, player.direction);
        }
    }
}

fn facing_of(dx: f32, dy: f32, current: Direction) -> Direction {
    if dy < 0.0 {
        Direction::Up
    } else if dy > 0.0 {
        Direction::Down
    } else if dx < 0.0 {
        Direction::Left
    } else if dx > 0.0 {
        Direction::Right
    } else {
        current
    }
}

/// A player whose GHOST ran out inside geometry gets teleported to the
/// nearest empty, bomb-free cell, found breadth-first from their cell.
/// Without this, expiring GHOST can strand a player inside a wall.
fn relocate_ghost_stranded(sim: &mut SimState, expired: &[u8]) {
    for &id in expired {
        let Some(player) = sim.player(id) else {
            continue;
        };
        let cell = player.cell();
        let stuck = sim.grid.tile(cell.0, cell.1) == TileKind::SoftWall || sim.bomb_at(cell);
        if !stuck {
            continue;
        }
        if let Some(free) = nearest_free_cell(sim, cell) {
            let (x, y) = aligned_pos(free.0, free.1);
            if let Some(player) = sim.player_mut(id) {
                player.x = x;
                player.y = y;
            }
        }
    }
}

fn nearest_free_cell(sim: &SimState, from: (i32, i32)) -> Option<(i32, i32)> {
    let mut queue = VecDeque::new();
    let mut visited = HashSet::new();
    queue.push_back(from);
    visited.insert(from);
    while let Some(cell) = queue.pop_front() {
        if sim.grid.tile(cell.0, cell.1) == TileKind::Empty && !sim.bomb_at(cell) {
            return Some(cell);
        }
        for (dx, dy) in [(0, -1), (0, 1), (-1, 0), (1, 0)] {
            let next = (cell.0 + dx, cell.1 + dy);
            if Grid::in_bounds(next.0, next.1) && visited.insert(next) {
                queue.push_back(next);
            }
        }
    }
    None
}

fn collect_pickups(sim: &mut SimState) {
    let mut collected: Vec<(usize, u8)> = Vec::new();
    for (idx, item) in sim.items.iter().enumerate() {
        let cell = (item.grid_x, item.grid_y);
        let taker = sim
            .players
            .iter()
            .find(|p| p.state != LifeState::Dead && p.cell() == cell);
        if let Some(player) = taker {
            collected.push((idx, player.id));
        }
    }
    for (idx, player_id) in collected.into_iter().rev() {
        let item = sim.items.remove(idx);
        if let Some(player) = sim.player_mut(player_id) {
            apply_item(player, item.kind);
        }
    }
}

fn apply_item(player: &mut bubble_shared::Player, kind: ItemKind) {
    match kind {
        ItemKind::RangeUp => player.bomb_range = (player.bomb_range + 1).min(MAX_BOMB_RANGE),
        ItemKind::BombUp => player.max_bombs = (player.max_bombs + 1).min(MAX_BOMBS),
        ItemKind::SpeedUp => player.speed = (player.speed + 1.0).min(MAX_PLAYER_SPEED),
        ItemKind::Kick => player.can_kick = true,
        // Refresh, not additive.
        ItemKind::Ghost => player.ghost_timer = GHOST_DURATION_MS,
        ItemKind::Shield => player.has_shield = true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bubble_shared::{GameMode, Player};

    #[test]
    fn item_caps_hold() {
        let mut player = Player::new(1, 54.0, 54.0);
        for _ in 0..20 {
            apply_item(&mut player, ItemKind::RangeUp);
            apply_item(&mut player, ItemKind::BombUp);
            apply_item(&mut player, ItemKind::SpeedUp);
        }
        assert_eq!(player.bomb_range, MAX_BOMB_RANGE);
        assert_eq!(player.max_bombs, MAX_BOMBS);
        assert_eq!(player.speed, MAX_PLAYER_SPEED);
    }

    #[test]
    fn ghost_pickup_refreshes_timer() {
        let mut player = Player::new(1, 54.0, 54.0);
        player.ghost_timer = 1234.0;
        apply_item(&mut player, ItemKind::Ghost);
        assert_eq!(player.ghost_timer, GHOST_DURATION_MS);
    }

    #[test]
    fn bfs_finds_nearest_open_cell() {
        let mut sim = SimState::new(GameMode::Pvp, 1);
        sim.grid = Grid::empty();
        sim.grid.set_tile(5, 5, TileKind::SoftWall);
        sim.grid.set_tile(6, 5, TileKind::SoftWall);
        let free = nearest_free_cell(&sim, (5, 5)).unwrap();
        // Any of the four open neighbors; BFS found one at distance 1.
        let dist = (free.0 - 5).abs() + (free.1 - 5).abs();
        assert_eq!(dist, 1);
    }
}
