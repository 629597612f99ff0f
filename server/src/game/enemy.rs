//! Enemy AI.
//!
//! One scheduler drives every kind: decrement the direction and action
//! timers, run the kind's behavior from the strategy table, then attempt to
//! move in the chosen direction. A blocked move triggers a kind-specific
//! reaction (immediate re-pick, random escape, or a frog jump).
//!
//! The shared primitives (`nearest_living`, `chase_direction`,
//! `danger_level`, `dodge_direction`) are free functions so kinds compose
//! them instead of inheriting behavior.

use rand::rngs::StdRng;
use rand::Rng;

use bubble_shared::collision::{aligned_pos, blocked, predict_move, MoveOpts};
use bubble_shared::{
    Bomb, Direction, Enemy, EnemyKind, LifeState, Player, TileKind, DODGE_THRESHOLD_MS,
};

use super::{bomb, SimState};

/// Chasers re-evaluate their direction on this cadence, ms.
const CHASE_INTERVAL_MS: f32 = 100.0;
/// Re-evaluation delay after a chaser bounces off a wall, ms.
const ESCAPE_INTERVAL_MS: f32 = 300.0;
/// Dodging enemies re-evaluate almost immediately, ms.
const DODGE_INTERVAL_MS: f32 = 50.0;
/// Frog jump cooldown, ms.
const FROG_JUMP_COOLDOWN_MS: f32 = 1000.0;
/// Slime boss minion-spawn cycle, ms.
const SLIME_SPAWN_INTERVAL_MS: f32 = 4000.0;
/// Mecha boss bomb cooldown, ms.
const MECHA_BOMB_COOLDOWN_MS: f32 = 5000.0;
/// The slime boss stops spawning when the arena holds this many enemies.
const ENEMY_POPULATION_CAP: usize = 8;

/// Advance every enemy by one tick.
pub fn step_enemies(sim: &mut SimState, dt: f32, time_factor: f32) {
    let count = sim.enemies.len();
    for i in 0..count {
        let mut enemy = sim.enemies[i].clone();

        enemy.change_dir_timer -= dt;
        enemy.action_timer -= dt;
        if enemy.invincible_timer > 0.0 {
            enemy.invincible_timer -= dt;
        }

        behave(sim, &mut enemy);

        if !try_move(sim, &mut enemy, time_factor) {
            on_blocked(sim, &mut enemy);
        }

        sim.enemies[i] = enemy;
    }
}

fn behave(sim: &mut SimState, enemy: &mut Enemy) {
    match enemy.kind {
        EnemyKind::Balloon | EnemyKind::Frog => {
            if enemy.change_dir_timer <= 0.0 {
                enemy.direction = random_direction(&mut sim.rng);
                enemy.change_dir_timer = sim.rng.gen_range(2000.0..4000.0);
            }
        }
        EnemyKind::Ghost | EnemyKind::Minion | EnemyKind::Tank => {
            schedule_chase(sim, enemy);
        }
        EnemyKind::BossSlime => {
            schedule_chase(sim, enemy);
            if enemy.action_timer <= 0.0 {
                enemy.action_timer = SLIME_SPAWN_INTERVAL_MS;
                if sim.enemies.len() < ENEMY_POPULATION_CAP {
                    let (col, row) = enemy.cell();
                    let (x, y) = aligned_pos(col, row);
                    let id = sim.alloc_enemy_id();
                    sim.enemies.push(Enemy::new(id, EnemyKind::Minion, x, y));
                }
            }
        }
        EnemyKind::BossMecha => {
            // Survival first: a safe neighbor beats chasing or bombing.
            if let Some(dir) = dodge_direction(sim, enemy) {
                enemy.direction = dir;
                enemy.change_dir_timer = DODGE_INTERVAL_MS;
                return;
            }
            schedule_chase(sim, enemy);
            if enemy.action_timer <= 0.0 && !is_in_danger(&sim.bombs, enemy.cell()) {
                if bomb::place_enemy_bomb(sim, enemy.cell()) {
                    enemy.action_timer = MECHA_BOMB_COOLDOWN_MS;
                }
            }
        }
    }
}

fn schedule_chase(sim: &mut SimState, enemy: &mut Enemy) {
    if enemy.change_dir_timer > 0.0 {
        return;
    }
    if let Some(target) = nearest_living(&sim.players, enemy.center()) {
        enemy.direction = chase_direction(sim, enemy, target);
    }
    enemy.change_dir_timer = CHASE_INTERVAL_MS;
}

/// Enemies collide like players minus the ghost flags; the origin walk-off
/// matters for the mecha, which must be able to step off its own bomb.
fn move_opts(enemy: &Enemy) -> MoveOpts {
    MoveOpts {
        origin: Some((enemy.x, enemy.y)),
        ..MoveOpts::solid()
    }
}

fn try_move(sim: &SimState, enemy: &mut Enemy, time_factor: f32) -> bool {
    let (dx, dy) = enemy.direction.delta();
    let step = enemy.speed * time_factor;
    let (nx, ny) = predict_move(
        &sim.grid,
        &sim.bombs,
        enemy.x,
        enemy.y,
        dx as f32,
        dy as f32,
        step,
        &move_opts(enemy),
    );
    let moved = (nx, ny) != (enemy.x, enemy.y);
    enemy.x = nx;
    enemy.y = ny;
    moved
}

fn on_blocked(sim: &mut SimState, enemy: &mut Enemy) {
    match enemy.kind {
        EnemyKind::Balloon => {
            enemy.direction = random_direction(&mut sim.rng);
            enemy.change_dir_timer = sim.rng.gen_range(2000.0..4000.0);
        }
        EnemyKind::Frog => {
            if !try_frog_jump(sim, enemy) {
                enemy.direction = random_direction(&mut sim.rng);
                enemy.change_dir_timer = sim.rng.gen_range(2000.0..4000.0);
            }
        }
        _ => {
            // Brief random escape, then resume chasing.
            if let Some(dir) = random_unblocked(sim, enemy) {
                enemy.direction = dir;
            }
            enemy.change_dir_timer = ESCAPE_INTERVAL_MS;
        }
    }
}

/// Frogs can vault a single soft wall: the cell behind it must be empty and
/// bomb-free. Lands cell-aligned with a cooldown.
fn try_frog_jump(sim: &SimState, enemy: &mut Enemy) -> bool {
    if enemy.action_timer > 0.0 {
        return false;
    }
    let (dx, dy) = enemy.direction.delta();
    let cell = enemy.cell();
    let over = (cell.0 + dx, cell.1 + dy);
    let landing = (cell.0 + 2 * dx, cell.1 + 2 * dy);
    if sim.grid.tile(over.0, over.1) == TileKind::SoftWall
        && sim.grid.tile(landing.0, landing.1) == TileKind::Empty
        && !sim.bomb_at(landing)
    {
        let (x, y) = aligned_pos(landing.0, landing.1);
        enemy.x = x;
        enemy.y = y;
        enemy.action_timer = FROG_JUMP_COOLDOWN_MS;
        true
    } else {
        false
    }
}

fn random_direction(rng: &mut StdRng) -> Direction {
    Direction::ALL[rng.gen_range(0..4)]
}

fn random_unblocked(sim: &mut SimState, enemy: &Enemy) -> Option<Direction> {
    let open: Vec<Direction> = Direction::ALL
        .into_iter()
        .filter(|dir| !probe_blocked(sim, enemy, *dir))
        .collect();
    if open.is_empty() {
        None
    } else {
        Some(open[sim.rng.gen_range(0..open.len())])
    }
}

fn probe_blocked(sim: &SimState, enemy: &Enemy, dir: Direction) -> bool {
    let (dx, dy) = dir.delta();
    blocked(
        &sim.grid,
        &sim.bombs,
        enemy.x + dx as f32 * enemy.speed,
        enemy.y + dy as f32 * enemy.speed,
        &move_opts(enemy),
    )
}

/// Hitbox center of the nearest non-dead player, by Euclidean distance.
pub fn nearest_living(players: &[Player], from: (f32, f32)) -> Option<(f32, f32)> {
    players
        .iter()
        .filter(|p| p.state != LifeState::Dead)
        .map(|p| p.center())
        .min_by(|a, b| {
            let da = (a.0 - from.0).powi(2) + (a.1 - from.1).powi(2);
            let db = (b.0 - from.0).powi(2) + (b.1 - from.1).powi(2);
            da.total_cmp(&db)
        })
}

/// Best cardinal direction toward the target. Each direction scores the
/// signed distance it closes (negative when it moves away); only unblocked
/// directions compete, highest score wins.
pub fn chase_direction(sim: &SimState, enemy: &Enemy, target: (f32, f32)) -> Direction {
    let (ex, ey) = enemy.center();
    let mut best: Option<(Direction, f32)> = None;
    for dir in Direction::ALL {
        if probe_blocked(sim, enemy, dir) {
            continue;
        }
        let (dx, dy) = dir.delta();
        let score = dx as f32 * (target.0 - ex) + dy as f32 * (target.1 - ey);
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((dir, score));
        }
    }
    best.map(|(d, _)| d).unwrap_or(enemy.direction)
}

fn in_blast_cross(bomb: &Bomb, cell: (i32, i32)) -> bool {
    let range = bomb.range as i32;
    (bomb.grid_x == cell.0 && (bomb.grid_y - cell.1).abs() <= range)
        || (bomb.grid_y == cell.1 && (bomb.grid_x - cell.0).abs() <= range)
}

/// Accumulated threat of all bombs whose blast cross covers the cell. Bombs
/// closer to detonation contribute more; a cell with no threatening bombs
/// scores zero.
pub fn danger_level(bombs: &[Bomb], cell: (i32, i32)) -> f32 {
    bombs
        .iter()
        .filter(|b| in_blast_cross(b, cell))
        .map(|b| (DODGE_THRESHOLD_MS - b.timer + 1000.0).max(0.0))
        .sum()
}

/// Is the cell covered by a bomb about to blow?
pub fn is_in_danger(bombs: &[Bomb], cell: (i32, i32)) -> bool {
    bombs
        .iter()
        .any(|b| b.timer <= DODGE_THRESHOLD_MS && in_blast_cross(b, cell))
}

/// Unblocked neighbor with the lowest danger, if strictly safer than the
/// current cell.
pub fn dodge_direction(sim: &SimState, enemy: &Enemy) -> Option<Direction> {
    let cell = enemy.cell();
    let current = danger_level(&sim.bombs, cell);
    if current <= 0.0 {
        return None;
    }
    let mut best: Option<(Direction, f32)> = None;
    for dir in Direction::ALL {
        if probe_blocked(sim, enemy, dir) {
            continue;
        }
        let (dx, dy) = dir.delta();
        let danger = danger_level(&sim.bombs, (cell.0 + dx, cell.1 + dy));
        if danger < current && best.map_or(true, |(_, d)| danger < d) {
            best = Some((dir, danger));
        }
    }
    best.map(|(d, _)| d)
}
