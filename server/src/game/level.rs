//! Level configs, spawning, and win arbitration.

use log::{info, warn};
use rand::Rng;

use bubble_shared::collision::aligned_pos;
use bubble_shared::{
    Enemy, EnemyKind, GameMode, LifeState, Player, TileKind, Winner, BASE_PLAYER_SPEED,
    GRID_HEIGHT, GRID_WIDTH,
};

use super::{map, SimState};

/// Match clock per level, seconds.
pub const MATCH_TIME_SECS: f32 = 180.0;
/// Attempts at placing one enemy before giving up. Fewer enemies than
/// configured is acceptable; arbitration counts live enemies, not spawns.
const SPAWN_ATTEMPTS: usize = 40;
/// Minimum Chebyshev distance (cells) between an enemy spawn and a player.
const SPAWN_PLAYER_CLEARANCE: i32 = 3;

/// Static config of one level.
pub struct LevelConfig {
    pub wall_density: f32,
    pub enemies: &'static [EnemyKind],
    pub boss: Option<EnemyKind>,
}

/// The PVE campaign, in order.
pub static CAMPAIGN: [LevelConfig; 5] = [
    LevelConfig {
        wall_density: 0.35,
        enemies: &[EnemyKind::Balloon, EnemyKind::Balloon, EnemyKind::Balloon],
        boss: None,
    },
    LevelConfig {
        wall_density: 0.40,
        enemies: &[
            EnemyKind::Balloon,
            EnemyKind::Balloon,
            EnemyKind::Ghost,
            EnemyKind::Ghost,
        ],
        boss: None,
    },
    LevelConfig {
        wall_density: 0.45,
        enemies: &[
            EnemyKind::Ghost,
            EnemyKind::Ghost,
            EnemyKind::Frog,
            EnemyKind::Frog,
            EnemyKind::Tank,
        ],
        boss: None,
    },
    LevelConfig {
        wall_density: 0.50,
        enemies: &[
            EnemyKind::Minion,
            EnemyKind::Minion,
            EnemyKind::Minion,
            EnemyKind::Tank,
            EnemyKind::Tank,
        ],
        boss: Some(EnemyKind::BossSlime),
    },
    LevelConfig {
        wall_density: 0.55,
        enemies: &[
            EnemyKind::Ghost,
            EnemyKind::Ghost,
            EnemyKind::Minion,
            EnemyKind::Minion,
            EnemyKind::Tank,
            EnemyKind::Tank,
        ],
        boss: Some(EnemyKind::BossMecha),
    },
];

/// PVP plays a single enemy-free arena.
static PVP_ARENA: LevelConfig = LevelConfig {
    wall_density: 0.45,
    enemies: &[],
    boss: None,
};

pub fn config_for(mode: GameMode, level: usize) -> &'static LevelConfig {
    match mode {
        GameMode::Pvp => &PVP_ARENA,
        GameMode::Pve => &CAMPAIGN[level.min(CAMPAIGN.len() - 1)],
    }
}

fn is_last_level(mode: GameMode, level: usize) -> bool {
    mode == GameMode::Pvp || level + 1 >= CAMPAIGN.len()
}

/// Rebuild the arena for the current level. Transient per-level player stats
/// reset; score survives.
pub fn init_level(sim: &mut SimState) {
    let config = config_for(sim.mode, sim.level);

    let (grid, hidden) = map::generate(&mut sim.rng, config.wall_density);
    sim.grid = grid;
    sim.hidden_items = hidden;
    sim.items.clear();
    sim.bombs.clear();
    sim.explosions.clear();
    sim.enemies.clear();
    sim.boss_spawned = false;
    sim.time_left = MATCH_TIME_SECS;
    sim.bomb_requests.clear();

    for player in &mut sim.players {
        reset_transient(player);
    }

    if sim.mode == GameMode::Pve {
        for &kind in config.enemies {
            spawn_enemy(sim, kind);
        }
    }
}

fn reset_transient(player: &mut Player) {
    let (x, y) = map::spawn_position(player.id);
    player.x = x;
    player.y = y;
    player.state = LifeState::Normal;
    player.speed = BASE_PLAYER_SPEED;
    player.bomb_range = 1;
    player.max_bombs = 1;
    player.active_bombs = 0;
    player.can_kick = false;
    player.has_shield = false;
    player.ghost_timer = 0.0;
    player.trapped_timer = 0.0;
    player.invincible_timer = 0.0;
}

fn spawn_enemy(sim: &mut SimState, kind: EnemyKind) {
    let Some(cell) = find_spawn_cell(sim) else {
        warn!("no spawn room for {:?}, skipping", kind);
        return;
    };
    let (x, y) = aligned_pos(cell.0, cell.1);
    let id = sim.alloc_enemy_id();
    sim.enemies.push(Enemy::new(id, kind, x, y));
}

fn find_spawn_cell(sim: &mut SimState) -> Option<(i32, i32)> {
    let player_cells: Vec<(i32, i32)> = sim.players.iter().map(|p| p.cell()).collect();
    for _ in 0..SPAWN_ATTEMPTS {
        let col = sim.rng.gen_range(1..GRID_WIDTH - 1);
        let row = sim.rng.gen_range(1..GRID_HEIGHT - 1);
        if sim.grid.tile(col, row) != TileKind::Empty {
            continue;
        }
        if sim.bomb_at((col, row)) {
            continue;
        }
        let near_player = player_cells.iter().any(|&(pc, pr)| {
            (pc - col).abs().max((pr - row).abs()) < SPAWN_PLAYER_CLEARANCE
        });
        if near_player {
            continue;
        }
        if sim.enemies.iter().any(|e| e.cell() == (col, row)) {
            continue;
        }
        return Some((col, row));
    }
    None
}

/// What the room should do after this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    Continue,
    /// Level cleared; the room pauses until an advance signal.
    LevelClear,
    /// Match over with the recorded winner.
    Finished(Winner),
}

/// Win/loss/level-clear arbitration, run as the final phase of every tick.
/// Also owns the boss-spawn trigger: the boss enters once the regular roster
/// is cleared.
pub fn arbitrate(sim: &mut SimState) -> Verdict {
    if sim.time_left <= 0.0 {
        sim.winner = Winner::None;
        return Verdict::Finished(Winner::None);
    }

    match sim.mode {
        GameMode::Pve => {
            let all_dead = !sim.players.is_empty()
                && sim.players.iter().all(|p| p.state == LifeState::Dead);
            if all_dead {
                sim.winner = Winner::None;
                return Verdict::Finished(Winner::None);
            }

            let config = config_for(sim.mode, sim.level);
            if sim.enemies.is_empty() {
                if let Some(boss) = config.boss {
                    if !sim.boss_spawned {
                        info!("level {} roster cleared, boss {:?} enters", sim.level + 1, boss);
                        spawn_enemy(sim, boss);
                        sim.boss_spawned = true;
                        return Verdict::Continue;
                    }
                }
                // Cleared: roster down, and any configured boss already
                // spawned and died.
                if is_last_level(sim.mode, sim.level) {
                    sim.winner = Winner::Campaign;
                    return Verdict::Finished(Winner::Campaign);
                }
                return Verdict::LevelClear;
            }
            Verdict::Continue
        }
        GameMode::Pvp => {
            let alive: Vec<&Player> = sim
                .players
                .iter()
                .filter(|p| p.state != LifeState::Dead)
                .collect();
            if alive.is_empty() {
                sim.winner = Winner::None;
                return Verdict::Finished(Winner::None);
            }
            if alive.len() == 1 && alive[0].state == LifeState::Normal && sim.players.len() > 1 {
                let winner = Winner::Player(alive[0].id);
                sim.winner = winner;
                return Verdict::Finished(winner);
            }
            Verdict::Continue
        }
    }
}
