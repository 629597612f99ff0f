//! Authoritative per-room simulation.
//!
//! [`SimState`] bundles everything one room simulates: grid, items, players,
//! bombs, explosions and enemies, plus the room's private RNG stream. The
//! per-tick entry point is [`SimState::step`], which drives the subsystems in
//! the canonical order documented in [`step`].
//!
//! Except for draws from the per-room RNG (map generation, enemy direction,
//! item seeding), a step is a pure function of (prior state, dt, inputs);
//! nothing here reads clocks or global randomness.

pub mod bomb;
pub mod combat;
pub mod enemy;
pub mod level;
pub mod map;
pub mod step;

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::SeedableRng;

use bubble_shared::{
    Bomb, Enemy, ExplosionCell, GameMode, Grid, ItemDrop, ItemKind, Player, Winner,
};

pub use level::Verdict;

/// Movement keys currently held by one player. The server treats each flag
/// as "continuous while true"; clients only send changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputFlags {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl InputFlags {
    /// Input direction per axis, each in {-1, 0, 1}.
    pub fn axes(&self) -> (f32, f32) {
        let dx = (self.right as i8 - self.left as i8) as f32;
        let dy = (self.down as i8 - self.up as i8) as f32;
        (dx, dy)
    }
}

/// Complete simulation state of one room.
#[derive(Debug)]
pub struct SimState {
    pub grid: Grid,
    /// Items still buried under soft walls, keyed by cell.
    pub hidden_items: HashMap<(i32, i32), ItemKind>,
    /// Revealed, collectible items.
    pub items: Vec<ItemDrop>,
    pub players: Vec<Player>,
    pub bombs: Vec<Bomb>,
    pub explosions: Vec<ExplosionCell>,
    pub enemies: Vec<Enemy>,
    pub mode: GameMode,
    /// Zero-based index into the campaign.
    pub level: usize,
    /// Seconds left on the match clock.
    pub time_left: f32,
    pub winner: Winner,
    pub boss_spawned: bool,

    /// Held movement keys per player id.
    pub inputs: HashMap<u8, InputFlags>,
    /// Player ids that requested a bomb since the previous tick.
    pub bomb_requests: Vec<u8>,

    pub rng: StdRng,
    next_bomb_id: u32,
    next_explosion_id: u32,
    next_enemy_id: u32,
}

impl SimState {
    /// Fresh simulation seeded from the room's creation moment.
    pub fn new(mode: GameMode, seed: u64) -> Self {
        let mut sim = Self {
            grid: Grid::empty(),
            hidden_items: HashMap::new(),
            items: Vec::new(),
            players: Vec::new(),
            bombs: Vec::new(),
            explosions: Vec::new(),
            enemies: Vec::new(),
            mode,
            level: 0,
            time_left: 0.0,
            winner: Winner::None,
            boss_spawned: false,
            inputs: HashMap::new(),
            bomb_requests: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
            next_bomb_id: 1,
            next_explosion_id: 1,
            next_enemy_id: 1,
        };
        level::init_level(&mut sim);
        sim
    }

    pub fn player(&self, id: u8) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: u8) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    /// Create the player slot and place it at its spawn corner.
    pub fn add_player(&mut self, id: u8) {
        if self.player(id).is_some() {
            return;
        }
        let (x, y) = map::spawn_position(id);
        self.players.push(Player::new(id, x, y));
        self.inputs.insert(id, InputFlags::default());
    }

    /// Drop a player slot entirely (leave or expired reconnect grace).
    pub fn remove_player(&mut self, id: u8) {
        self.players.retain(|p| p.id != id);
        self.inputs.remove(&id);
        self.bomb_requests.retain(|&r| r != id);
    }

    pub fn set_input(&mut self, id: u8, flags: InputFlags) {
        if let Some(slot) = self.inputs.get_mut(&id) {
            *slot = flags;
        }
    }

    pub fn queue_bomb(&mut self, id: u8) {
        self.bomb_requests.push(id);
    }

    /// Move to the next campaign level, keeping scores.
    pub fn advance_level(&mut self) {
        self.level += 1;
        level::init_level(self);
    }

    /// Full reset for a rematch: scores cleared, back to level one.
    pub fn restart(&mut self) {
        self.level = 0;
        self.winner = Winner::None;
        for player in &mut self.players {
            player.score = 0;
        }
        level::init_level(self);
    }

    /// Advance the simulation by `dt` milliseconds.
    pub fn step(&mut self, dt: f32) -> Verdict {
        step::step(self, dt)
    }

    pub fn alloc_bomb_id(&mut self) -> u32 {
        let id = self.next_bomb_id;
        self.next_bomb_id += 1;
        id
    }

    pub fn alloc_explosion_id(&mut self) -> u32 {
        let id = self.next_explosion_id;
        self.next_explosion_id += 1;
        id
    }

    pub fn alloc_enemy_id(&mut self) -> u32 {
        let id = self.next_enemy_id;
        self.next_enemy_id += 1;
        id
    }

    /// Is there a live bomb on this cell?
    pub fn bomb_at(&self, cell: (i32, i32)) -> bool {
        self.bombs
            .iter()
            .any(|b| (b.grid_x, b.grid_y) == cell)
    }

    /// Is there a burning explosion cell on this cell?
    pub fn explosion_at(&self, cell: (i32, i32)) -> bool {
        self.explosions
            .iter()
            .any(|e| (e.grid_x, e.grid_y) == cell)
    }
}
