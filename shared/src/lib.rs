//! # Shared Game Library
//!
//! Data structures, constants, and geometry shared by the game server and the
//! netcode client. Everything the two sides must agree on byte-for-byte lives
//! here:
//!
//! - **Game constants** — grid dimensions, hitbox sizes, timer durations and
//!   power-up caps that define the arena rules.
//! - **Wire protocol** — the [`protocol`] module defines the typed envelopes
//!   exchanged over the WebSocket transport and the authoritative
//!   [`protocol::RoomSnapshot`] record.
//! - **Entities** — serializable player, bomb, explosion, enemy and item
//!   records used both as simulation state and as snapshot payloads.
//! - **Collision kernel** — [`collision::predict_move`] implements the exact
//!   hitbox geometry (corner testing, corner sliding, bomb walk-off) used by
//!   the server's authoritative step *and* by client-side prediction, which
//!   is what keeps prediction convergent with server truth.
//!
//! All network data structures implement `Serialize`/`Deserialize` so the
//! transport layer can encode them with `bincode`.

pub mod collision;
pub mod entity;
pub mod grid;
pub mod protocol;

pub use entity::{
    Bomb, Direction, Enemy, EnemyKind, ExplosionCell, GameMode, ItemDrop, ItemKind, LifeState,
    Phase, Player, Winner,
};
pub use grid::{Grid, TileKind};

/// Arena width in cells.
pub const GRID_WIDTH: i32 = 15;
/// Arena height in cells.
pub const GRID_HEIGHT: i32 = 13;
/// Edge length of one tile in pixels.
pub const TILE_SIZE: f32 = 48.0;
/// Edge length of the square entity hitbox, smaller than a tile so entities
/// fit through corridors with some forgiveness.
pub const ENTITY_SIZE: f32 = 36.0;
/// Hitbox corners are shrunk inward by this amount before tile tests.
pub const COLLISION_EPSILON: f32 = 0.1;
/// Maximum center misalignment (px) at which a blocked move still triggers a
/// corner-slide nudge toward the open corridor.
pub const CORNER_TOLERANCE: f32 = 12.0;

/// Nominal duration of one simulation tick in milliseconds (60 Hz).
pub const TICK_MS: f32 = 1000.0 / 60.0;

/// Starting movement speed, px per nominal tick.
pub const BASE_PLAYER_SPEED: f32 = 3.0;
/// SPEED_UP cap.
pub const MAX_PLAYER_SPEED: f32 = 6.0;
/// RANGE_UP cap.
pub const MAX_BOMB_RANGE: u32 = 8;
/// BOMB_UP cap.
pub const MAX_BOMBS: u32 = 8;

/// Default bomb fuse, ms.
pub const BOMB_FUSE_MS: f32 = 3000.0;
/// Lifetime of a single explosion cell, ms.
pub const EXPLOSION_TTL_MS: f32 = 600.0;
/// Velocity imparted to a kicked bomb, px per nominal tick.
pub const KICK_SPEED: f32 = 8.0;

/// GHOST power-up duration, ms. Pickup refreshes, never stacks.
pub const GHOST_DURATION_MS: f32 = 10_000.0;
/// How long a trapped player survives without rescue, ms.
pub const TRAPPED_DURATION_MS: f32 = 5_000.0;
/// Invincibility granted on taking a hit, ms.
pub const HURT_INVINCIBLE_MS: f32 = 1_000.0;
/// Invincibility granted on being rescued, ms.
pub const RESCUE_INVINCIBLE_MS: f32 = 2_000.0;
/// Per-hit mercy window for enemies, ms.
pub const ENEMY_HIT_INVINCIBLE_MS: f32 = 500.0;
/// Bombs with less fuse than this are considered an active threat by the
/// enemy dodge logic, ms.
pub const DODGE_THRESHOLD_MS: f32 = 2000.0;

/// Maximum sessions per room.
pub const ROOM_CAPACITY: usize = 2;
/// Winner code reported when the whole campaign is cleared.
pub const WINNER_CAMPAIGN_CODE: u8 = 12;
