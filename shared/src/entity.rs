//! Serializable game entities.
//!
//! These records are simultaneously the server's simulation state and the
//! snapshot payload broadcast to clients, so server logic and client
//! prediction/interpolation read the exact same shapes. Polymorphic families
//! (tile, item, enemy kind, phase) are tagged enums rather than class
//! hierarchies.

use serde::{Deserialize, Serialize};

use crate::{grid, BASE_PLAYER_SPEED, ENTITY_SIZE, WINNER_CAMPAIGN_CODE};

/// Cardinal facing of a mobile entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Unit cell delta for this direction.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];
}

/// Life-state of a player.
///
/// TRAPPED is the intermediate state between NORMAL and DEAD: the player is
/// immobile, cannot place bombs, and dies when the trap timer expires unless
/// a teammate overlaps them first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifeState {
    Normal,
    Trapped,
    Dead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameMode {
    Pvp,
    Pve,
}

/// Room phase state machine.
///
/// WAITING → COUNTDOWN → PLAYING → { LEVEL_CLEAR → PLAYING | FINISHED }.
/// A FINISHED room may be restarted, which re-enters COUNTDOWN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Waiting,
    Countdown,
    Playing,
    LevelClear,
    Finished,
}

/// Match outcome. Exposed on the wire as the terse integer codes clients
/// already understand: 0 = draw/none, player id, 12 = campaign complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winner {
    None,
    Player(u8),
    Campaign,
}

impl Winner {
    pub fn code(self) -> u8 {
        match self {
            Winner::None => 0,
            Winner::Player(id) => id,
            Winner::Campaign => WINNER_CAMPAIGN_CODE,
        }
    }
}

/// Power-up kinds revealed from destroyed soft walls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemKind {
    RangeUp,
    BombUp,
    SpeedUp,
    Kick,
    Ghost,
    Shield,
}

/// A revealed, collectible item sitting on a cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ItemDrop {
    pub grid_x: i32,
    pub grid_y: i32,
    pub kind: ItemKind,
}

/// One player slot in a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Slot id, 1 or 2. Never reused within a match.
    pub id: u8,
    pub x: f32,
    pub y: f32,
    pub color: String,
    pub state: LifeState,
    pub direction: Direction,
    /// Movement speed in px per nominal tick.
    pub speed: f32,
    pub bomb_range: u32,
    pub max_bombs: u32,
    /// Live bombs with this player as owner. Kept equal to the actual count
    /// by the bomb engine.
    pub active_bombs: u32,
    pub score: u32,
    pub can_kick: bool,
    pub has_shield: bool,
    pub ghost_timer: f32,
    pub trapped_timer: f32,
    pub invincible_timer: f32,
}

impl Player {
    pub fn new(id: u8, x: f32, y: f32) -> Self {
        Self {
            id,
            x,
            y,
            color: player_color(id).to_string(),
            state: LifeState::Normal,
            direction: Direction::Down,
            speed: BASE_PLAYER_SPEED,
            bomb_range: 1,
            max_bombs: 1,
            active_bombs: 0,
            score: 0,
            can_kick: false,
            has_shield: false,
            ghost_timer: 0.0,
            trapped_timer: 0.0,
            invincible_timer: 0.0,
        }
    }

    pub fn alive(&self) -> bool {
        self.state != LifeState::Dead
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + ENTITY_SIZE / 2.0, self.y + ENTITY_SIZE / 2.0)
    }

    /// Cell containing the hitbox center. The unit of bomb placement and
    /// item pickup.
    pub fn cell(&self) -> (i32, i32) {
        let (cx, cy) = self.center();
        (grid::cell_of(cx), grid::cell_of(cy))
    }

    pub fn ghosting(&self) -> bool {
        self.ghost_timer > 0.0
    }
}

/// Stable player colors by slot id.
pub fn player_color(id: u8) -> &'static str {
    match id {
        1 => "white",
        2 => "black",
        _ => "gray",
    }
}

/// A placed bomb. `owner_id` 0 means neutral (enemy-placed).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bomb {
    pub id: u32,
    pub owner_id: u8,
    pub grid_x: i32,
    pub grid_y: i32,
    /// Pixel position of the tile-sized body; only diverges from the grid
    /// cell while the bomb slides from a kick.
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub range: u32,
    /// Remaining fuse, ms.
    pub timer: f32,
}

impl Bomb {
    pub fn sliding(&self) -> bool {
        self.vx != 0.0 || self.vy != 0.0
    }
}

/// One burning cell of an explosion cross.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplosionCell {
    pub id: u32,
    pub owner_id: u8,
    pub grid_x: i32,
    pub grid_y: i32,
    /// Remaining burn time, ms.
    pub timer: f32,
}

/// Enemy kinds, including the two bosses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnemyKind {
    Balloon,
    Ghost,
    Minion,
    Frog,
    Tank,
    BossSlime,
    BossMecha,
}

impl EnemyKind {
    /// Movement speed in px per nominal tick. Relative ordering matters for
    /// gameplay: TANK < BALLOON < FROG ≈ MINION < GHOST < BOSS_MECHA <
    /// BOSS_SLIME.
    pub fn speed(self) -> f32 {
        match self {
            EnemyKind::Tank => 1.0,
            EnemyKind::Balloon => 1.2,
            EnemyKind::Frog => 1.5,
            EnemyKind::Minion => 1.5,
            EnemyKind::Ghost => 1.8,
            EnemyKind::BossMecha => 2.0,
            EnemyKind::BossSlime => 2.2,
        }
    }

    pub fn max_hp(self) -> u32 {
        match self {
            EnemyKind::Tank => 2,
            EnemyKind::BossSlime => 12,
            EnemyKind::BossMecha => 16,
            _ => 1,
        }
    }

    pub fn is_boss(self) -> bool {
        matches!(self, EnemyKind::BossSlime | EnemyKind::BossMecha)
    }
}

/// One enemy instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enemy {
    pub id: u32,
    pub kind: EnemyKind,
    pub x: f32,
    pub y: f32,
    pub direction: Direction,
    pub speed: f32,
    pub hp: u32,
    pub max_hp: u32,
    /// Counts down to the next direction re-evaluation, ms.
    pub change_dir_timer: f32,
    /// Kind-specific cooldown (boss abilities, frog jumps), ms.
    pub action_timer: f32,
    /// Post-hit mercy window, ms.
    pub invincible_timer: f32,
}

impl Enemy {
    pub fn new(id: u32, kind: EnemyKind, x: f32, y: f32) -> Self {
        Self {
            id,
            kind,
            x,
            y,
            direction: Direction::Down,
            speed: kind.speed(),
            hp: kind.max_hp(),
            max_hp: kind.max_hp(),
            change_dir_timer: 0.0,
            action_timer: 0.0,
            invincible_timer: 0.0,
        }
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + ENTITY_SIZE / 2.0, self.y + ENTITY_SIZE / 2.0)
    }

    pub fn cell(&self) -> (i32, i32) {
        let (cx, cy) = self.center();
        (grid::cell_of(cx), grid::cell_of(cy))
    }
}

/// Axis-aligned overlap test between two entity hitboxes at the given
/// top-left positions. Exact touch does not count as overlap.
pub fn hitboxes_overlap(ax: f32, ay: f32, bx: f32, by: f32) -> bool {
    !(ax + ENTITY_SIZE <= bx
        || bx + ENTITY_SIZE <= ax
        || ay + ENTITY_SIZE <= by
        || by + ENTITY_SIZE <= ay)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn winner_codes() {
        assert_eq!(Winner::None.code(), 0);
        assert_eq!(Winner::Player(2).code(), 2);
        assert_eq!(Winner::Campaign.code(), 12);
    }

    #[test]
    fn player_cell_follows_center() {
        let player = Player::new(1, 48.0, 48.0);
        assert_eq!(player.cell(), (1, 1));
        let edge = Player::new(1, 48.0 + 20.0, 48.0);
        // Center at 48+20+18 = 86 px -> still column 1.
        assert_eq!(edge.cell(), (1, 1));
    }

    #[test]
    fn enemy_speed_ordering() {
        use EnemyKind::*;
        assert!(Tank.speed() < Balloon.speed());
        assert!(Balloon.speed() < Frog.speed());
        assert_eq!(Frog.speed(), Minion.speed());
        assert!(Minion.speed() < Ghost.speed());
        assert!(Ghost.speed() < BossMecha.speed());
        assert!(BossMecha.speed() < BossSlime.speed());
    }

    #[test]
    fn hitbox_overlap_excludes_touch() {
        assert!(hitboxes_overlap(0.0, 0.0, 20.0, 20.0));
        assert!(!hitboxes_overlap(0.0, 0.0, ENTITY_SIZE, 0.0));
        assert!(!hitboxes_overlap(0.0, 0.0, 100.0, 100.0));
    }
}
