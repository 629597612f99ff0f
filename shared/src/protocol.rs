//! Wire protocol between client and server.
//!
//! Every WebSocket frame carries one bincode-encoded envelope: a
//! [`ClientMessage`] upstream or a [`ServerMessage`] downstream. All client
//! messages are advisory; the server validates everything and silently drops
//! what the rules reject (clients may over-send by design).
//!
//! The authoritative [`RoomSnapshot`] is published after every simulation
//! tick. It is a full snapshot: clients never need to patch partial state,
//! and `decode(encode(snapshot))` is bit-equal to the original.

use serde::{Deserialize, Serialize};

use crate::entity::{Bomb, Enemy, ExplosionCell, GameMode, ItemDrop, Phase, Player, Winner};

/// Default WebSocket listen port.
pub const DEFAULT_PORT: u16 = 2567;

/// Normal closure: the client should not reconnect.
pub const CLOSE_NORMAL: u16 = 1000;
/// Abnormal closure as surfaced by the transport; triggers reconnect.
pub const CLOSE_ABNORMAL: u16 = 1006;
/// Gameplay-terminal closes use custom codes at or above this value.
pub const CLOSE_GAMEPLAY_BASE: u16 = 4000;
/// The room was disposed while the session was attached.
pub const CLOSE_ROOM_DISPOSED: u16 = 4000;

/// Messages sent from a client to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClientMessage {
    /// Join the first open public room of the given mode, or have one
    /// created.
    QuickMatch { mode: GameMode },
    /// Mint a fresh room and join it. The reply carries its code.
    CreateRoom { mode: GameMode, is_private: bool },
    /// Join a specific room by its 4-character code.
    JoinByCode { code: String },
    /// Re-bind to a held player slot after a transport drop.
    Reconnect { code: String, token: String },
    /// Edge-triggered movement state; each flag means "held down".
    Input {
        up: bool,
        down: bool,
        left: bool,
        right: bool,
    },
    /// Attempt to place a bomb at the player's current cell.
    Bomb,
    /// WAITING: start request. LEVEL_CLEAR: advance to the next level.
    /// FINISHED: restart the match.
    Ready,
    /// Graceful leave; the slot is released immediately.
    Leave,
}

/// Machine-readable category for a failed join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinErrorKind {
    /// No room with that code exists.
    NotFound,
    /// The room is at capacity.
    RoomLocked,
    /// The room is past WAITING.
    AlreadyStarted,
    /// Reconnect token did not match a held slot.
    BadToken,
}

/// Messages sent from the server to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    /// Session established: the session and slot ids, the room code, a
    /// reconnect token and the initial full snapshot.
    JoinAccepted {
        session_id: u64,
        player_id: u8,
        room_code: String,
        token: String,
        snapshot: RoomSnapshot,
    },
    /// Join failed; no session was established.
    JoinRejected { kind: JoinErrorKind, hint: String },
    /// Authoritative room state, published after every tick.
    Snapshot(RoomSnapshot),
}

/// Full authoritative state of one room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub tick: u64,
    pub phase: Phase,
    pub game_mode: GameMode,
    pub room_code: String,
    pub is_private: bool,
    /// Seconds until PLAYING while in COUNTDOWN.
    pub countdown: f32,
    /// Seconds left on the match clock.
    pub time_left: f32,
    pub level: u32,
    pub winner: Winner,
    pub boss_spawned: bool,
    /// Flattened grid, length `GRID_WIDTH * GRID_HEIGHT`, values 0/1/2.
    pub grid: Vec<u8>,
    pub items: Vec<ItemDrop>,
    pub players: Vec<Player>,
    pub bombs: Vec<Bomb>,
    pub explosions: Vec<ExplosionCell>,
    pub enemies: Vec<Enemy>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Direction, EnemyKind, ItemKind, LifeState};
    use crate::grid::Grid;

    fn sample_snapshot() -> RoomSnapshot {
        RoomSnapshot {
            tick: 42,
            phase: Phase::Playing,
            game_mode: GameMode::Pve,
            room_code: "AB2C".to_string(),
            is_private: false,
            countdown: 0.0,
            time_left: 178.5,
            level: 2,
            winner: Winner::None,
            boss_spawned: false,
            grid: Grid::empty().flatten(),
            items: vec![ItemDrop {
                grid_x: 3,
                grid_y: 5,
                kind: ItemKind::Kick,
            }],
            players: vec![Player::new(1, 54.0, 54.0)],
            bombs: vec![Bomb {
                id: 7,
                owner_id: 1,
                grid_x: 5,
                grid_y: 6,
                x: 240.0,
                y: 288.0,
                vx: 0.0,
                vy: 0.0,
                range: 2,
                timer: 1800.0,
            }],
            explosions: vec![ExplosionCell {
                id: 9,
                owner_id: 1,
                grid_x: 4,
                grid_y: 6,
                timer: 300.0,
            }],
            enemies: vec![Enemy::new(3, EnemyKind::Balloon, 336.0, 288.0)],
        }
    }

    #[test]
    fn snapshot_roundtrip_is_bit_equal() {
        let snapshot = sample_snapshot();
        let bytes = bincode::serialize(&snapshot).unwrap();
        let decoded: RoomSnapshot = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn client_messages_roundtrip() {
        let messages = vec![
            ClientMessage::QuickMatch {
                mode: GameMode::Pvp,
            },
            ClientMessage::CreateRoom {
                mode: GameMode::Pve,
                is_private: true,
            },
            ClientMessage::JoinByCode {
                code: "XY34".to_string(),
            },
            ClientMessage::Reconnect {
                code: "XY34".to_string(),
                token: "deadbeef".to_string(),
            },
            ClientMessage::Input {
                up: false,
                down: false,
                left: true,
                right: false,
            },
            ClientMessage::Bomb,
            ClientMessage::Ready,
            ClientMessage::Leave,
        ];
        for message in messages {
            let bytes = bincode::serialize(&message).unwrap();
            let decoded: ClientMessage = bincode::deserialize(&bytes).unwrap();
            assert_eq!(decoded, message);
        }
    }

    #[test]
    fn server_messages_roundtrip() {
        let messages = vec![
            ServerMessage::JoinAccepted {
                session_id: 3,
                player_id: 1,
                room_code: "AB2C".to_string(),
                token: "cafe".to_string(),
                snapshot: sample_snapshot(),
            },
            ServerMessage::JoinRejected {
                kind: JoinErrorKind::RoomLocked,
                hint: "room is full".to_string(),
            },
            ServerMessage::Snapshot(sample_snapshot()),
        ];
        for message in messages {
            let bytes = bincode::serialize(&message).unwrap();
            let decoded: ServerMessage = bincode::deserialize(&bytes).unwrap();
            assert_eq!(decoded, message);
        }
    }

    #[test]
    fn snapshot_preserves_entity_fields() {
        let snapshot = sample_snapshot();
        let bytes = bincode::serialize(&snapshot).unwrap();
        let decoded: RoomSnapshot = bincode::deserialize(&bytes).unwrap();

        let player = &decoded.players[0];
        assert_eq!(player.id, 1);
        assert_eq!(player.state, LifeState::Normal);
        assert_eq!(player.direction, Direction::Down);

        let bomb = &decoded.bombs[0];
        assert_eq!((bomb.grid_x, bomb.grid_y), (5, 6));
        assert_eq!(bomb.timer, 1800.0);

        assert_eq!(decoded.enemies[0].kind, EnemyKind::Balloon);
        assert_eq!(decoded.grid.len(), (crate::GRID_WIDTH * crate::GRID_HEIGHT) as usize);
    }
}
