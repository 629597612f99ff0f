//! Room registry and matchmaking verbs.
//!
//! The registry is the one structure shared across workers (session accept
//! path and room-dispose path). It is only mutated on create, join and
//! dispose. Lock discipline: never hold the registry lock while taking a
//! room's inner lock — rooms dispose themselves by flagging `disposed` under
//! their own lock first and only then removing their registry entry, so a
//! join that already fetched the `Arc` observes the room as absent-or-closed,
//! never torn.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::info;
use tokio::sync::Mutex;

use bubble_shared::{GameMode, Phase, ROOM_CAPACITY};

use crate::room::{close_all_sessions, Room};
use crate::utils;

use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

/// Public lobby names, one per game mode.
pub fn lobby_name(mode: GameMode) -> &'static str {
    match mode {
        GameMode::Pvp => "bubble_pvp",
        GameMode::Pve => "bubble_pve",
    }
}

/// Per-room line of the stats endpoint.
pub struct RoomOverview {
    pub room_id: String,
    pub name: &'static str,
    pub mode: GameMode,
    pub players: usize,
    pub max_players: usize,
    pub is_private: bool,
}

pub struct Matchmaker {
    rooms: Mutex<HashMap<String, Arc<Room>>>,
    tick_interval: Duration,
}

impl Matchmaker {
    pub fn new(tick_interval: Duration) -> Arc<Self> {
        Arc::new(Self {
            rooms: Mutex::new(HashMap::new()),
            tick_interval,
        })
    }

    /// Mint a fresh room with a unique code.
    pub async fn create(self: &Arc<Self>, mode: GameMode, is_private: bool) -> Arc<Room> {
        let mut rooms = self.rooms.lock().await;
        let code = loop {
            let candidate = utils::random_room_code();
            if !rooms.contains_key(&candidate) {
                break candidate;
            }
        };
        let room = Room::create(
            code.clone(),
            mode,
            is_private,
            self.tick_interval,
            Arc::clone(self),
        );
        rooms.insert(code, Arc::clone(&room));
        room
    }

    /// Look up a room by code. Codes are case-insensitive on the wire.
    pub async fn lookup(&self, code: &str) -> Option<Arc<Room>> {
        let rooms = self.rooms.lock().await;
        rooms.get(&code.to_ascii_uppercase()).cloned()
    }

    /// First open public WAITING room of the mode, else a fresh one.
    pub async fn quick_match(self: &Arc<Self>, mode: GameMode) -> Arc<Room> {
        let candidates: Vec<Arc<Room>> = {
            let rooms = self.rooms.lock().await;
            rooms
                .values()
                .filter(|r| r.mode == mode && !r.is_private)
                .cloned()
                .collect()
        };
        for room in candidates {
            let (phase, sessions, disposed) = room.meta().await;
            if !disposed && phase == Phase::Waiting && sessions < ROOM_CAPACITY {
                return room;
            }
        }
        self.create(mode, false).await
    }

    /// Remove a disposed room from the registry.
    pub async fn remove(&self, code: &str) {
        let mut rooms = self.rooms.lock().await;
        rooms.remove(code);
    }

    /// Aggregate view for the HTTP status surface. Room metadata is
    /// queryable without joining.
    pub async fn overview(&self) -> (usize, Vec<RoomOverview>) {
        let rooms: Vec<Arc<Room>> = {
            let registry = self.rooms.lock().await;
            registry.values().cloned().collect()
        };
        let mut total_players = 0;
        let mut lines = Vec::with_capacity(rooms.len());
        for room in rooms {
            let (_, sessions, disposed) = room.meta().await;
            if disposed {
                continue;
            }
            total_players += sessions;
            lines.push(RoomOverview {
                room_id: room.code.clone(),
                name: lobby_name(room.mode),
                mode: room.mode,
                players: sessions,
                max_players: ROOM_CAPACITY,
                is_private: room.is_private,
            });
        }
        (total_players, lines)
    }

    /// Process shutdown: close every session with a normal code so clients
    /// know not to reconnect.
    pub async fn shutdown(&self) {
        let rooms: Vec<Arc<Room>> = {
            let registry = self.rooms.lock().await;
            registry.values().cloned().collect()
        };
        info!("shutting down, closing {} room(s)", rooms.len());
        for room in rooms {
            close_all_sessions(&room, CloseCode::Normal, "server shutting down").await;
        }
    }
}
