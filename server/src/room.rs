//! One match room: phase machine, session slots, tick worker, snapshots.
//!
//! Every room owns a single cooperative tick task. All state transitions
//! happen inside that task in canonical order: inbound events are drained at
//! the top of each tick (a session close therefore removes its slot at the
//! start of the next tick, never mid-tick), the simulation steps, and the
//! snapshot for that tick is fanned out to every attached session before the
//! worker sleeps again. Rooms share nothing with each other except the
//! matchmaker registry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

use bubble_shared::protocol::{JoinErrorKind, RoomSnapshot, ServerMessage, CLOSE_ROOM_DISPOSED};
use bubble_shared::{GameMode, LifeState, Phase, Winner, ROOM_CAPACITY};

use crate::game::{InputFlags, SimState, Verdict};
use crate::matchmaker::Matchmaker;
use crate::utils;

/// Pre-match countdown, seconds.
pub const COUNTDOWN_SECS: f32 = 3.0;
/// How long a dropped session's slot is held for reconnect.
pub const RECONNECT_GRACE: Duration = Duration::from_secs(10);
/// An empty room that nobody ever joined is reaped after this long.
const UNCLAIMED_TTL: Duration = Duration::from_secs(30);
/// A finished room nobody restarts is torn down after this long; attached
/// sessions are closed with the gameplay-terminal code.
const FINISHED_TTL: Duration = Duration::from_secs(60);
/// Bounded inbound queue per room; the worker drains it at each tick top.
const EVENT_QUEUE_DEPTH: usize = 256;

/// Events deposited by session tasks, consumed by the tick worker.
#[derive(Debug)]
pub enum RoomEvent {
    Input { session_id: u64, flags: InputFlags },
    Bomb { session_id: u64 },
    Ready { session_id: u64 },
    /// Explicit leave; the slot is released at the next tick.
    Leave { session_id: u64 },
    /// Abnormal transport close; the slot enters the reconnect grace.
    Dropped { session_id: u64 },
}

/// One attached (or grace-held) session.
pub struct SessionSlot {
    pub player_id: u8,
    pub token: String,
    /// Sender into the session's outbound WebSocket queue. `None` while the
    /// session is disconnected and inside the grace window.
    pub outbound: Option<mpsc::UnboundedSender<Message>>,
    pub disconnected_at: Option<Instant>,
}

pub struct RoomInner {
    pub sim: SimState,
    pub phase: Phase,
    pub countdown: f32,
    pub tick: u64,
    pub sessions: HashMap<u64, SessionSlot>,
    pub next_session_id: u64,
    pub ever_joined: bool,
    pub disposed: bool,
    /// Set when the phase reaches FINISHED; cleared by a restart.
    pub finished_at: Option<Instant>,
}

/// Everything a successful join hands back to the session task.
#[derive(Debug)]
pub struct JoinInfo {
    pub session_id: u64,
    pub player_id: u8,
    pub token: String,
    pub snapshot: RoomSnapshot,
}

pub struct Room {
    pub code: String,
    pub mode: GameMode,
    pub is_private: bool,
    pub inner: Mutex<RoomInner>,
    created_at: Instant,
    events_tx: mpsc::Sender<RoomEvent>,
}

impl Room {
    /// Build the room and spawn its tick worker.
    pub fn create(
        code: String,
        mode: GameMode,
        is_private: bool,
        tick_interval: Duration,
        matchmaker: Arc<Matchmaker>,
    ) -> Arc<Room> {
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
        let room = Arc::new(Room {
            code: code.clone(),
            mode,
            is_private,
            inner: Mutex::new(RoomInner {
                sim: SimState::new(mode, utils::creation_seed()),
                phase: Phase::Waiting,
                countdown: 0.0,
                tick: 0,
                sessions: HashMap::new(),
                next_session_id: 1,
                ever_joined: false,
                disposed: false,
                finished_at: None,
            }),
            created_at: Instant::now(),
            events_tx,
        });
        tokio::spawn(run_room(Arc::clone(&room), events_rx, tick_interval, matchmaker));
        info!("room {} created ({:?}, private: {})", code, mode, is_private);
        room
    }

    /// Deposit an event into the bounded per-room queue. A full queue drops
    /// the event; input is advisory and the client will resend on change.
    pub fn enqueue(&self, event: RoomEvent) {
        if self.events_tx.try_send(event).is_err() {
            debug!("room {}: input queue full, dropping event", self.code);
        }
    }

    /// Attach a new session. Fails if the room has started, is full, or was
    /// disposed between lookup and join.
    pub async fn join(&self, outbound: mpsc::UnboundedSender<Message>) -> Result<JoinInfo, JoinErrorKind> {
        let mut inner = self.inner.lock().await;
        if inner.disposed {
            return Err(JoinErrorKind::NotFound);
        }
        if inner.phase != Phase::Waiting {
            return Err(JoinErrorKind::AlreadyStarted);
        }
        if inner.sessions.len() >= ROOM_CAPACITY {
            return Err(JoinErrorKind::RoomLocked);
        }

        let player_id = next_free_slot(&inner);
        let session_id = inner.next_session_id;
        inner.next_session_id += 1;
        let token = utils::random_token();

        inner.sim.add_player(player_id);
        inner.sessions.insert(
            session_id,
            SessionSlot {
                player_id,
                token: token.clone(),
                outbound: Some(outbound.clone()),
                disconnected_at: None,
            },
        );
        inner.ever_joined = true;

        // Reaching capacity locks the room and starts the countdown.
        if inner.sessions.len() >= ROOM_CAPACITY {
            inner.phase = Phase::Countdown;
            inner.countdown = COUNTDOWN_SECS;
        }

        info!(
            "room {}: session {} joined as player {}",
            self.code, session_id, player_id
        );
        let snapshot = build_snapshot(self, &inner);
        // Sent under the lock so the acceptance precedes any tick snapshot.
        send_join_accepted(self, &outbound, session_id, player_id, &token, &snapshot);
        Ok(JoinInfo {
            session_id,
            player_id,
            token,
            snapshot,
        })
    }

    /// Re-bind a session that dropped mid-match, identified by its token.
    pub async fn reconnect(
        &self,
        token: &str,
        outbound: mpsc::UnboundedSender<Message>,
    ) -> Result<JoinInfo, JoinErrorKind> {
        let mut inner = self.inner.lock().await;
        if inner.disposed {
            return Err(JoinErrorKind::NotFound);
        }
        let Some((&session_id, _)) = inner
            .sessions
            .iter()
            .find(|(_, slot)| slot.token == token && slot.disconnected_at.is_some())
        else {
            return Err(JoinErrorKind::BadToken);
        };
        let slot = inner
            .sessions
            .get_mut(&session_id)
            .ok_or(JoinErrorKind::BadToken)?;
        slot.outbound = Some(outbound.clone());
        slot.disconnected_at = None;
        let player_id = slot.player_id;
        let token = slot.token.clone();
        info!(
            "room {}: session {} reconnected as player {}",
            self.code, session_id, player_id
        );
        let snapshot = build_snapshot(self, &inner);
        send_join_accepted(self, &outbound, session_id, player_id, &token, &snapshot);
        Ok(JoinInfo {
            session_id,
            player_id,
            token,
            snapshot,
        })
    }

    /// (phase, attached sessions, disposed) — what quick-match and the stats
    /// endpoint need without joining.
    pub async fn meta(&self) -> (Phase, usize, bool) {
        let inner = self.inner.lock().await;
        (inner.phase, inner.sessions.len(), inner.disposed)
    }
}

fn next_free_slot(inner: &RoomInner) -> u8 {
    let taken: Vec<u8> = inner.sessions.values().map(|s| s.player_id).collect();
    if taken.contains(&1) {
        2
    } else {
        1
    }
}

fn send_join_accepted(
    room: &Room,
    outbound: &mpsc::UnboundedSender<Message>,
    session_id: u64,
    player_id: u8,
    token: &str,
    snapshot: &RoomSnapshot,
) {
    let accept = ServerMessage::JoinAccepted {
        session_id,
        player_id,
        room_code: room.code.clone(),
        token: token.to_string(),
        snapshot: snapshot.clone(),
    };
    match bincode::serialize(&accept) {
        Ok(bytes) => {
            let _ = outbound.send(Message::Binary(bytes));
        }
        Err(e) => warn!("room {}: join-accept encode failed: {}", room.code, e),
    }
}

fn build_snapshot(room: &Room, inner: &RoomInner) -> RoomSnapshot {
    RoomSnapshot {
        tick: inner.tick,
        phase: inner.phase,
        game_mode: room.mode,
        room_code: room.code.clone(),
        is_private: room.is_private,
        countdown: inner.countdown,
        time_left: inner.sim.time_left,
        level: inner.sim.level as u32 + 1,
        winner: inner.sim.winner,
        boss_spawned: inner.sim.boss_spawned,
        grid: inner.sim.grid.flatten(),
        items: inner.sim.items.clone(),
        players: inner.sim.players.clone(),
        bombs: inner.sim.bombs.clone(),
        explosions: inner.sim.explosions.clone(),
        enemies: inner.sim.enemies.clone(),
    }
}

async fn run_room(
    room: Arc<Room>,
    mut events: mpsc::Receiver<RoomEvent>,
    tick_interval: Duration,
    matchmaker: Arc<Matchmaker>,
) {
    let mut interval = tokio::time::interval(tick_interval);
    let mut last_tick = Instant::now();

    loop {
        interval.tick().await;
        let now = Instant::now();
        let dt = now.duration_since(last_tick).as_secs_f32() * 1000.0;
        last_tick = now;

        let mut inner = room.inner.lock().await;

        while let Ok(event) = events.try_recv() {
            handle_event(&room, &mut inner, event);
        }
        expire_reconnect_grace(&room, &mut inner);

        match inner.phase {
            Phase::Waiting | Phase::LevelClear | Phase::Finished => {}
            Phase::Countdown => {
                inner.countdown -= dt / 1000.0;
                if inner.countdown <= 0.0 {
                    inner.countdown = 0.0;
                    inner.phase = Phase::Playing;
                    info!("room {}: match started", room.code);
                }
            }
            Phase::Playing => match inner.sim.step(dt) {
                Verdict::Continue => {}
                Verdict::LevelClear => {
                    inner.phase = Phase::LevelClear;
                    info!("room {}: level {} clear", room.code, inner.sim.level + 1);
                }
                Verdict::Finished(winner) => {
                    inner.phase = Phase::Finished;
                    inner.finished_at = Some(Instant::now());
                    info!(
                        "room {}: finished, winner code {}",
                        room.code,
                        winner.code()
                    );
                }
            },
        }

        publish_snapshot(&room, &inner);
        inner.tick += 1;

        // A finished match nobody restarts winds the room down; attached
        // sessions learn via a gameplay-terminal close code.
        let stale_finish = inner
            .finished_at
            .map(|at| at.elapsed() > FINISHED_TTL)
            .unwrap_or(false);
        if stale_finish {
            for slot in inner.sessions.values() {
                if let Some(outbound) = &slot.outbound {
                    let _ = outbound.send(Message::Close(Some(CloseFrame {
                        code: disposed_close_code(),
                        reason: "room closed".into(),
                    })));
                }
            }
            inner.sessions.clear();
        }

        let unclaimed = !inner.ever_joined && room.created_at.elapsed() > UNCLAIMED_TTL;
        if inner.sessions.is_empty() && (inner.ever_joined || unclaimed) {
            inner.disposed = true;
            drop(inner);
            matchmaker.remove(&room.code).await;
            info!("room {} disposed", room.code);
            return;
        }
    }
}

fn handle_event(room: &Room, inner: &mut RoomInner, event: RoomEvent) {
    match event {
        RoomEvent::Input { session_id, flags } => {
            if let Some(slot) = inner.sessions.get(&session_id) {
                let player_id = slot.player_id;
                inner.sim.set_input(player_id, flags);
            }
        }
        RoomEvent::Bomb { session_id } => {
            if let Some(slot) = inner.sessions.get(&session_id) {
                let player_id = slot.player_id;
                inner.sim.queue_bomb(player_id);
            }
        }
        RoomEvent::Ready { session_id } => {
            if !inner.sessions.contains_key(&session_id) {
                return;
            }
            match inner.phase {
                // PVE can start single-player on an explicit ready; PVP
                // starts via the capacity lock.
                Phase::Waiting if room.mode == GameMode::Pve && !inner.sessions.is_empty() => {
                    inner.phase = Phase::Countdown;
                    inner.countdown = COUNTDOWN_SECS;
                }
                Phase::LevelClear => {
                    inner.sim.advance_level();
                    inner.phase = Phase::Playing;
                    info!("room {}: advancing to level {}", room.code, inner.sim.level + 1);
                }
                Phase::Finished => {
                    inner.sim.restart();
                    inner.phase = Phase::Countdown;
                    inner.countdown = COUNTDOWN_SECS;
                    inner.finished_at = None;
                    info!("room {}: restarting match", room.code);
                }
                _ => {}
            }
        }
        RoomEvent::Leave { session_id } => {
            release_session(room, inner, session_id, "left");
        }
        RoomEvent::Dropped { session_id } => {
            if let Some(slot) = inner.sessions.get_mut(&session_id) {
                slot.outbound = None;
                slot.disconnected_at = Some(Instant::now());
                info!(
                    "room {}: session {} dropped, holding slot for reconnect",
                    room.code, session_id
                );
            }
        }
    }
}

fn expire_reconnect_grace(room: &Room, inner: &mut RoomInner) {
    let expired: Vec<u64> = inner
        .sessions
        .iter()
        .filter(|(_, slot)| {
            slot.disconnected_at
                .map(|at| at.elapsed() > RECONNECT_GRACE)
                .unwrap_or(false)
        })
        .map(|(&id, _)| id)
        .collect();
    for session_id in expired {
        release_session(room, inner, session_id, "reconnect window expired");
    }
}

/// Remove a session and its player, then arbitrate an in-flight match that
/// lost a contestant: in PVP the remaining player wins; with nobody left the
/// room finishes without a winner.
fn release_session(room: &Room, inner: &mut RoomInner, session_id: u64, why: &str) {
    let Some(slot) = inner.sessions.remove(&session_id) else {
        return;
    };
    inner.sim.remove_player(slot.player_id);
    info!(
        "room {}: session {} ({}) released: {}",
        room.code, session_id, slot.player_id, why
    );

    // Losing a contestant before the match starts unlocks the room.
    if inner.phase == Phase::Countdown && inner.sessions.len() < ROOM_CAPACITY {
        inner.phase = Phase::Waiting;
        inner.countdown = 0.0;
        return;
    }
    if inner.phase != Phase::Playing {
        return;
    }
    let remaining: Vec<u8> = inner
        .sessions
        .values()
        .map(|s| s.player_id)
        .collect();
    if remaining.is_empty() {
        inner.phase = Phase::Finished;
        inner.finished_at = Some(Instant::now());
        inner.sim.winner = Winner::None;
    } else if room.mode == GameMode::Pvp && remaining.len() == 1 {
        let survivor_alive = inner
            .sim
            .player(remaining[0])
            .map(|p| p.state != LifeState::Dead)
            .unwrap_or(false);
        let winner = if survivor_alive {
            Winner::Player(remaining[0])
        } else {
            Winner::None
        };
        inner.phase = Phase::Finished;
        inner.finished_at = Some(Instant::now());
        inner.sim.winner = winner;
    }
}

fn publish_snapshot(room: &Room, inner: &RoomInner) {
    let snapshot = build_snapshot(room, inner);
    let message = ServerMessage::Snapshot(snapshot);
    let bytes = match bincode::serialize(&message) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("room {}: snapshot encode failed: {}", room.code, e);
            return;
        }
    };
    for slot in inner.sessions.values() {
        if let Some(outbound) = &slot.outbound {
            let _ = outbound.send(Message::Binary(bytes.clone()));
        }
    }
}

/// Close every attached session with the given code: normal closure on
/// process shutdown ("do not reconnect"), a gameplay-terminal code when a
/// room is force-closed.
pub async fn close_all_sessions(room: &Room, code: CloseCode, reason: &str) {
    let inner = room.inner.lock().await;
    for slot in inner.sessions.values() {
        if let Some(outbound) = &slot.outbound {
            let _ = outbound.send(Message::Close(Some(CloseFrame {
                code,
                reason: reason.to_string().into(),
            })));
        }
    }
}

/// Close code for a room torn down under a live session, from the
/// gameplay-terminal range.
pub fn disposed_close_code() -> CloseCode {
    CloseCode::Library(CLOSE_ROOM_DISPOSED)
}
