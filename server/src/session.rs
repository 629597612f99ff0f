//! Per-client WebSocket session.
//!
//! Each accepted socket gets one session task: it performs the join
//! handshake against the matchmaker, then pumps decoded envelopes into its
//! room's bounded event queue until the transport closes. A writer task
//! drains the session's outbound queue so the room's tick worker never
//! blocks on a slow socket.
//!
//! Liveness: the session pings every 3 seconds and treats 3 missed replies
//! as an abnormal drop, which parks the player slot in the reconnect grace.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::accept_async;

use bubble_shared::protocol::{ClientMessage, JoinErrorKind, ServerMessage};

use crate::game::InputFlags;
use crate::matchmaker::Matchmaker;
use crate::room::{JoinInfo, Room, RoomEvent};

/// Keep-alive cadence.
const PING_INTERVAL: Duration = Duration::from_secs(3);
/// Missed replies before the session is declared dead.
const MAX_MISSED_PONGS: u32 = 3;

/// How the receive loop ended.
enum Departure {
    Graceful,
    Abnormal,
}

pub async fn handle_connection(stream: TcpStream, addr: SocketAddr, matchmaker: Arc<Matchmaker>) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake with {} failed: {}", addr, e);
            return;
        }
    };
    debug!("WebSocket connection established: {}", addr);

    let (mut ws_sink, mut ws_source) = ws_stream.split();

    // Outbound queue: the room publishes snapshots here, the writer task
    // feeds them to the socket.
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
    let writer = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            let closing = matches!(message, Message::Close(_));
            if ws_sink.send(message).await.is_err() {
                break;
            }
            if closing {
                break;
            }
        }
        let _ = ws_sink.close().await;
    });

    // Handshake: the first envelope must be a matchmaking verb.
    let joined = match next_client_message(&mut ws_source).await {
        Some(message) => dispatch_join(&matchmaker, message, &outbound_tx).await,
        None => None,
    };
    let Some((room, join)) = joined else {
        // Rejection reply (if any) is already queued; close out.
        let _ = outbound_tx.send(Message::Close(Some(CloseFrame {
            code: CloseCode::Normal,
            reason: "".into(),
        })));
        let _ = writer.await;
        return;
    };

    // The room already queued the join-accept (under its lock, so it
    // precedes the first tick snapshot).
    let session_id = join.session_id;
    let departure = pump_session(&room, session_id, &mut ws_source, &outbound_tx).await;

    match departure {
        Departure::Graceful => {
            room.enqueue(RoomEvent::Leave { session_id });
            let _ = outbound_tx.send(Message::Close(Some(CloseFrame {
                code: CloseCode::Normal,
                reason: "bye".into(),
            })));
        }
        Departure::Abnormal => {
            room.enqueue(RoomEvent::Dropped { session_id });
        }
    }
    info!("session {} on {} ended", session_id, addr);
    // Release our sender so the writer drains and exits once the room drops
    // its copy (at the latest when the grace window expires).
    drop(outbound_tx);
    let _ = writer.await;
}

type WsSource = futures_util::stream::SplitStream<
    tokio_tungstenite::WebSocketStream<TcpStream>,
>;

async fn next_client_message(source: &mut WsSource) -> Option<ClientMessage> {
    while let Some(result) = source.next().await {
        match result {
            Ok(Message::Binary(data)) => match bincode::deserialize(&data) {
                Ok(message) => return Some(message),
                Err(e) => {
                    warn!("undecodable client frame: {}", e);
                    return None;
                }
            },
            Ok(Message::Close(_)) => return None,
            Ok(_) => continue,
            Err(_) => return None,
        }
    }
    None
}

async fn dispatch_join(
    matchmaker: &Arc<Matchmaker>,
    message: ClientMessage,
    outbound: &mpsc::UnboundedSender<Message>,
) -> Option<(Arc<Room>, JoinInfo)> {
    let attempt = match message {
        ClientMessage::QuickMatch { mode } => {
            let room = matchmaker.quick_match(mode).await;
            let result = room.join(outbound.clone()).await;
            Some((room, result))
        }
        ClientMessage::CreateRoom { mode, is_private } => {
            let room = matchmaker.create(mode, is_private).await;
            let result = room.join(outbound.clone()).await;
            Some((room, result))
        }
        ClientMessage::JoinByCode { code } => match matchmaker.lookup(&code).await {
            Some(room) => {
                let result = room.join(outbound.clone()).await;
                Some((room, result))
            }
            None => {
                reject(outbound, JoinErrorKind::NotFound, "no room with that code");
                None
            }
        },
        ClientMessage::Reconnect { code, token } => match matchmaker.lookup(&code).await {
            Some(room) => {
                let result = room.reconnect(&token, outbound.clone()).await;
                Some((room, result))
            }
            None => {
                reject(outbound, JoinErrorKind::NotFound, "no room with that code");
                None
            }
        },
        other => {
            debug!("expected a matchmaking verb, got {:?}", other);
            None
        }
    };

    match attempt {
        Some((room, Ok(join))) => Some((room, join)),
        Some((_, Err(kind))) => {
            reject(outbound, kind, hint_for(kind));
            None
        }
        None => None,
    }
}

fn hint_for(kind: JoinErrorKind) -> &'static str {
    match kind {
        JoinErrorKind::NotFound => "no room with that code",
        JoinErrorKind::RoomLocked => "room is full",
        JoinErrorKind::AlreadyStarted => "match already started",
        JoinErrorKind::BadToken => "reconnect token not recognized",
    }
}

fn reject(outbound: &mpsc::UnboundedSender<Message>, kind: JoinErrorKind, hint: &str) {
    send_message(
        outbound,
        &ServerMessage::JoinRejected {
            kind,
            hint: hint.to_string(),
        },
    );
}

fn send_message(outbound: &mpsc::UnboundedSender<Message>, message: &ServerMessage) {
    match bincode::serialize(message) {
        Ok(bytes) => {
            let _ = outbound.send(Message::Binary(bytes));
        }
        Err(e) => warn!("failed to encode server message: {}", e),
    }
}

/// Main receive loop: decoded envelopes become room events; pings keep the
/// link honest.
async fn pump_session(
    room: &Arc<Room>,
    session_id: u64,
    source: &mut WsSource,
    outbound: &mpsc::UnboundedSender<Message>,
) -> Departure {
    let mut ping_timer = tokio::time::interval(PING_INTERVAL);
    ping_timer.tick().await; // first tick completes immediately
    let mut missed_pongs: u32 = 0;

    loop {
        tokio::select! {
            incoming = source.next() => {
                let message = match incoming {
                    Some(Ok(message)) => message,
                    Some(Err(e)) => {
                        debug!("session {}: transport error: {}", session_id, e);
                        return Departure::Abnormal;
                    }
                    None => return Departure::Abnormal,
                };
                match message {
                    Message::Binary(data) => {
                        match bincode::deserialize::<ClientMessage>(&data) {
                            Ok(decoded) => {
                                if !handle_client_message(room, session_id, decoded) {
                                    return Departure::Graceful;
                                }
                            }
                            Err(e) => {
                                debug!("session {}: bad frame: {}", session_id, e);
                            }
                        }
                    }
                    Message::Ping(payload) => {
                        let _ = outbound.send(Message::Pong(payload));
                    }
                    Message::Pong(_) => {
                        missed_pongs = 0;
                    }
                    Message::Close(frame) => {
                        let normal = frame
                            .as_ref()
                            .map(|f| f.code == CloseCode::Normal)
                            .unwrap_or(false);
                        return if normal {
                            Departure::Graceful
                        } else {
                            Departure::Abnormal
                        };
                    }
                    _ => {}
                }
            }
            _ = ping_timer.tick() => {
                if missed_pongs >= MAX_MISSED_PONGS {
                    debug!("session {}: {} missed pongs, dropping", session_id, missed_pongs);
                    return Departure::Abnormal;
                }
                missed_pongs += 1;
                let _ = outbound.send(Message::Ping(Vec::new()));
            }
        }
    }
}

/// Returns false when the session asked to leave.
fn handle_client_message(room: &Arc<Room>, session_id: u64, message: ClientMessage) -> bool {
    match message {
        ClientMessage::Input {
            up,
            down,
            left,
            right,
        } => {
            room.enqueue(RoomEvent::Input {
                session_id,
                flags: InputFlags {
                    up,
                    down,
                    left,
                    right,
                },
            });
            true
        }
        ClientMessage::Bomb => {
            room.enqueue(RoomEvent::Bomb { session_id });
            true
        }
        ClientMessage::Ready => {
            room.enqueue(RoomEvent::Ready { session_id });
            true
        }
        ClientMessage::Leave => false,
        other => {
            debug!("session {}: unexpected envelope {:?}", session_id, other);
            true
        }
    }
}
