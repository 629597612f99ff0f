//! HTTP status surface.
//!
//! Two read-only endpoints served beside the WebSocket listener:
//!
//! - `GET /health` — liveness probe returning `{ status, timestamp }`.
//! - `GET /online-stats` — player/room counts plus per-room metadata.

use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use bubble_shared::GameMode;

use crate::matchmaker::Matchmaker;
use crate::utils;

/// Browser clients poll these endpoints cross-origin.
const CORS_ANY: [(header::HeaderName, &str); 1] = [(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")];

#[derive(Serialize)]
struct Health {
    status: &'static str,
    timestamp: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OnlineStats {
    total_players: usize,
    total_rooms: usize,
    rooms: Vec<RoomLine>,
    timestamp: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RoomLine {
    room_id: String,
    name: &'static str,
    mode: &'static str,
    players: usize,
    max_players: usize,
    is_private: bool,
}

fn mode_name(mode: GameMode) -> &'static str {
    match mode {
        GameMode::Pvp => "pvp",
        GameMode::Pve => "pve",
    }
}

pub fn router(matchmaker: Arc<Matchmaker>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/online-stats", get(online_stats))
        .with_state(matchmaker)
}

pub async fn serve(matchmaker: Arc<Matchmaker>, addr: &str) -> Result<(), std::io::Error> {
    let app = router(matchmaker);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

async fn health() -> ([(header::HeaderName, &'static str); 1], Json<Health>) {
    (
        CORS_ANY,
        Json(Health {
            status: "ok",
            timestamp: utils::unix_millis(),
        }),
    )
}

async fn online_stats(
    State(matchmaker): State<Arc<Matchmaker>>,
) -> ([(header::HeaderName, &'static str); 1], Json<OnlineStats>) {
    let (total_players, rooms) = matchmaker.overview().await;
    let rooms: Vec<RoomLine> = rooms
        .into_iter()
        .map(|r| RoomLine {
            room_id: r.room_id,
            name: r.name,
            mode: mode_name(r.mode),
            players: r.players,
            max_players: r.max_players,
            is_private: r.is_private,
        })
        .collect();
    (
        CORS_ANY,
        Json(OnlineStats {
            total_players,
            total_rooms: rooms.len(),
            rooms,
            timestamp: utils::unix_millis(),
        }),
    )
}
