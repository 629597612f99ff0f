//! # Game Server Library
//!
//! Authoritative server for the bomb-placement arena. The process hosts many
//! independent match rooms; each room runs its own fixed-timestep simulation
//! on a cooperative tick worker, consumes compact input envelopes from its
//! sessions, and broadcasts a full authoritative snapshot after every tick.
//! Clients predict locally and reconcile against those snapshots; the server
//! never trusts a client beyond its inputs.
//!
//! ## Module Organization
//!
//! - [`game`] — the simulation itself: map generation, the collision-driven
//!   movement step, bombs and chained detonations, enemy AI, combat, level
//!   progression and win arbitration.
//! - [`room`] — one match room: phase state machine, session slots, the tick
//!   worker, reconnect grace, snapshot publishing.
//! - [`matchmaker`] — the room registry: codes, quick-match, join-by-code,
//!   disposal.
//! - [`session`] — per-client WebSocket gateway: handshake, envelope
//!   decoding, keep-alive, close semantics.
//! - [`http`] — the `/health` and `/online-stats` status endpoints.
//!
//! ## Concurrency model
//!
//! Inter-room isolation is a hard invariant: rooms share no mutable state
//! except the matchmaker registry, which is only touched on create, join and
//! dispose. Within a room everything is sequential — network I/O runs on
//! independent session tasks that deposit events into the room's bounded
//! queue, and the tick worker drains that queue at the top of each tick.

pub mod game;
pub mod http;
pub mod matchmaker;
pub mod room;
pub mod session;
pub mod utils;
