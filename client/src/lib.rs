//! # Netcode Client Library
//!
//! Headless client half of the prediction contract. A frontend embeds this
//! crate and brings its own rendering and input sampling; everything that
//! must agree with the server — movement geometry, reconciliation blending,
//! interpolation time constants, reconnect policy — lives here.
//!
//! - [`input::InputTracker`] — edge-triggered input transmission: a movement
//!   envelope goes out only when the held-key set changes.
//! - [`prediction::PredictedPlayer`] — local prediction for the own player
//!   using the shared [`bubble_shared::collision::predict_move`] kernel,
//!   plus snap-or-blend reconciliation against authoritative snapshots.
//! - [`prediction::InterpolatedEntity`] — frame-rate independent smoothing
//!   for remote players, enemies, and sliding bombs.
//! - [`network::Connection`] — bincode-over-WebSocket transport with the
//!   three-attempt exponential backoff reconnect policy.

pub mod input;
pub mod network;
pub mod prediction;
