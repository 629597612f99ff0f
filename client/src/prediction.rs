//! Client-side prediction and interpolation.
//!
//! The client keeps a locally predicted position for its own player only,
//! stepped every animation frame with the exact [`predict_move`] kernel the
//! server runs. On each authoritative snapshot the prediction reconciles:
//! a divergence beyond one tile snaps, anything less blends 30% of the way
//! toward the server (exponential smoothing).
//!
//! Everything else on screen — the other player, enemies, kicked bombs — is
//! interpolated toward its last-known authoritative position with a time
//! constant that covers 90% of the gap in ~100 ms regardless of frame rate.

use bubble_shared::collision::{predict_move, MoveOpts};
use bubble_shared::{Bomb, Grid, TICK_MS, TILE_SIZE};

/// Fraction of the divergence closed per snapshot when blending.
const RECONCILE_BLEND: f32 = 0.3;
/// Divergence beyond this snaps instead of blending, px.
const SNAP_DISTANCE: f32 = TILE_SIZE;
/// Remote entities cover 90% of the distance to their target in this long.
const INTERP_90_PCT_MS: f32 = 100.0;

/// Locally predicted own-player position.
#[derive(Debug, Clone, Copy)]
pub struct PredictedPlayer {
    pub x: f32,
    pub y: f32,
}

impl PredictedPlayer {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Advance the prediction by one animation frame against the most
    /// recently seen authoritative grid and bomb set.
    #[allow(clippy::too_many_arguments)]
    pub fn step(
        &mut self,
        grid: &Grid,
        bombs: &[Bomb],
        dx: f32,
        dy: f32,
        speed: f32,
        ghosting: bool,
        dt_ms: f32,
    ) {
        if dx == 0.0 && dy == 0.0 {
            return;
        }
        let opts = MoveOpts::for_player(ghosting, self.x, self.y);
        let step_px = speed * (dt_ms / TICK_MS);
        let (nx, ny) = predict_move(grid, bombs, self.x, self.y, dx, dy, step_px, &opts);
        self.x = nx;
        self.y = ny;
    }

    /// Fold an authoritative position into the prediction: snap when the
    /// divergence exceeds one tile, blend 30% toward the server otherwise.
    pub fn reconcile(&mut self, server_x: f32, server_y: f32) {
        let dx = server_x - self.x;
        let dy = server_y - self.y;
        let distance = (dx * dx + dy * dy).sqrt();
        if distance > SNAP_DISTANCE {
            self.x = server_x;
            self.y = server_y;
        } else {
            self.x += dx * RECONCILE_BLEND;
            self.y += dy * RECONCILE_BLEND;
        }
    }
}

/// Smoothed display position for a remote entity.
#[derive(Debug, Clone, Copy)]
pub struct InterpolatedEntity {
    pub x: f32,
    pub y: f32,
    target_x: f32,
    target_y: f32,
}

impl InterpolatedEntity {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            target_x: x,
            target_y: y,
        }
    }

    /// Record the latest authoritative position.
    pub fn set_target(&mut self, x: f32, y: f32) {
        self.target_x = x;
        self.target_y = y;
    }

    /// Move toward the target. The blend factor is derived from the elapsed
    /// frame time so the 90%-in-100ms time constant holds at any frame rate.
    pub fn update(&mut self, dt_ms: f32) {
        let remaining = 0.1_f32.powf(dt_ms / INTERP_90_PCT_MS);
        let factor = 1.0 - remaining;
        self.x += (self.target_x - self.x) * factor;
        self.y += (self.target_y - self.y) * factor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use bubble_shared::collision::aligned_pos;

    #[test]
    fn prediction_moves_like_the_server() {
        let grid = Grid::empty();
        let (x, y) = aligned_pos(1, 1);
        let mut predicted = PredictedPlayer::new(x, y);
        predicted.step(&grid, &[], 1.0, 0.0, 3.0, false, TICK_MS);
        assert_approx_eq!(predicted.x, x + 3.0, 1e-4);
        assert_approx_eq!(predicted.y, y, 1e-4);
    }

    #[test]
    fn small_divergence_blends_thirty_percent() {
        let mut predicted = PredictedPlayer::new(100.0, 100.0);
        predicted.reconcile(110.0, 100.0);
        assert_approx_eq!(predicted.x, 103.0, 1e-4);
        assert_approx_eq!(predicted.y, 100.0, 1e-4);
    }

    #[test]
    fn large_divergence_snaps() {
        let mut predicted = PredictedPlayer::new(100.0, 100.0);
        predicted.reconcile(100.0 + TILE_SIZE + 1.0, 100.0);
        assert_approx_eq!(predicted.x, 100.0 + TILE_SIZE + 1.0, 1e-4);
    }

    #[test]
    fn interpolation_hits_ninety_percent_in_hundred_ms() {
        let mut entity = InterpolatedEntity::new(0.0, 0.0);
        entity.set_target(100.0, 0.0);

        // One 100 ms frame.
        let mut one_frame = entity;
        one_frame.update(100.0);
        assert_approx_eq!(one_frame.x, 90.0, 0.01);

        // Ten 10 ms frames land on the same point: frame-rate independent.
        let mut ten_frames = entity;
        for _ in 0..10 {
            ten_frames.update(10.0);
        }
        assert_approx_eq!(ten_frames.x, 90.0, 0.01);
    }
}
