//! Damage, rescue, and enemy kills.
//!
//! All player damage goes through the single [`hurt`] funnel: shield first,
//! then NORMAL → TRAPPED, then TRAPPED → DEAD. Invincibility windows gate
//! every check so nothing double-hits within one burst.

use bubble_shared::{
    entity::hitboxes_overlap, GameMode, LifeState, Player, ENEMY_HIT_INVINCIBLE_MS,
    HURT_INVINCIBLE_MS, RESCUE_INVINCIBLE_MS, TRAPPED_DURATION_MS,
};

use super::SimState;

/// Apply one hit to a player.
pub fn hurt(player: &mut Player) {
    if player.has_shield {
        player.has_shield = false;
        player.invincible_timer = HURT_INVINCIBLE_MS;
        return;
    }
    match player.state {
        LifeState::Normal => {
            player.state = LifeState::Trapped;
            player.trapped_timer = TRAPPED_DURATION_MS;
            player.invincible_timer = HURT_INVINCIBLE_MS;
        }
        LifeState::Trapped => {
            if player.invincible_timer <= 0.0 {
                player.state = LifeState::Dead;
            }
        }
        LifeState::Dead => {}
    }
}

/// One tick of combat resolution.
pub fn resolve(sim: &mut SimState, dt: f32) {
    // Explosion damage to players. An active invincibility window consumes
    // the whole tick.
    for player in &mut sim.players {
        if player.state == LifeState::Dead {
            continue;
        }
        if player.invincible_timer > 0.0 {
            player.invincible_timer -= dt;
            continue;
        }
        let cell = player.cell();
        if sim
            .explosions
            .iter()
            .any(|e| (e.grid_x, e.grid_y) == cell)
        {
            hurt(player);
        }
    }

    // Trapped players run out of time.
    for player in &mut sim.players {
        if player.state == LifeState::Trapped {
            player.trapped_timer -= dt;
            if player.trapped_timer <= 0.0 {
                player.state = LifeState::Dead;
            }
        }
    }

    if sim.mode == GameMode::Pve {
        resolve_enemy_damage(sim);
        resolve_contact_damage(sim);
    }

    resolve_rescue(sim);
}

/// Explosions hurt enemies; kills credit the explosion's owner.
fn resolve_enemy_damage(sim: &mut SimState) {
    let mut killed: Vec<(u32, u8)> = Vec::new();
    for enemy in &mut sim.enemies {
        if enemy.invincible_timer > 0.0 {
            continue;
        }
        let cell = enemy.cell();
        let Some(explosion) = sim
            .explosions
            .iter()
            .find(|e| (e.grid_x, e.grid_y) == cell)
        else {
            continue;
        };
        enemy.hp = enemy.hp.saturating_sub(1);
        enemy.invincible_timer = ENEMY_HIT_INVINCIBLE_MS;
        if enemy.hp == 0 {
            killed.push((enemy.id, explosion.owner_id));
        }
    }
    for (enemy_id, owner_id) in killed {
        sim.enemies.retain(|e| e.id != enemy_id);
        if owner_id > 0 {
            if let Some(player) = sim.player_mut(owner_id) {
                player.score += 1;
            }
        }
    }
}

/// Touching an enemy hurts.
fn resolve_contact_damage(sim: &mut SimState) {
    for player in &mut sim.players {
        if player.state == LifeState::Dead || player.invincible_timer > 0.0 {
            continue;
        }
        let touched = sim
            .enemies
            .iter()
            .any(|e| hitboxes_overlap(player.x, player.y, e.x, e.y));
        if touched {
            hurt(player);
        }
    }
}

/// A NORMAL teammate overlapping a TRAPPED one frees them on the spot.
fn resolve_rescue(sim: &mut SimState) {
    let ids: Vec<u8> = sim.players.iter().map(|p| p.id).collect();
    for i in 0..ids.len() {
        for j in (i + 1)..ids.len() {
            let a = sim.player(ids[i]).cloned();
            let b = sim.player(ids[j]).cloned();
            let (Some(a), Some(b)) = (a, b) else {
                continue;
            };
            if !hitboxes_overlap(a.x, a.y, b.x, b.y) {
                continue;
            }
            let rescued = match (a.state, b.state) {
                (LifeState::Normal, LifeState::Trapped) => Some(b.id),
                (LifeState::Trapped, LifeState::Normal) => Some(a.id),
                _ => None,
            };
            if let Some(id) = rescued {
                if let Some(player) = sim.player_mut(id) {
                    player.state = LifeState::Normal;
                    player.trapped_timer = 0.0;
                    player.invincible_timer = RESCUE_INVINCIBLE_MS;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normal_player() -> Player {
        Player::new(1, 54.0, 54.0)
    }

    #[test]
    fn hurt_consumes_shield_first() {
        let mut player = normal_player();
        player.has_shield = true;
        hurt(&mut player);
        assert!(!player.has_shield);
        assert_eq!(player.state, LifeState::Normal);
        assert_eq!(player.invincible_timer, HURT_INVINCIBLE_MS);
    }

    #[test]
    fn hurt_traps_then_kills() {
        let mut player = normal_player();
        hurt(&mut player);
        assert_eq!(player.state, LifeState::Trapped);
        assert_eq!(player.trapped_timer, TRAPPED_DURATION_MS);

        // Still invincible: a second hit does nothing.
        hurt(&mut player);
        assert_eq!(player.state, LifeState::Trapped);

        player.invincible_timer = 0.0;
        hurt(&mut player);
        assert_eq!(player.state, LifeState::Dead);
    }
}
