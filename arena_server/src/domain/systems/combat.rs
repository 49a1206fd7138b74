// Damage, scoring, and the death/respawn state machine.

use super::collision::Hit;
use crate::domain::state::{AvatarId, CombatEvent, KillerStats};
use crate::domain::world::World;
use std::time::Instant;
use tracing::{debug, info};

/// Applies every hit in order. Kill bookkeeping (victim death, owner reward) lands in the same
/// step as the Alive -> Dead transition.
pub fn resolve_hits(world: &mut World, hits: &[Hit], now: Instant) -> Vec<CombatEvent> {
    let arena = world.tuning().arena;
    let respawn_delay = world.tuning().player.respawn_delay;
    let mut events = Vec::new();

    for hit in hits {
        let Some(victim) = world.avatars.get_mut(&hit.avatar_id) else {
            continue;
        };
        // A second projectile in the same tick may find an avatar that just died.
        if !victim.alive {
            debug!(
                victim_id = hit.avatar_id,
                projectile_id = hit.projectile_id,
                "hit on dead avatar ignored"
            );
            continue;
        }

        victim.health -= hit.damage;
        let killed = victim.health <= 0;
        if killed {
            victim.health = 0;
            victim.alive = false;
            victim.respawn_at = Some(now + respawn_delay);
            victim.deaths += 1;
            victim.score = victim.score.saturating_sub(arena.death_penalty);
        }
        let (health, victim_score, victim_deaths) = (victim.health, victim.score, victim.deaths);

        info!(
            victim_id = hit.avatar_id,
            shooter_id = hit.owner_id,
            projectile_id = hit.projectile_id,
            victim_hp = health,
            "player hit"
        );
        events.push(CombatEvent::Hit {
            victim_id: hit.avatar_id,
            attacker_id: hit.owner_id,
            projectile_id: hit.projectile_id,
            health,
        });

        if !killed {
            continue;
        }

        let killer = credit_kill(world, hit.owner_id, hit.avatar_id, arena.kill_reward);
        info!(
            victim_id = hit.avatar_id,
            killer_id = ?killer.as_ref().map(|k| k.id),
            "player killed"
        );
        events.push(CombatEvent::Killed {
            victim_id: hit.avatar_id,
            killer,
            victim_score,
            victim_deaths,
        });
    }

    events
}

// The shooter may have disconnected while its projectile was in flight.
fn credit_kill(
    world: &mut World,
    owner_id: AvatarId,
    victim_id: AvatarId,
    reward: u32,
) -> Option<KillerStats> {
    if owner_id == victim_id {
        return None;
    }
    let owner = world.avatars.get_mut(&owner_id)?;
    owner.score = owner.score.saturating_add(reward);
    owner.kills += 1;
    Some(KillerStats {
        id: owner.id,
        score: owner.score,
        kills: owner.kills,
    })
}

/// Brings back every dead avatar whose respawn deadline has passed.
pub fn respawn_due(world: &mut World, now: Instant) -> Vec<CombatEvent> {
    let due: Vec<AvatarId> = world
        .avatars
        .values()
        .filter(|a| !a.alive && a.respawn_at.is_some_and(|at| at <= now))
        .map(|a| a.id)
        .collect();

    let mut events = Vec::with_capacity(due.len());
    for id in due {
        let spawn = world.random_spawn_point();
        let Some(avatar) = world.avatars.get_mut(&id) else {
            continue;
        };
        avatar.x = spawn.x;
        avatar.y = spawn.y;
        avatar.health = avatar.max_health;
        avatar.alive = true;
        avatar.respawn_at = None;

        info!(player_id = id, "player respawned");
        events.push(CombatEvent::Respawned {
            avatar_id: id,
            x: avatar.x,
            y: avatar.y,
            health: avatar.health,
        });
    }

    events
}
