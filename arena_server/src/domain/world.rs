// Authoritative store for every live avatar and projectile.

use super::errors::WorldError;
use super::state::{
    Avatar, AvatarId, AvatarSnapshot, Intent, Projectile, ProjectileId, ProjectileSnapshot, Vec2,
};
use super::tuning::GameTuning;

use rand::{Rng, SeedableRng, rngs::StdRng};
use std::collections::BTreeMap;
use std::time::Instant;

/// Owns the avatar and projectile sets.
///
/// Maps are ordered by id, so iteration order (and therefore "first match wins" collision
/// resolution) is deterministic. Only the world task mutates a `World`.
pub struct World {
    tuning: GameTuning,
    pub(crate) avatars: BTreeMap<AvatarId, Avatar>,
    pub(crate) projectiles: BTreeMap<ProjectileId, Projectile>,
    next_projectile_id: ProjectileId,
    rng: StdRng,
}

impl World {
    pub fn new(tuning: GameTuning) -> Self {
        Self::with_rng(tuning, StdRng::from_entropy())
    }

    /// Deterministic spawn positions for a given seed.
    pub fn seeded(tuning: GameTuning, seed: u64) -> Self {
        Self::with_rng(tuning, StdRng::seed_from_u64(seed))
    }

    fn with_rng(tuning: GameTuning, rng: StdRng) -> Self {
        Self {
            tuning,
            avatars: BTreeMap::new(),
            projectiles: BTreeMap::new(),
            next_projectile_id: 1,
            rng,
        }
    }

    pub fn tuning(&self) -> &GameTuning {
        &self.tuning
    }

    pub fn avatar(&self, id: AvatarId) -> Option<&Avatar> {
        self.avatars.get(&id)
    }

    pub fn avatar_count(&self) -> usize {
        self.avatars.len()
    }

    pub fn projectile_count(&self) -> usize {
        self.projectiles.len()
    }

    /// Uniform point inside the world, inset by the avatar radius.
    pub(crate) fn random_spawn_point(&mut self) -> Vec2 {
        let radius = self.tuning.player.radius;
        let max = (self.tuning.arena.world_size - radius).max(radius);
        Vec2::new(
            self.rng.gen_range(radius..=max),
            self.rng.gen_range(radius..=max),
        )
    }

    pub fn add_avatar(
        &mut self,
        id: AvatarId,
        name: impl Into<String>,
    ) -> Result<AvatarSnapshot, WorldError> {
        if self.avatars.contains_key(&id) {
            return Err(WorldError::DuplicateAvatar(id));
        }

        let spawn = self.random_spawn_point();
        let player = self.tuning.player;
        let avatar = Avatar {
            id,
            name: name.into(),
            x: spawn.x,
            y: spawn.y,
            angle: 0.0,
            radius: player.radius,
            speed: player.speed,
            health: player.max_health,
            max_health: player.max_health,
            score: 0,
            kills: 0,
            deaths: 0,
            alive: true,
            respawn_at: None,
            intent: Intent::default(),
            last_shot_at: None,
        };
        let snapshot = AvatarSnapshot::from(&avatar);
        self.avatars.insert(id, avatar);
        Ok(snapshot)
    }

    /// Removes the avatar; projectiles it fired stay in flight.
    pub fn remove_avatar(&mut self, id: AvatarId) -> Option<Avatar> {
        self.avatars.remove(&id)
    }

    /// Updates only the supplied intent fields. Unknown ids are ignored.
    pub fn apply_intent(&mut self, id: AvatarId, movement: Option<Vec2>, aim: Option<f32>) {
        let Some(avatar) = self.avatars.get_mut(&id) else {
            return;
        };
        if let Some(movement) = movement {
            avatar.intent.movement = movement;
        }
        if let Some(aim) = aim {
            avatar.intent.aim = aim;
        }
    }

    /// Fires a projectile toward `target` if the owner is alive and off cooldown.
    ///
    /// A spawn point outside the world still consumes the cooldown but creates nothing.
    pub fn spawn_projectile(
        &mut self,
        owner_id: AvatarId,
        target: Option<Vec2>,
        now: Instant,
    ) -> Option<ProjectileSnapshot> {
        let tuning = self.tuning.projectile;
        let player_radius = self.tuning.player.radius;
        let world_size = self.tuning.arena.world_size;

        let owner = self.avatars.get_mut(&owner_id)?;
        if !owner.alive {
            return None;
        }
        if let Some(last) = owner.last_shot_at {
            if now.saturating_duration_since(last) < tuning.cooldown {
                return None;
            }
        }

        // Aim from the avatar toward the target; fall back to the current aim intent.
        let angle = target
            .and_then(|t| {
                let d = Vec2::new(t.x - owner.x, t.y - owner.y);
                d.normalized().map(|_| d.y.atan2(d.x))
            })
            .unwrap_or(owner.intent.aim);
        owner.last_shot_at = Some(now);

        // Spawn just outside the owner's circle so it never overlaps its shooter.
        let offset = player_radius + tuning.radius;
        let dir = Vec2::from_angle(angle);
        let (x, y) = (owner.x + dir.x * offset, owner.y + dir.y * offset);
        // Shooting into the wall: the shot is spent but nothing enters the world.
        if !(0.0..=world_size).contains(&x) || !(0.0..=world_size).contains(&y) {
            return None;
        }

        let id = self.next_projectile_id;
        self.next_projectile_id += 1;

        let projectile = Projectile {
            id,
            owner_id,
            x,
            y,
            angle,
            speed: tuning.speed,
            radius: tuning.radius,
            damage: tuning.damage,
            max_distance: tuning.max_distance,
            distance: 0.0,
        };
        let snapshot = ProjectileSnapshot::from(&projectile);
        self.projectiles.insert(id, projectile);
        Some(snapshot)
    }

    pub fn snapshot(&self) -> (Vec<AvatarSnapshot>, Vec<ProjectileSnapshot>) {
        (
            self.avatars.values().map(AvatarSnapshot::from).collect(),
            self.projectiles
                .values()
                .map(ProjectileSnapshot::from)
                .collect(),
        )
    }
}
