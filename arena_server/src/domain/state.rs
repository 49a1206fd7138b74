// Domain-level simulation entities and input/snapshot types.

use std::time::Instant;

pub type AvatarId = u64;
pub type ProjectileId = u64;

/// Plain 2D vector in world units (+X right, +Y down).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Unit vector in the same direction, or `None` for the zero vector.
    pub fn normalized(&self) -> Option<Vec2> {
        let len = self.length();
        if len == 0.0 || !len.is_finite() {
            None
        } else {
            Some(Vec2::new(self.x / len, self.y / len))
        }
    }

    pub fn from_angle(angle: f32) -> Vec2 {
        Vec2::new(angle.cos(), angle.sin())
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Last movement/aim instruction received from the avatar's client.
#[derive(Debug, Clone, Copy, Default)]
pub struct Intent {
    pub movement: Vec2,
    pub aim: f32,
}

pub struct Avatar {
    pub id: AvatarId,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub radius: f32,
    pub speed: f32, // units/s

    // Combat state.
    pub health: i32,
    pub max_health: i32,
    pub score: u32,
    pub kills: u32,
    pub deaths: u32,
    pub alive: bool,
    pub respawn_at: Option<Instant>,

    // Server-only state (do not serialize to clients)
    pub intent: Intent,
    pub last_shot_at: Option<Instant>,
}

impl Avatar {
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

pub struct Projectile {
    pub id: ProjectileId,
    pub owner_id: AvatarId,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub speed: f32, // units/s
    pub radius: f32,
    pub damage: i32,
    pub max_distance: f32,
    pub distance: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AvatarSnapshot {
    pub id: AvatarId,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub radius: f32,
    pub health: i32,
    pub max_health: i32,
    pub score: u32,
    pub kills: u32,
    pub deaths: u32,
    pub alive: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectileSnapshot {
    pub id: ProjectileId,
    pub owner_id: AvatarId,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub radius: f32,
}

impl From<&Avatar> for AvatarSnapshot {
    fn from(a: &Avatar) -> Self {
        Self {
            id: a.id,
            name: a.name.clone(),
            x: a.x,
            y: a.y,
            angle: a.angle,
            radius: a.radius,
            health: a.health,
            max_health: a.max_health,
            score: a.score,
            kills: a.kills,
            deaths: a.deaths,
            alive: a.alive,
        }
    }
}

impl From<&Projectile> for ProjectileSnapshot {
    fn from(p: &Projectile) -> Self {
        Self {
            id: p.id,
            owner_id: p.owner_id,
            x: p.x,
            y: p.y,
            angle: p.angle,
            radius: p.radius,
        }
    }
}

/// Combat transitions produced by a simulation step.
#[derive(Debug, Clone, PartialEq)]
pub enum CombatEvent {
    Hit {
        victim_id: AvatarId,
        attacker_id: AvatarId,
        projectile_id: ProjectileId,
        health: i32,
    },
    Killed {
        victim_id: AvatarId,
        // None when the shooter disconnected before the projectile landed.
        killer: Option<KillerStats>,
        victim_score: u32,
        victim_deaths: u32,
    },
    Respawned {
        avatar_id: AvatarId,
        x: f32,
        y: f32,
        health: i32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct KillerStats {
    pub id: AvatarId,
    pub score: u32,
    pub kills: u32,
}
