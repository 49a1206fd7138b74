//! Gameplay tuning for projectiles.

use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct ProjectileTuning {
    /// Travel speed in world units per second.
    pub speed: f32,

    /// Distance after which the projectile is retired.
    pub max_distance: f32,

    /// World-space collision radius.
    pub radius: f32,

    /// Health removed from the avatar it hits.
    pub damage: i32,

    /// Minimum wall-clock interval between two shots of one avatar.
    pub cooldown: Duration,
}

impl Default for ProjectileTuning {
    fn default() -> Self {
        Self {
            // 10 units per tick at 60 Hz.
            speed: 600.0,
            max_distance: 600.0,
            radius: 5.0,
            damage: 25,
            cooldown: Duration::from_millis(250),
        }
    }
}
