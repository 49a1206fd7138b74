//! Arena-wide rules: bounds and scoring.

use super::player::PlayerTuning;
use super::projectile::ProjectileTuning;

#[derive(Debug, Clone, Copy)]
pub struct ArenaTuning {
    /// Side length of the square world `[0, world_size]²`.
    pub world_size: f32,

    /// Score granted to the owner of a killing projectile.
    pub kill_reward: u32,

    /// Score removed from the victim on death (never below zero).
    pub death_penalty: u32,
}

impl Default for ArenaTuning {
    fn default() -> Self {
        Self {
            world_size: 2000.0,
            kill_reward: 100,
            death_penalty: 50,
        }
    }
}

/// Complete gameplay tuning handed to the world at startup.
#[derive(Debug, Clone, Copy, Default)]
pub struct GameTuning {
    pub arena: ArenaTuning,
    pub player: PlayerTuning,
    pub projectile: ProjectileTuning,
}
