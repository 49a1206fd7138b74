use std::time::Duration;

use crate::domain::state::AvatarId;
use crate::domain::tuning::{ArenaTuning, GameTuning, PlayerTuning, ProjectileTuning};
use crate::domain::world::World;

// Tick length used by domain tests; a power of two keeps per-tick steps exact in f32.
pub(crate) const DT: f32 = 1.0 / 16.0;

// Scenario tuning: 5 units/tick for avatars, 10 units/tick for projectiles at `DT`.
pub(crate) fn test_tuning() -> GameTuning {
    GameTuning {
        arena: ArenaTuning {
            world_size: 2000.0,
            kill_reward: 100,
            death_penalty: 50,
        },
        player: PlayerTuning {
            speed: 80.0,
            radius: 20.0,
            max_health: 100,
            respawn_delay: Duration::from_millis(3000),
        },
        projectile: ProjectileTuning {
            speed: 160.0,
            max_distance: 600.0,
            radius: 5.0,
            damage: 25,
            cooldown: Duration::from_millis(250),
        },
    }
}

pub(crate) fn test_world() -> World {
    World::seeded(test_tuning(), 7)
}

pub(crate) fn place(world: &mut World, id: AvatarId, x: f32, y: f32) {
    let avatar = world.avatars.get_mut(&id).expect("avatar should exist");
    avatar.x = x;
    avatar.y = y;
}
