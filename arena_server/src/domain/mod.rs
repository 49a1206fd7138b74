// Domain layer: core simulation types and rules.

pub mod errors;
pub mod simulation;
pub mod state;
pub mod systems;
pub mod tuning;
pub mod world;

#[cfg(test)]
pub(crate) mod test_support;

pub use errors::WorldError;
pub use state::{
    AvatarId, AvatarSnapshot, CombatEvent, KillerStats, ProjectileId, ProjectileSnapshot, Vec2,
};
pub use world::World;
