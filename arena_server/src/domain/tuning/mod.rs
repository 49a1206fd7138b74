pub mod arena;
pub mod player;
pub mod projectile;

pub use arena::{ArenaTuning, GameTuning};
pub use player::PlayerTuning;
pub use projectile::ProjectileTuning;
