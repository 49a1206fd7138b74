pub mod collision;
pub mod combat;
pub mod movement;
pub mod projectiles;

pub use collision::{BruteForceDetector, CollisionDetector, Hit};
