use crate::domain::state::{Avatar, AvatarId, Projectile, ProjectileId};

/// One projectile/avatar contact found during a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub avatar_id: AvatarId,
    pub projectile_id: ProjectileId,
    pub owner_id: AvatarId,
    pub damage: i32,
}

/// Circle overlap test between a live, non-owner avatar and a projectile.
pub fn collides(avatar: &Avatar, projectile: &Projectile) -> bool {
    if !avatar.alive || avatar.id == projectile.owner_id {
        return false;
    }

    let dx = avatar.x - projectile.x;
    let dy = avatar.y - projectile.y;
    let reach = avatar.radius + projectile.radius;
    dx * dx + dy * dy < reach * reach
}

/// Finds the hits for one tick. At most one hit per projectile.
///
/// Implementations may keep internal acceleration structures (e.g. a uniform grid), which is
/// why `detect` takes `&mut self`.
pub trait CollisionDetector {
    fn detect(&mut self, avatars: &[&Avatar], projectiles: &[&Projectile]) -> Vec<Hit>;
}

/// Naive O(avatars * projectiles) scan. First avatar in slice order wins.
#[derive(Debug, Default, Clone, Copy)]
pub struct BruteForceDetector;

impl CollisionDetector for BruteForceDetector {
    fn detect(&mut self, avatars: &[&Avatar], projectiles: &[&Projectile]) -> Vec<Hit> {
        projectiles
            .iter()
            .filter_map(|p| {
                avatars
                    .iter()
                    .find(|a| collides(a, p))
                    .map(|a| Hit {
                        avatar_id: a.id,
                        projectile_id: p.id,
                        owner_id: p.owner_id,
                        damage: p.damage,
                    })
            })
            .collect()
    }
}
