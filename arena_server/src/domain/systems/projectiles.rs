use crate::domain::state::{Projectile, ProjectileId};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy)]
pub struct ProjectileConfig {
    pub world_size: f32,
}

/// Integrates projectile movement and returns the ids that reached max range or left the
/// world this tick. Those are retired without being collision tested.
pub fn advance_projectiles(
    projectiles: &mut BTreeMap<ProjectileId, Projectile>,
    dt: f32,
    cfg: ProjectileConfig,
) -> Vec<ProjectileId> {
    let mut expired = Vec::new();

    for p in projectiles.values_mut() {
        let step = p.speed * dt;
        // Never travel past max range, so `distance <= max_distance` always holds.
        let travel = if p.distance + step >= p.max_distance {
            let remaining = (p.max_distance - p.distance).max(0.0);
            p.distance = p.max_distance;
            remaining
        } else {
            p.distance += step;
            step
        };

        p.x += p.angle.cos() * travel;
        p.y += p.angle.sin() * travel;

        if p.distance >= p.max_distance || out_of_bounds(p, cfg) {
            expired.push(p.id);
        }
    }

    expired
}

fn out_of_bounds(p: &Projectile, cfg: ProjectileConfig) -> bool {
    p.x < 0.0 || p.x > cfg.world_size || p.y < 0.0 || p.y > cfg.world_size
}
