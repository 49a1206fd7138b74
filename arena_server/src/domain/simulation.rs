// One fixed-rate simulation step over the world.

use super::state::{Avatar, CombatEvent, Projectile, ProjectileId};
use super::systems::collision::{CollisionDetector, Hit};
use super::systems::movement::{self, MovementConfig};
use super::systems::projectiles::{self, ProjectileConfig};
use super::systems::combat;
use super::world::World;
use std::collections::BTreeSet;
use std::time::Instant;

/// What happened during a step, for the synchronizer.
#[derive(Debug, Default)]
pub struct TickReport {
    pub events: Vec<CombatEvent>,
    pub retired: Vec<ProjectileId>,
}

/// Advances the world by `dt` seconds at wall-clock time `now`.
///
/// Order: avatar movement, projectile advance, collision detection over projectiles still in
/// range, hit resolution, respawn sweep, retirement.
pub fn step<D: CollisionDetector>(
    world: &mut World,
    now: Instant,
    dt: f32,
    detector: &mut D,
) -> TickReport {
    let world_size = world.tuning().arena.world_size;

    let movement_cfg = MovementConfig { world_size };
    for avatar in world.avatars.values_mut().filter(|a| a.alive) {
        movement::tick_avatar(avatar, dt, movement_cfg);
    }

    let expired = projectiles::advance_projectiles(
        &mut world.projectiles,
        dt,
        ProjectileConfig { world_size },
    );
    let mut retired: BTreeSet<ProjectileId> = expired.into_iter().collect();

    let hits: Vec<Hit> = {
        let avatars: Vec<&Avatar> = world.avatars.values().collect();
        let candidates: Vec<&Projectile> = world
            .projectiles
            .values()
            .filter(|p| !retired.contains(&p.id))
            .collect();
        detector.detect(&avatars, &candidates)
    };

    let mut events = combat::resolve_hits(world, &hits, now);
    events.extend(combat::respawn_due(world, now));

    retired.extend(hits.iter().map(|h| h.projectile_id));
    for id in &retired {
        world.projectiles.remove(id);
    }

    TickReport {
        events,
        retired: retired.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::state::Vec2;
    use crate::domain::systems::BruteForceDetector;
    use crate::domain::test_support::{DT, place, test_world};
    use std::time::Duration;

    fn assert_invariants(world: &World) {
        for a in world.avatars.values() {
            assert!(a.health >= 0 && a.health <= a.max_health);
            assert!(a.x >= a.radius && a.x <= 2000.0 - a.radius);
            assert!(a.y >= a.radius && a.y <= 2000.0 - a.radius);
        }
        for p in world.projectiles.values() {
            assert!(p.distance >= 0.0 && p.distance <= p.max_distance);
            assert!(p.x >= 0.0 && p.x <= 2000.0 && p.y >= 0.0 && p.y <= 2000.0);
        }
    }

    #[test]
    fn when_projectile_reaches_target_then_target_loses_damage_and_projectile_is_retired() {
        let mut world = test_world();
        world.add_avatar(1, "Shooter").unwrap();
        world.add_avatar(2, "Target").unwrap();
        place(&mut world, 1, 100.0, 500.0);
        place(&mut world, 2, 200.0, 500.0);
        let now = Instant::now();
        let shot = world
            .spawn_projectile(1, Some(Vec2::new(200.0, 500.0)), now)
            .unwrap();

        // Spawned at x=125, travelling 10 per tick; contact once within 25 of x=200.
        let mut report = TickReport::default();
        for _ in 0..6 {
            report = step(&mut world, now, DT, &mut BruteForceDetector);
            if !report.retired.is_empty() {
                break;
            }
        }

        assert_eq!(report.retired, vec![shot.id]);
        assert_eq!(world.avatar(2).unwrap().health, 75);
        assert!(world.avatar(2).unwrap().alive);
        assert_eq!(world.projectile_count(), 0);
    }

    #[test]
    fn when_target_dies_then_it_respawns_on_first_tick_past_delay() {
        let mut world = test_world();
        world.add_avatar(1, "Shooter").unwrap();
        world.add_avatar(2, "Target").unwrap();
        place(&mut world, 1, 100.0, 500.0);
        place(&mut world, 2, 140.0, 500.0);
        world.avatars.get_mut(&2).unwrap().health = 20;
        let t0 = Instant::now();
        world
            .spawn_projectile(1, Some(Vec2::new(140.0, 500.0)), t0)
            .unwrap();

        let report = step(&mut world, t0, DT, &mut BruteForceDetector);
        assert!(matches!(
            report.events.as_slice(),
            [CombatEvent::Hit { .. }, CombatEvent::Killed { .. }]
        ));
        assert!(!world.avatar(2).unwrap().alive);
        assert_eq!(world.avatar(1).unwrap().score, 100);

        step(&mut world, t0 + Duration::from_millis(2990), DT, &mut BruteForceDetector);
        assert!(!world.avatar(2).unwrap().alive);

        let report = step(&mut world, t0 + Duration::from_millis(3000), DT, &mut BruteForceDetector);
        assert!(world.avatar(2).unwrap().alive);
        assert!(matches!(
            report.events.as_slice(),
            [CombatEvent::Respawned { avatar_id: 2, .. }]
        ));
    }

    #[test]
    fn when_second_projectile_hits_avatar_killed_same_tick_then_both_are_retired() {
        let mut world = test_world();
        world.add_avatar(1, "Left").unwrap();
        world.add_avatar(2, "Target").unwrap();
        world.add_avatar(3, "Below").unwrap();
        place(&mut world, 1, 100.0, 500.0);
        place(&mut world, 2, 300.0, 500.0);
        place(&mut world, 3, 300.0, 700.0);
        world.avatars.get_mut(&2).unwrap().health = 25;
        let now = Instant::now();
        let from_left = world
            .spawn_projectile(1, Some(Vec2::new(300.0, 500.0)), now)
            .unwrap();
        let from_below = world
            .spawn_projectile(3, Some(Vec2::new(300.0, 500.0)), now)
            .unwrap();
        // Park both one step short of the target so they connect on the same tick.
        for (id, x, y) in [(from_left.id, 290.0, 500.0), (from_below.id, 300.0, 510.0)] {
            let p = world.projectiles.get_mut(&id).unwrap();
            p.x = x;
            p.y = y;
        }

        let report = step(&mut world, now, DT, &mut BruteForceDetector);

        assert_eq!(report.retired, vec![from_left.id, from_below.id]);
        assert_eq!(world.projectile_count(), 0);
        let deaths = report
            .events
            .iter()
            .filter(|e| matches!(e, CombatEvent::Killed { victim_id: 2, .. }))
            .count();
        assert_eq!(deaths, 1);
        assert_eq!(world.avatar(2).unwrap().health, 0);
        assert_eq!(world.avatar(1).unwrap().kills, 1);
        assert_eq!(world.avatar(3).unwrap().kills, 0);
    }

    #[test]
    fn when_avatar_is_dead_then_it_does_not_move() {
        let mut world = test_world();
        world.add_avatar(1, "Ghost").unwrap();
        place(&mut world, 1, 300.0, 300.0);
        world.apply_intent(1, Some(Vec2::new(1.0, 0.0)), None);
        {
            let a = world.avatars.get_mut(&1).unwrap();
            a.alive = false;
            a.health = 0;
            a.respawn_at = Some(Instant::now() + Duration::from_secs(60));
        }

        step(&mut world, Instant::now(), DT, &mut BruteForceDetector);

        assert_eq!(world.avatar(1).unwrap().x, 300.0);
    }

    #[test]
    fn when_owner_disconnects_then_its_projectiles_still_fly_and_kill_without_error() {
        let mut world = test_world();
        world.add_avatar(1, "Leaver").unwrap();
        world.add_avatar(2, "Target").unwrap();
        world.add_avatar(3, "Other").unwrap();
        place(&mut world, 1, 100.0, 500.0);
        place(&mut world, 2, 300.0, 500.0);
        place(&mut world, 3, 100.0, 1500.0);
        world.avatars.get_mut(&2).unwrap().health = 25;
        let t0 = Instant::now();
        world
            .spawn_projectile(1, Some(Vec2::new(300.0, 500.0)), t0)
            .unwrap();
        world
            .spawn_projectile(1, Some(Vec2::new(100.0, 1900.0)), t0 + Duration::from_millis(300))
            .unwrap();

        world.remove_avatar(1);
        assert_eq!(world.projectile_count(), 2);

        let mut killed_without_credit = false;
        for _ in 0..30 {
            let report = step(&mut world, t0, DT, &mut BruteForceDetector);
            killed_without_credit |= report
                .events
                .iter()
                .any(|e| matches!(e, CombatEvent::Killed { victim_id: 2, killer: None, .. }));
        }

        assert!(killed_without_credit);
        assert_eq!(world.avatar(2).unwrap().deaths, 1);
    }

    #[test]
    fn when_many_ticks_run_with_random_intents_then_invariants_hold() {
        let mut world = test_world();
        for id in 1..=8 {
            world.add_avatar(id, format!("P{id}")).unwrap();
        }
        let directions = [
            Vec2::new(1.0, 0.0),
            Vec2::new(-1.0, 1.0),
            Vec2::new(0.0, -1.0),
            Vec2::new(-1.0, -1.0),
        ];
        let t0 = Instant::now();

        for tick in 0..600u32 {
            let now = t0 + Duration::from_millis(u64::from(tick) * 16);
            for id in 1..=8u64 {
                let dir = directions[((id as u32 + tick / 60) % 4) as usize];
                world.apply_intent(id, Some(dir), Some(tick as f32 * 0.1));
                world.spawn_projectile(id, Some(Vec2::new(1000.0, 1000.0)), now);
            }
            step(&mut world, now, DT, &mut BruteForceDetector);
            assert_invariants(&world);
        }
    }
}
