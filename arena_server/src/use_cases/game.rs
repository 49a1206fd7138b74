use super::types::{
    GameEvent, GameNotice, InitialState, Outbound, WorldConfig, WorldStats, WorldUpdate,
};
use crate::domain::World;
use crate::domain::simulation;
use crate::domain::systems::BruteForceDetector;
use crate::domain::tuning::GameTuning;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// The authoritative game loop. Sole owner of the `World`.
///
/// Each tick drains every queued session command, runs one simulation step, publishes the
/// resulting combat notices and then the full snapshot.
pub async fn world_task(
    mut input_rx: mpsc::Receiver<GameEvent>,
    world_tx: broadcast::Sender<Outbound>,
    stats_tx: watch::Sender<WorldStats>,
    tuning: GameTuning,
    tick_interval: Duration,
) {
    let mut world = World::new(tuning);
    let mut detector = BruteForceDetector;
    let config = WorldConfig::from_tuning(&tuning, tick_interval);
    let dt = tick_interval.as_secs_f32();
    let mut tick: u64 = 0;

    // Drive the fixed-step game loop at the configured tick rate.
    let mut interval = tokio::time::interval(tick_interval);
    // A stalled runtime should not trigger a burst of catch-up ticks.
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(tick_rate = config.tick_rate, world_size = config.world_size, "world task started");

    loop {
        interval.tick().await;

        loop {
            match input_rx.try_recv() {
                Ok(ev) => {
                    if let Some(notice) = apply_event(&mut world, ev, tick, &config) {
                        let _ = world_tx.send(Outbound::Notice(notice));
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    info!("input channel closed; world task exiting");
                    return;
                }
            }
        }

        let report = simulation::step(&mut world, Instant::now(), dt, &mut detector);
        for event in report.events {
            let _ = world_tx.send(Outbound::Notice(GameNotice::Combat(event)));
        }

        tick += 1;
        let (avatars, projectiles) = world.snapshot();
        stats_tx.send_replace(WorldStats {
            tick,
            players: avatars.len(),
            projectiles: projectiles.len(),
        });

        // No receivers is fine: nobody is connected yet.
        let _ = world_tx.send(Outbound::World(WorldUpdate {
            tick,
            avatars,
            projectiles,
        }));
    }
}

/// Applies one session command to the world. Returns the notice to broadcast, if any.
pub fn apply_event(
    world: &mut World,
    event: GameEvent,
    tick: u64,
    config: &WorldConfig,
) -> Option<GameNotice> {
    match event {
        GameEvent::Join {
            player_id,
            name,
            reply,
        } => match world.add_avatar(player_id, name) {
            Ok(avatar) => {
                info!(player_id, name = %avatar.name, "player joined");
                let (avatars, projectiles) = world.snapshot();
                let init = InitialState {
                    player_id,
                    tick,
                    config: *config,
                    avatars,
                    projectiles,
                };
                if reply.send(Ok(init)).is_err() {
                    // The session is gone before it could receive `init`.
                    world.remove_avatar(player_id);
                    debug!(player_id, "joining session vanished; avatar removed");
                    return None;
                }
                Some(GameNotice::PlayerJoined(avatar))
            }
            Err(err) => {
                warn!(player_id, error = ?err, "join rejected");
                let _ = reply.send(Err(err));
                None
            }
        },
        GameEvent::Leave { player_id } => world.remove_avatar(player_id).map(|avatar| {
            info!(player_id, name = %avatar.name, "player left");
            GameNotice::PlayerLeft { player_id }
        }),
        GameEvent::Input {
            player_id,
            movement,
            aim,
        } => {
            world.apply_intent(player_id, movement, aim);
            None
        }
        GameEvent::Shoot {
            player_id,
            target,
            at,
        } => {
            if let Some(projectile) = world.spawn_projectile(player_id, target, at) {
                debug!(player_id, projectile_id = projectile.id, "projectile spawned");
            }
            None
        }
        GameEvent::Chat { player_id, text } => world.avatar(player_id).map(|avatar| {
            GameNotice::Chat {
                player_id,
                name: avatar.name.clone(),
                text,
            }
        }),
    }
}
