// Use-case level inputs/outputs for the game loop.

use crate::domain::tuning::GameTuning;
use crate::domain::{AvatarId, AvatarSnapshot, CombatEvent, ProjectileSnapshot, Vec2, WorldError};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

/// Commands from sessions, drained by the world task at the start of each tick.
#[derive(Debug)]
pub enum GameEvent {
    Join {
        player_id: AvatarId,
        name: String,
        reply: oneshot::Sender<Result<InitialState, WorldError>>,
    },
    Leave {
        player_id: AvatarId,
    },
    Input {
        player_id: AvatarId,
        movement: Option<Vec2>,
        aim: Option<f32>,
    },
    Shoot {
        player_id: AvatarId,
        target: Option<Vec2>,
        // Receive time, so the cooldown is measured in wall-clock time rather than ticks.
        at: Instant,
    },
    Chat {
        player_id: AvatarId,
        text: String,
    },
}

/// Static world parameters a client needs to render and predict.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldConfig {
    pub world_size: f32,
    pub avatar_radius: f32,
    pub avatar_speed: f32,
    pub max_health: i32,
    pub projectile_radius: f32,
    pub projectile_speed: f32,
    pub projectile_damage: i32,
    pub projectile_max_distance: f32,
    pub fire_cooldown_ms: u64,
    pub respawn_delay_ms: u64,
    pub tick_rate: u32,
}

impl WorldConfig {
    pub fn from_tuning(tuning: &GameTuning, tick_interval: Duration) -> Self {
        let tick_rate = if tick_interval.is_zero() {
            0
        } else {
            (1.0 / tick_interval.as_secs_f64()).round() as u32
        };
        Self {
            world_size: tuning.arena.world_size,
            avatar_radius: tuning.player.radius,
            avatar_speed: tuning.player.speed,
            max_health: tuning.player.max_health,
            projectile_radius: tuning.projectile.radius,
            projectile_speed: tuning.projectile.speed,
            projectile_damage: tuning.projectile.damage,
            projectile_max_distance: tuning.projectile.max_distance,
            fire_cooldown_ms: tuning.projectile.cooldown.as_millis() as u64,
            respawn_delay_ms: tuning.player.respawn_delay.as_millis() as u64,
            tick_rate,
        }
    }
}

/// Everything a freshly joined session needs before incremental updates make sense.
#[derive(Debug, Clone)]
pub struct InitialState {
    pub player_id: AvatarId,
    pub tick: u64,
    pub config: WorldConfig,
    pub avatars: Vec<AvatarSnapshot>,
    pub projectiles: Vec<ProjectileSnapshot>,
}

#[derive(Debug, Clone)]
pub struct WorldUpdate {
    pub tick: u64,
    pub avatars: Vec<AvatarSnapshot>,
    pub projectiles: Vec<ProjectileSnapshot>,
}

/// Discrete transitions broadcast next to the per-tick snapshots.
#[derive(Debug, Clone)]
pub enum GameNotice {
    PlayerJoined(AvatarSnapshot),
    PlayerLeft {
        player_id: AvatarId,
    },
    Combat(CombatEvent),
    Chat {
        player_id: AvatarId,
        name: String,
        text: String,
    },
}

/// Everything the world task publishes to sessions.
#[derive(Debug, Clone)]
pub enum Outbound {
    World(WorldUpdate),
    Notice(GameNotice),
}

/// Cheap summary of the latest tick for the status endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WorldStats {
    pub tick: u64,
    pub players: usize,
    pub projectiles: usize,
}
