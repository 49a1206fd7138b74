/// Gameplay tuning for player-controlled avatars.
///
/// Keep this separate from runtime/server configuration (tick rates, buffer sizes, etc.).

#[derive(Debug, Clone, Copy)]
pub struct PlayerTuning {
    /// Movement speed in world units per second.
    pub speed: f32,

    /// World-space collision radius (server-side hit checks and wall clamping).
    pub radius: f32,

    /// Health on spawn and respawn.
    pub max_health: i32,

    /// Delay between death and re-entering the world.
    pub respawn_delay: std::time::Duration,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            // 5 units per tick at 60 Hz.
            speed: 300.0,
            radius: 20.0,
            max_health: 100,
            respawn_delay: std::time::Duration::from_millis(3000),
        }
    }
}
