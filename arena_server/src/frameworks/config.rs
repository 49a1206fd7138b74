use std::{env, time::Duration};

// Runtime/server constants (not gameplay tuning).

pub fn http_port() -> u16 {
    env::var("ARENA_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000)
}

/// Concurrent WebSocket sessions accepted before upgrades are refused with 503.
pub fn max_connections() -> usize {
    env::var("ARENA_MAX_CONNECTIONS")
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|&n: &usize| n > 0)
        .unwrap_or(64)
}

pub const INPUT_CHANNEL_CAPACITY: usize = 1024;
pub const WORLD_BROADCAST_CAPACITY: usize = 128;

// 60 Hz.
pub const TICK_INTERVAL: Duration = Duration::from_nanos(1_000_000_000 / 60);
