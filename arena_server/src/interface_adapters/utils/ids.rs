use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_PLAYER_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique avatar id. Never reused, so a late `Leave` cannot hit a newer player.
pub fn next_player_id() -> u64 {
    NEXT_PLAYER_ID.fetch_add(1, Ordering::Relaxed)
}

// Correlates log lines for a socket before it has a player id.
pub fn next_conn_id() -> u64 {
    NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed)
}
