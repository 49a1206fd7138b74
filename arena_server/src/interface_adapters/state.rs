use crate::use_cases::{GameEvent, Outbound, WorldStats};
use axum::extract::ws::Utf8Bytes;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{broadcast, mpsc, watch};

pub struct AppState {
    // Session commands flowing from the network into the world task.
    pub input_tx: mpsc::Sender<GameEvent>,
    // Snapshots and notices produced by the world task (domain structs).
    pub world_tx: broadcast::Sender<Outbound>,
    // Serialized outbound messages, shared across all connections.
    pub world_bytes_tx: broadcast::Sender<Utf8Bytes>,
    // Latest serialized snapshot for lag recovery.
    pub world_latest_tx: watch::Sender<Utf8Bytes>,
    pub stats_rx: watch::Receiver<WorldStats>,
    connections: AtomicUsize,
    max_connections: usize,
}

impl AppState {
    pub fn new(
        input_tx: mpsc::Sender<GameEvent>,
        world_tx: broadcast::Sender<Outbound>,
        stats_rx: watch::Receiver<WorldStats>,
        broadcast_capacity: usize,
        max_connections: usize,
    ) -> Self {
        let (world_bytes_tx, _) = broadcast::channel(broadcast_capacity);
        let (world_latest_tx, _) = watch::channel(Utf8Bytes::from(""));
        Self {
            input_tx,
            world_tx,
            world_bytes_tx,
            world_latest_tx,
            stats_rx,
            connections: AtomicUsize::new(0),
            max_connections,
        }
    }

    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::Relaxed)
    }
}

/// Holds one of the `max_connections` socket slots; released on drop.
#[derive(Debug)]
pub struct ConnectionSlot {
    state: Arc<AppState>,
}

impl ConnectionSlot {
    pub fn acquire(state: &Arc<AppState>) -> Option<Self> {
        state
            .connections
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < state.max_connections).then_some(n + 1)
            })
            .ok()
            .map(|_| Self {
                state: Arc::clone(state),
            })
    }
}

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        self.state.connections.fetch_sub(1, Ordering::AcqRel);
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("connections", &self.connection_count())
            .field("max_connections", &self.max_connections)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_state(max_connections: usize) -> Arc<AppState> {
        let (input_tx, _input_rx) = mpsc::channel(1);
        let (world_tx, _) = broadcast::channel(1);
        let (_stats_tx, stats_rx) = watch::channel(WorldStats::default());
        Arc::new(AppState::new(input_tx, world_tx, stats_rx, 1, max_connections))
    }

    #[test]
    fn when_capacity_is_reached_then_acquire_fails_until_slot_is_dropped() {
        let state = test_state(2);

        let first = ConnectionSlot::acquire(&state).expect("first slot");
        let _second = ConnectionSlot::acquire(&state).expect("second slot");
        assert!(ConnectionSlot::acquire(&state).is_none());
        assert_eq!(state.connection_count(), 2);

        drop(first);

        assert_eq!(state.connection_count(), 1);
        assert!(ConnectionSlot::acquire(&state).is_some());
    }
}
