use crate::interface_adapters::http::StatusResponse;
use crate::interface_adapters::state::AppState;

use axum::extract::{Json, State};
use std::sync::Arc;

/// Read-only view of the latest tick; never touches the world task.
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let stats = *state.stats_rx.borrow();
    Json(StatusResponse {
        tick: stats.tick,
        players: stats.players,
        projectiles: stats.projectiles,
        connections: state.connection_count(),
    })
}
