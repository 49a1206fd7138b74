// Shared HTTP response types for the status and upgrade routes.

#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, serde::Serialize)]
pub struct StatusResponse {
    pub tick: u64,
    pub players: usize,
    pub projectiles: usize,
    pub connections: usize,
}
