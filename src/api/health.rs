//! Health check and statistics endpoints.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::queue::RegistryStats;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub queues: usize,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.registry.is_closed() {
        "shutting_down"
    } else {
        "healthy"
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        queues: state.registry.len(),
    })
}

pub async fn stats(State(state): State<AppState>) -> Json<RegistryStats> {
    Json(state.registry.stats())
}
