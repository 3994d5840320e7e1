//! Health probe.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `healthy`, or `degraded` when a configured database is unreachable.
    pub status: &'static str,
    /// `connected`, `in-memory`, or `unreachable`.
    pub database: &'static str,
    /// Live connections.
    pub sessions: usize,
    pub uptime_secs: u64,
    pub version: &'static str,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = state.database_status().await;
    Json(HealthResponse {
        status: if database == "unreachable" {
            "degraded"
        } else {
            "healthy"
        },
        database,
        sessions: state.coordinator.registry().count(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        version: env!("CARGO_PKG_VERSION"),
    })
}
