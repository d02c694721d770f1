use axum::{extract::State, Json};
use serde::Serialize;

use crate::http::server::AppState;
use crate::relay::SessionSnapshot;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub active_sessions: usize,
    pub radios: usize,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        active_sessions: state.sessions.active_count(),
        radios: state.radios.get_all().len(),
    })
}

pub async fn get_sessions(State(state): State<AppState>) -> Json<Vec<SessionSnapshot>> {
    Json(state.sessions.snapshot())
}

pub async fn get_config(State(state): State<AppState>) -> Json<serde_json::Value> {
    let inner = state.inner.load();
    let upstream = &inner.config.upstream;
    Json(serde_json::json!({
        "connect_timeout_secs": upstream.connect_timeout_secs,
        "probe_timeout_secs": upstream.probe_timeout_secs,
        "open_timeout_secs": upstream.open_timeout_secs,
        "read_timeout_secs": upstream.read_timeout_secs,
        "user_agent": upstream.user_agent,
    }))
}
