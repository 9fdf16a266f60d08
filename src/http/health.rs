use axum::{extract::State, Json};
use serde::Serialize;

use crate::http::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
    pub storage_host: Option<String>,
}

pub async fn get_health(State(state): State<AppState>) -> Json<HealthStatus> {
    let policy = state.policy.load();
    Json(HealthStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        storage_host: policy.storage_host().map(str::to_string),
    })
}
