//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// `"local"` when accounts are served in-process, `"remote"` otherwise.
    pub accounts: &'static str,
}

/// GET /health: liveness plus which account backend is in use.
pub async fn check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let accounts = if state.accounts.local().is_some() {
        "local"
    } else {
        "remote"
    };
    Json(HealthResponse {
        status: "ok",
        accounts,
    })
}
