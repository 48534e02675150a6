use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::alerts::{GatewayRunStatus, RunOrchestrator};

/// Application state shared across handlers
pub struct AppState {
    pub orchestrator: Arc<RunOrchestrator>,
}

// ============================================================================
// Health Check
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============================================================================
// Run Status
// ============================================================================

#[derive(Serialize)]
pub struct StatusResponse {
    pub gateways: Vec<GatewayRunStatus>,
}

pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        gateways: state.orchestrator.statuses(),
    })
}

// ============================================================================
// Manual Trigger
// ============================================================================

#[derive(Serialize)]
pub struct TriggerResponse {
    pub dispatched: Vec<String>,
    pub skipped: Vec<String>,
}

/// Fire one out-of-schedule tick without waiting for it
pub async fn trigger_run(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut dispatched = Vec::new();
    let mut skipped = Vec::new();

    for (id, handle) in state.orchestrator.tick() {
        if handle.is_some() {
            dispatched.push(id);
        } else {
            skipped.push(id);
        }
    }

    tracing::info!(
        dispatched = dispatched.len(),
        skipped = skipped.len(),
        "Manual run triggered"
    );

    (
        StatusCode::ACCEPTED,
        Json(TriggerResponse {
            dispatched,
            skipped,
        }),
    )
}
