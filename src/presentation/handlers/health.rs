use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;

use crate::presentation::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub job_store: &'static str,
    pub version: &'static str,
}

/// 503 while the job store is unreachable so load balancers drain the node.
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (status, code, job_store) = match state.lifecycle.check_store().await {
        Ok(()) => ("healthy", StatusCode::OK, "ok"),
        Err(e) => {
            tracing::warn!(error = %e, "Health check found job store unavailable");
            ("degraded", StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
    };

    (
        code,
        Json(HealthResponse {
            status,
            job_store,
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}
