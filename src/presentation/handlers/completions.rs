use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::{Deserialize, Serialize};

use crate::application::services::CompletionEvent;
use crate::presentation::state::AppState;

use super::ApiError;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResponse {
    pub disposition: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Worker callback. Always 200 once the payload parses so the worker never
/// retries; the disposition says whether anything changed.
#[tracing::instrument(skip(state, body))]
pub async fn completion_handler(
    State(state): State<AppState>,
    body: Result<Json<CompletionEvent>, JsonRejection>,
) -> Result<Json<CompletionResponse>, ApiError> {
    let Json(event) = body?;
    let disposition = state.notifier.handle(event).await;
    Ok(Json(CompletionResponse {
        disposition: disposition.as_str().to_string(),
        status: disposition.status().map(|s| s.as_str().to_string()),
    }))
}
