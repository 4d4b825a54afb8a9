use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::application::services::LifecycleError;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Error leaving a handler. Every failure answers with an [`ErrorResponse`]
/// body whose `code` is stable for clients to branch on.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "INVALID_REQUEST", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        let (status, code) = match &err {
            LifecycleError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            LifecycleError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            LifecycleError::InvalidState { .. } => (StatusCode::CONFLICT, "INVALID_STATE"),
            LifecycleError::Conflict { .. } => (StatusCode::CONFLICT, "CONFLICT"),
            LifecycleError::ActiveJobExists(_) => (StatusCode::CONFLICT, "ACTIVE_JOB_EXISTS"),
            LifecycleError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            LifecycleError::UpstreamFailure(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_FAILURE"),
            LifecycleError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORE_ERROR"),
        };

        if status.is_server_error() {
            tracing::error!(error = %err, "Request failed");
        } else {
            tracing::debug!(error = %err, "Request rejected");
        }

        let message = match &err {
            LifecycleError::Store(_) => "Job store unavailable".to_string(),
            other => other.to_string(),
        };
        Self::new(status, code, message)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
                code: self.code.to_string(),
            }),
        )
            .into_response()
    }
}
