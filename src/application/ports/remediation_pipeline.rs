use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Payload handed to the external remediation worker. `correlation_id` is the
/// job id and comes back verbatim in the completion signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemediationRequest {
    pub correlation_id: String,
    pub owner_id: String,
    pub storage_key: String,
    pub file_name: String,
}

/// Fire-and-forget trigger of the remediation worker. A successful dispatch
/// only means the worker accepted the request; the outcome arrives later
/// through the completion signal.
#[async_trait]
pub trait RemediationPipeline: Send + Sync {
    async fn dispatch(&self, request: &RemediationRequest) -> Result<(), RemediationError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RemediationError {
    #[error("dispatch failed: {0}")]
    DispatchFailed(String),
    #[error("worker rejected request with status {status}: {body}")]
    Rejected { status: u16, body: String },
}
