use async_trait::async_trait;

use crate::domain::{Job, JobId};
use crate::presentation::handlers::{CreateJobRequest, DeleteJobResponse, ListJobsResponse};

pub type NewJobRequest = CreateJobRequest;
pub type JobListPage = ListJobsResponse;
pub type DeleteOutcome = DeleteJobResponse;

/// Owner-scoped job operations as seen from a client. The owner identity is
/// bound into the implementation, not passed per call.
#[async_trait]
pub trait JobsApi: Send + Sync {
    async fn create(&self, request: &NewJobRequest) -> Result<Job, ClientError>;

    async fn list(&self, cursor: Option<&str>) -> Result<JobListPage, ClientError>;

    async fn get(&self, id: JobId) -> Result<Job, ClientError>;

    async fn analyze(&self, id: JobId) -> Result<Job, ClientError>;

    async fn start_processing(&self, id: JobId) -> Result<Job, ClientError>;

    async fn cancel(&self, id: JobId, delete_file: bool) -> Result<Job, ClientError>;

    async fn delete(&self, id: JobId, cleanup_storage: bool) -> Result<DeleteOutcome, ClientError>;
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClientError {
    #[error("job not found")]
    NotFound,
    #[error("job belongs to another owner")]
    Forbidden,
    #[error("caller identity missing or rejected")]
    Unauthorized,
    #[error("operation not allowed in current status: {0}")]
    InvalidState(String),
    #[error("job changed concurrently: {0}")]
    Conflict(String),
    #[error("another job is still being analyzed or processed")]
    SubmissionBlocked(Option<JobId>),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("remediation worker unavailable: {0}")]
    Upstream(String),
    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ClientError {
    /// Errors worth retrying on the next poll tick.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ClientError::Transport(_)
                | ClientError::Server { .. }
                | ClientError::Upstream(_)
                | ClientError::Decode(_)
        )
    }

    pub(crate) fn from_response(status: u16, code: Option<&str>, message: String) -> Self {
        match code {
            Some("NOT_FOUND") => ClientError::NotFound,
            Some("FORBIDDEN") => ClientError::Forbidden,
            Some("UNAUTHORIZED") => ClientError::Unauthorized,
            Some("INVALID_STATE") => ClientError::InvalidState(message),
            Some("CONFLICT") => ClientError::Conflict(message),
            Some("ACTIVE_JOB_EXISTS") => ClientError::SubmissionBlocked(None),
            Some("INVALID_REQUEST") => ClientError::InvalidRequest(message),
            Some("UPSTREAM_FAILURE") => ClientError::Upstream(message),
            _ => match status {
                401 => ClientError::Unauthorized,
                403 => ClientError::Forbidden,
                404 => ClientError::NotFound,
                400 => ClientError::InvalidRequest(message),
                409 => ClientError::Conflict(message),
                _ => ClientError::Server { status, message },
            },
        }
    }
}
