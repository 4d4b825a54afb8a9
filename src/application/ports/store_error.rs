use crate::domain::{JobId, JobStatus, OwnerId};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("query failed: {0}")]
    QueryFailed(String),
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("conditional write rejected for job {id}: current status is {current}")]
    Conflict { id: JobId, current: JobStatus },
    #[error("owner {owner} already has active job {active}")]
    ActiveJobExists { owner: OwnerId, active: JobId },
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
}
