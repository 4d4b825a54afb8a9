use crate::application::ports::StoreError;
use crate::domain::{JobId, JobStatus};

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("job {0} belongs to another owner")]
    Forbidden(JobId),
    #[error("cannot move job {id} from {current} to {target}")]
    InvalidState {
        id: JobId,
        current: JobStatus,
        target: JobStatus,
    },
    #[error("job {id} changed concurrently and is now {current}")]
    Conflict { id: JobId, current: JobStatus },
    #[error("job {0} is already being analyzed or processed")]
    ActiveJobExists(JobId),
    #[error("upstream failure: {0}")]
    UpstreamFailure(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("store: {0}")]
    Store(StoreError),
}

impl From<StoreError> for LifecycleError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => LifecycleError::NotFound(id),
            StoreError::Conflict { id, current } => LifecycleError::Conflict { id, current },
            StoreError::ActiveJobExists { active, .. } => LifecycleError::ActiveJobExists(active),
            StoreError::InvalidCursor(reason) => {
                LifecycleError::InvalidRequest(format!("invalid cursor: {}", reason))
            }
            other => LifecycleError::Store(other),
        }
    }
}
