use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Job, JobFields, JobId, JobStatus, OwnerId};

use super::{PageCursor, StoreError};

#[derive(Debug, Clone)]
pub struct JobPage {
    pub jobs: Vec<Job>,
    pub next_cursor: Option<PageCursor>,
}

/// Durable keyed record store and the single source of truth for jobs.
///
/// `update_status` is a conditional write: it succeeds only when the stored
/// status is one of `expected`, otherwise it fails with
/// [`StoreError::Conflict`] carrying the status it found. Implementations also
/// refuse to let a second job of the same owner become active
/// ([`StoreError::ActiveJobExists`]).
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn put(&self, job: &Job) -> Result<(), StoreError>;

    async fn get(&self, id: JobId) -> Result<Option<Job>, StoreError>;

    async fn update_status(
        &self,
        id: JobId,
        expected: &[JobStatus],
        next: JobStatus,
        fields: JobFields,
    ) -> Result<Job, StoreError>;

    /// Newest first, `limit` records at most.
    async fn query_by_owner(
        &self,
        owner: &OwnerId,
        cursor: Option<&PageCursor>,
        limit: usize,
    ) -> Result<JobPage, StoreError>;

    async fn delete(&self, id: JobId) -> Result<(), StoreError>;

    async fn list_by_status(&self, status: JobStatus) -> Result<Vec<Job>, StoreError>;

    async fn list_expired(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<Job>, StoreError>;

    /// Cheap reachability check for health reporting.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
