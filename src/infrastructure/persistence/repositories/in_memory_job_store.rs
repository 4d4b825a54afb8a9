use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::application::ports::{JobPage, JobStore, PageCursor, StoreError};
use crate::domain::{Job, JobFields, JobId, JobStatus, OwnerId};

/// Process-local store. Every conditional write runs under one write lock, so
/// transitions are linearized exactly like the database adapter.
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}

fn active_job_of(jobs: &HashMap<JobId, Job>, owner: &OwnerId, except: JobId) -> Option<JobId> {
    jobs.values()
        .find(|j| j.id != except && &j.owner_id == owner && j.status.is_active())
        .map(|j| j.id)
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn put(&self, job: &Job) -> Result<(), StoreError> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job.id) {
            return Err(StoreError::ConstraintViolation(format!(
                "job {} already exists",
                job.id
            )));
        }
        if job.status.is_active() {
            if let Some(active) = active_job_of(&jobs, &job.owner_id, job.id) {
                return Err(StoreError::ActiveJobExists {
                    owner: job.owner_id.clone(),
                    active,
                });
            }
        }
        jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn get(&self, id: JobId) -> Result<Option<Job>, StoreError> {
        Ok(self.jobs.read().await.get(&id).cloned())
    }

    async fn update_status(
        &self,
        id: JobId,
        expected: &[JobStatus],
        next: JobStatus,
        fields: JobFields,
    ) -> Result<Job, StoreError> {
        let mut jobs = self.jobs.write().await;
        let current = jobs.get(&id).ok_or(StoreError::NotFound(id))?;

        if !expected.contains(&current.status) {
            return Err(StoreError::Conflict {
                id,
                current: current.status,
            });
        }
        if next.is_active() {
            if let Some(active) = active_job_of(&jobs, &current.owner_id, id) {
                return Err(StoreError::ActiveJobExists {
                    owner: current.owner_id.clone(),
                    active,
                });
            }
        }

        let job = jobs.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        job.apply(next, fields, Utc::now());
        Ok(job.clone())
    }

    async fn query_by_owner(
        &self,
        owner: &OwnerId,
        cursor: Option<&PageCursor>,
        limit: usize,
    ) -> Result<JobPage, StoreError> {
        let jobs = self.jobs.read().await;
        let mut owned: Vec<&Job> = jobs
            .values()
            .filter(|j| &j.owner_id == owner)
            .filter(|j| cursor.is_none_or(|c| c.precedes(j)))
            .collect();
        owned.sort_by(|a, b| {
            (b.created_at, b.id.as_uuid()).cmp(&(a.created_at, a.id.as_uuid()))
        });

        let has_more = owned.len() > limit;
        let page: Vec<Job> = owned.into_iter().take(limit).cloned().collect();
        let next_cursor = if has_more {
            page.last().map(PageCursor::after)
        } else {
            None
        };

        Ok(JobPage {
            jobs: page,
            next_cursor,
        })
    }

    async fn delete(&self, id: JobId) -> Result<(), StoreError> {
        self.jobs
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }

    async fn list_by_status(&self, status: JobStatus) -> Result<Vec<Job>, StoreError> {
        let jobs = self.jobs.read().await;
        let mut matching: Vec<Job> = jobs.values().filter(|j| j.status == status).cloned().collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }

    async fn list_expired(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<Job>, StoreError> {
        let jobs = self.jobs.read().await;
        let mut expired: Vec<Job> = jobs.values().filter(|j| j.is_expired(now)).cloned().collect();
        expired.sort_by(|a, b| a.expires_at.cmp(&b.expires_at));
        expired.truncate(limit);
        Ok(expired)
    }
}
