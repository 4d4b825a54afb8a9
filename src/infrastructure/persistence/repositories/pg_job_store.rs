use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::instrument;
use uuid::Uuid;

use crate::application::ports::{JobPage, JobStore, PageCursor, StoreError};
use crate::domain::{
    DocumentAnalysis, FileMetadata, Job, JobFields, JobId, JobStatus, OwnerId, ProcessingResult,
    StorageKey,
};

const JOB_COLUMNS: &str = "id, owner_id, status, file_name, file_size_bytes, storage_key, \
    page_count, sampled_pages, avg_elements_per_page, estimated_elements, complexity, \
    estimated_transactions, estimated_cost_percentage, result_key, duration_seconds, \
    completed_at, error_message, created_at, updated_at, expires_at";

const ACTIVE_JOB_CONSTRAINT: &str = "jobs_one_active_per_owner";

pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn active_job_of(&self, owner: &str, except: Uuid) -> Result<Option<JobId>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id FROM jobs
            WHERE owner_id = $1 AND id <> $2 AND status IN ('ANALYZING', 'PROCESSING')
            LIMIT 1
            "#,
        )
        .bind(owner)
        .bind(except)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_failed)?;

        row.map(|r| r.try_get::<Uuid, _>("id").map(JobId::from_uuid))
            .transpose()
            .map_err(query_failed)
    }

    async fn active_job_error(&self, owner: &OwnerId, except: JobId) -> StoreError {
        match self.active_job_of(owner.as_str(), except.as_uuid()).await {
            Ok(Some(active)) => StoreError::ActiveJobExists {
                owner: owner.clone(),
                active,
            },
            Ok(None) => StoreError::ConstraintViolation(ACTIVE_JOB_CONSTRAINT.to_string()),
            Err(e) => e,
        }
    }

    async fn current_row(&self, id: JobId) -> Result<Option<(JobStatus, OwnerId)>, StoreError> {
        let row = sqlx::query("SELECT status, owner_id FROM jobs WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(query_failed)?;

        match row {
            Some(r) => {
                let status: String = r.try_get("status").map_err(query_failed)?;
                let owner: String = r.try_get("owner_id").map_err(query_failed)?;
                let status = status.parse::<JobStatus>().map_err(StoreError::QueryFailed)?;
                Ok(Some((status, OwnerId::new(owner))))
            }
            None => Ok(None),
        }
    }
}

fn query_failed(e: sqlx::Error) -> StoreError {
    StoreError::QueryFailed(e.to_string())
}

fn violates_active_job_constraint(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.constraint() == Some(ACTIVE_JOB_CONSTRAINT))
}

fn row_to_job(r: &PgRow) -> Result<Job, StoreError> {
    let status: String = r.try_get("status").map_err(query_failed)?;
    let status = status.parse::<JobStatus>().map_err(StoreError::QueryFailed)?;

    let page_count: Option<i32> = r.try_get("page_count").map_err(query_failed)?;
    let analysis = match page_count {
        Some(page_count) => {
            let complexity: String = r.try_get("complexity").map_err(query_failed)?;
            Some(DocumentAnalysis {
                page_count: page_count as u32,
                sampled_pages: r.try_get::<i32, _>("sampled_pages").map_err(query_failed)? as u32,
                avg_elements_per_page: r.try_get("avg_elements_per_page").map_err(query_failed)?,
                estimated_elements: r.try_get::<i64, _>("estimated_elements").map_err(query_failed)?
                    as u64,
                complexity: complexity.parse().map_err(StoreError::QueryFailed)?,
                estimated_transactions: r
                    .try_get::<i64, _>("estimated_transactions")
                    .map_err(query_failed)? as u64,
                estimated_cost_percentage: r
                    .try_get("estimated_cost_percentage")
                    .map_err(query_failed)?,
            })
        }
        None => None,
    };

    let completed_at: Option<DateTime<Utc>> = r.try_get("completed_at").map_err(query_failed)?;
    let result = match completed_at {
        Some(completed_at) => Some(ProcessingResult {
            result_key: r
                .try_get::<Option<String>, _>("result_key")
                .map_err(query_failed)?
                .map(StorageKey::from_raw),
            duration_seconds: r.try_get("duration_seconds").map_err(query_failed)?,
            completed_at,
        }),
        None => None,
    };

    Ok(Job {
        id: JobId::from_uuid(r.try_get("id").map_err(query_failed)?),
        owner_id: OwnerId::new(r.try_get::<String, _>("owner_id").map_err(query_failed)?),
        status,
        file: FileMetadata {
            name: r.try_get("file_name").map_err(query_failed)?,
            size_bytes: r.try_get::<i64, _>("file_size_bytes").map_err(query_failed)? as u64,
            storage_key: StorageKey::from_raw(
                r.try_get::<String, _>("storage_key").map_err(query_failed)?,
            ),
        },
        analysis,
        result,
        error_message: r.try_get("error_message").map_err(query_failed)?,
        created_at: r.try_get("created_at").map_err(query_failed)?,
        updated_at: r.try_get("updated_at").map_err(query_failed)?,
        expires_at: r.try_get("expires_at").map_err(query_failed)?,
    })
}

#[async_trait]
impl JobStore for PgJobStore {
    #[instrument(skip(self, job), fields(job_id = %job.id))]
    async fn put(&self, job: &Job) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO jobs (id, owner_id, status, file_name, file_size_bytes, storage_key,
                              error_message, created_at, updated_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(job.id.as_uuid())
        .bind(job.owner_id.as_str())
        .bind(job.status.as_str())
        .bind(&job.file.name)
        .bind(job.file.size_bytes as i64)
        .bind(job.file.storage_key.as_str())
        .bind(&job.error_message)
        .bind(job.created_at)
        .bind(job.updated_at)
        .bind(job.expires_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if violates_active_job_constraint(&e) => {
                Err(self.active_job_error(&job.owner_id, job.id).await)
            }
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StoreError::ConstraintViolation(db.message().to_string()))
            }
            Err(e) => Err(query_failed(e)),
        }
    }

    #[instrument(skip(self), fields(job_id = %id))]
    async fn get(&self, id: JobId) -> Result<Option<Job>, StoreError> {
        let row = sqlx::query(&format!("SELECT {} FROM jobs WHERE id = $1", JOB_COLUMNS))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(query_failed)?;

        row.as_ref().map(row_to_job).transpose()
    }

    #[instrument(skip(self, expected, fields), fields(job_id = %id, next = %next))]
    async fn update_status(
        &self,
        id: JobId,
        expected: &[JobStatus],
        next: JobStatus,
        fields: JobFields,
    ) -> Result<Job, StoreError> {
        let expected: Vec<String> = expected.iter().map(|s| s.as_str().to_string()).collect();

        let mut qb = QueryBuilder::<Postgres>::new("UPDATE jobs SET status = ");
        qb.push_bind(next.as_str());
        qb.push(", updated_at = ").push_bind(Utc::now());

        if next == JobStatus::Analyzing {
            qb.push(
                ", page_count = NULL, sampled_pages = NULL, avg_elements_per_page = NULL, \
                 estimated_elements = NULL, complexity = NULL, estimated_transactions = NULL, \
                 estimated_cost_percentage = NULL, error_message = NULL",
            );
        }
        if let Some(a) = fields.analysis {
            qb.push(", page_count = ").push_bind(a.page_count as i32);
            qb.push(", sampled_pages = ").push_bind(a.sampled_pages as i32);
            qb.push(", avg_elements_per_page = ").push_bind(a.avg_elements_per_page);
            qb.push(", estimated_elements = ").push_bind(a.estimated_elements as i64);
            qb.push(", complexity = ").push_bind(a.complexity.as_str());
            qb.push(", estimated_transactions = ").push_bind(a.estimated_transactions as i64);
            qb.push(", estimated_cost_percentage = ").push_bind(a.estimated_cost_percentage);
        }
        if let Some(r) = fields.result {
            qb.push(", result_key = ").push_bind(r.result_key.map(|k| k.as_str().to_string()));
            qb.push(", duration_seconds = ").push_bind(r.duration_seconds);
            qb.push(", completed_at = ").push_bind(r.completed_at);
        }
        if let Some(message) = fields.error_message {
            qb.push(", error_message = ").push_bind(message);
        }

        qb.push(" WHERE id = ").push_bind(id.as_uuid());
        qb.push(" AND status = ANY(").push_bind(expected).push(")");
        qb.push(" RETURNING ").push(JOB_COLUMNS);

        match qb.build().fetch_optional(&self.pool).await {
            Ok(Some(row)) => row_to_job(&row),
            Ok(None) => match self.current_row(id).await? {
                Some((current, _)) => Err(StoreError::Conflict { id, current }),
                None => Err(StoreError::NotFound(id)),
            },
            Err(e) if violates_active_job_constraint(&e) => match self.current_row(id).await? {
                Some((_, owner)) => Err(self.active_job_error(&owner, id).await),
                None => Err(StoreError::NotFound(id)),
            },
            Err(e) => Err(query_failed(e)),
        }
    }

    #[instrument(skip(self, cursor), fields(owner_id = %owner))]
    async fn query_by_owner(
        &self,
        owner: &OwnerId,
        cursor: Option<&PageCursor>,
        limit: usize,
    ) -> Result<JobPage, StoreError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM jobs
            WHERE owner_id = $1
              AND ($2::timestamptz IS NULL OR (created_at, id) < ($2, $3))
            ORDER BY created_at DESC, id DESC
            LIMIT $4
            "#,
            JOB_COLUMNS
        ))
        .bind(owner.as_str())
        .bind(cursor.map(|c| c.created_at))
        .bind(cursor.map(|c| c.id.as_uuid()))
        .bind(limit as i64 + 1)
        .fetch_all(&self.pool)
        .await
        .map_err(query_failed)?;

        let mut jobs = rows.iter().map(row_to_job).collect::<Result<Vec<_>, _>>()?;
        let has_more = jobs.len() > limit;
        jobs.truncate(limit);
        let next_cursor = if has_more {
            jobs.last().map(PageCursor::after)
        } else {
            None
        };

        Ok(JobPage { jobs, next_cursor })
    }

    #[instrument(skip(self), fields(job_id = %id))]
    async fn delete(&self, id: JobId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(query_failed)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(status = %status))]
    async fn list_by_status(&self, status: JobStatus) -> Result<Vec<Job>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM jobs WHERE status = $1 ORDER BY created_at DESC",
            JOB_COLUMNS
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(query_failed)?;

        rows.iter().map(row_to_job).collect()
    }

    #[instrument(skip(self))]
    async fn list_expired(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<Job>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM jobs WHERE expires_at <= $1 ORDER BY expires_at ASC LIMIT $2",
            JOB_COLUMNS
        ))
        .bind(now)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(query_failed)?;

        rows.iter().map(row_to_job).collect()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;
        Ok(())
    }
}
