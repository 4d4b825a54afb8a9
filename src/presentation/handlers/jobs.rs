use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};

use crate::application::services::{CleanupReport, NewJob, Transition};
use crate::domain::{Job, JobId, StorageKey};
use crate::presentation::state::AppState;

use super::{ApiError, Owner};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    pub file_name: String,
    pub storage_key: String,
    #[serde(default)]
    pub size_bytes: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobActionRequest {
    pub job_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelJobRequest {
    pub job_id: String,
    #[serde(default)]
    pub delete_file: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteJobRequest {
    #[serde(default = "default_cleanup")]
    pub cleanup_storage: bool,
}

fn default_cleanup() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    pub cursor: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListJobsResponse {
    pub jobs: Vec<Job>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedKey {
    pub key: String,
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteJobResponse {
    pub job_id: String,
    pub deleted_storage_keys: Vec<String>,
    pub failed_storage_keys: Vec<FailedKey>,
}

impl From<CleanupReport> for DeleteJobResponse {
    fn from(report: CleanupReport) -> Self {
        Self {
            job_id: report.job_id.to_string(),
            deleted_storage_keys: report
                .deleted_storage_keys
                .into_iter()
                .map(|k| k.to_string())
                .collect(),
            failed_storage_keys: report
                .failed_storage_keys
                .into_iter()
                .map(|f| FailedKey {
                    key: f.key.to_string(),
                    error: f.error,
                })
                .collect(),
        }
    }
}

fn parse_job_id(raw: &str) -> Result<JobId, ApiError> {
    raw.trim().parse().map_err(ApiError::bad_request)
}

#[tracing::instrument(skip(state, body), fields(owner_id = %owner.0))]
pub async fn create_job_handler(
    State(state): State<AppState>,
    owner: Owner,
    body: Result<Json<CreateJobRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body?;
    let job = state
        .lifecycle
        .create(
            &owner.0,
            NewJob {
                file_name: request.file_name,
                storage_key: StorageKey::from_raw(request.storage_key.trim()),
                size_bytes: request.size_bytes,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(job)))
}

#[tracing::instrument(skip(state, query), fields(owner_id = %owner.0))]
pub async fn list_jobs_handler(
    State(state): State<AppState>,
    owner: Owner,
    Query(query): Query<ListJobsQuery>,
) -> Result<Json<ListJobsResponse>, ApiError> {
    let listing = state
        .lifecycle
        .list(&owner.0, query.cursor.as_deref(), query.limit)
        .await?;
    Ok(Json(ListJobsResponse {
        jobs: listing.jobs,
        next_cursor: listing.next_cursor,
    }))
}

#[tracing::instrument(skip(state), fields(owner_id = %owner.0))]
pub async fn get_job_handler(
    State(state): State<AppState>,
    owner: Owner,
    Path(job_id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    let id = parse_job_id(&job_id)?;
    Ok(Json(state.lifecycle.get(id, &owner.0).await?))
}

/// The body is optional; an empty one means full storage cleanup.
#[tracing::instrument(skip(state, body), fields(owner_id = %owner.0))]
pub async fn delete_job_handler(
    State(state): State<AppState>,
    owner: Owner,
    Path(job_id): Path<String>,
    body: Bytes,
) -> Result<Json<DeleteJobResponse>, ApiError> {
    let id = parse_job_id(&job_id)?;
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        DeleteJobRequest {
            cleanup_storage: true,
        }
    } else {
        serde_json::from_slice::<DeleteJobRequest>(&body)
            .map_err(|e| ApiError::bad_request(format!("Invalid delete request: {}", e)))?
    };

    let report = state
        .lifecycle
        .delete(id, &owner.0, request.cleanup_storage)
        .await?;
    Ok(Json(report.into()))
}

/// Moves the job to ANALYZING and answers at once; the estimate is written by
/// a background task and picked up by polling.
#[tracing::instrument(skip(state, body), fields(owner_id = %owner.0))]
pub async fn analyze_job_handler(
    State(state): State<AppState>,
    owner: Owner,
    body: Result<Json<JobActionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body?;
    let id = parse_job_id(&request.job_id)?;

    let job = match state.lifecycle.begin_analysis(id, &owner.0).await? {
        Transition::Applied(job) => {
            let lifecycle = Arc::clone(&state.lifecycle);
            let snapshot = job.clone();
            tokio::spawn(async move {
                if let Err(e) = lifecycle.run_analysis(snapshot).await {
                    tracing::error!(error = %e, "Background analysis failed");
                }
            });
            job
        }
        Transition::Unchanged(job) => job,
    };

    Ok((StatusCode::ACCEPTED, Json(job)))
}

#[tracing::instrument(skip(state, body), fields(owner_id = %owner.0))]
pub async fn start_processing_handler(
    State(state): State<AppState>,
    owner: Owner,
    body: Result<Json<JobActionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body?;
    let id = parse_job_id(&request.job_id)?;
    let job = state.lifecycle.start_processing(id, &owner.0).await?;
    Ok((StatusCode::ACCEPTED, Json(job)))
}

#[tracing::instrument(skip(state, body), fields(owner_id = %owner.0))]
pub async fn cancel_job_handler(
    State(state): State<AppState>,
    owner: Owner,
    body: Result<Json<CancelJobRequest>, JsonRejection>,
) -> Result<Json<Job>, ApiError> {
    let Json(request) = body?;
    let id = parse_job_id(&request.job_id)?;
    let job = state
        .lifecycle
        .cancel(id, &owner.0, request.delete_file)
        .await?;
    Ok(Json(job))
}
