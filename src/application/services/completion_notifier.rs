use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::application::ports::{JobStore, StoreError};
use crate::domain::{JobFields, JobId, JobStatus, ProcessingResult, StorageKey};

const DEFAULT_FAILURE_MESSAGE: &str = "Remediation pipeline failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionOutcome {
    Success,
    Failure,
}

/// Out-of-band signal emitted by the remediation worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionEvent {
    pub correlation_id: String,
    pub outcome: CompletionOutcome,
    #[serde(default)]
    pub result_key: Option<String>,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// What happened to a completion event. Only `Applied` touched the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionDisposition {
    Applied(JobStatus),
    UnknownJob,
    AlreadyTerminal(JobStatus),
    NotProcessing(JobStatus),
    StoreUnavailable,
}

impl CompletionDisposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionDisposition::Applied(_) => "APPLIED",
            CompletionDisposition::UnknownJob => "UNKNOWN_JOB",
            CompletionDisposition::AlreadyTerminal(_) => "ALREADY_TERMINAL",
            CompletionDisposition::NotProcessing(_) => "NOT_PROCESSING",
            CompletionDisposition::StoreUnavailable => "STORE_UNAVAILABLE",
        }
    }

    pub fn status(&self) -> Option<JobStatus> {
        match self {
            CompletionDisposition::Applied(status)
            | CompletionDisposition::AlreadyTerminal(status)
            | CompletionDisposition::NotProcessing(status) => Some(*status),
            CompletionDisposition::UnknownJob | CompletionDisposition::StoreUnavailable => None,
        }
    }
}

/// Applies worker completion signals as PROCESSING -> COMPLETED|FAILED.
///
/// The correlation token must be the job id; nothing else is used to find a
/// job. Events are never retried and never surface an error: duplicates and
/// late arrivals lose the conditional write and are dropped with a log line.
/// A job whose signal never arrives stays PROCESSING.
pub struct CompletionNotifier {
    jobs: Arc<dyn JobStore>,
}

impl CompletionNotifier {
    pub fn new(jobs: Arc<dyn JobStore>) -> Self {
        Self { jobs }
    }

    #[instrument(skip(self, event), fields(correlation_id = %event.correlation_id, outcome = ?event.outcome))]
    pub async fn handle(&self, event: CompletionEvent) -> CompletionDisposition {
        let Ok(id) = event.correlation_id.parse::<JobId>() else {
            tracing::warn!("Dropping completion: correlation id is not a job id");
            return CompletionDisposition::UnknownJob;
        };

        let (next, fields) = match event.outcome {
            CompletionOutcome::Success => (
                JobStatus::Completed,
                JobFields::result(ProcessingResult {
                    result_key: non_blank(event.result_key).map(StorageKey::from_raw),
                    duration_seconds: event.duration_seconds,
                    completed_at: Utc::now(),
                }),
            ),
            CompletionOutcome::Failure => (
                JobStatus::Failed,
                JobFields::error(
                    non_blank(event.error_message)
                        .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string()),
                ),
            ),
        };

        match self
            .jobs
            .update_status(id, &[JobStatus::Processing], next, fields)
            .await
        {
            Ok(job) => {
                tracing::info!(job_id = %id, status = %job.status, "Completion applied");
                CompletionDisposition::Applied(job.status)
            }
            Err(StoreError::NotFound(_)) => {
                tracing::warn!(job_id = %id, "Dropping completion for unknown job");
                CompletionDisposition::UnknownJob
            }
            Err(StoreError::Conflict { current, .. }) if current.is_terminal() => {
                tracing::info!(job_id = %id, current = %current, "Dropping completion for terminal job");
                CompletionDisposition::AlreadyTerminal(current)
            }
            Err(StoreError::Conflict { current, .. }) => {
                tracing::warn!(job_id = %id, current = %current, "Dropping completion for job that is not processing");
                CompletionDisposition::NotProcessing(current)
            }
            Err(e) => {
                tracing::error!(job_id = %id, error = %e, "Dropping completion: store unavailable");
                CompletionDisposition::StoreUnavailable
            }
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
