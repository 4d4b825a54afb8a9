use std::sync::Arc;

use chrono::Duration;
use tracing::instrument;

use crate::application::ports::{
    DocumentAnalyzer, DocumentStore, DocumentStoreError, JobStore, PageCursor, RemediationPipeline,
    RemediationRequest, StoreError,
};
use crate::domain::{
    AnalysisPolicy, DocumentAnalysis, FileMetadata, Job, JobFields, JobId, JobStatus, OwnerId,
    StorageKey,
};

use super::LifecycleError;

#[derive(Debug, Clone)]
pub struct LifecyclePolicy {
    pub retention: Duration,
    pub analysis: AnalysisPolicy,
    pub default_page_size: usize,
    pub max_page_size: usize,
}

impl Default for LifecyclePolicy {
    fn default() -> Self {
        Self {
            retention: Duration::days(7),
            analysis: AnalysisPolicy::default(),
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewJob {
    pub file_name: String,
    pub storage_key: StorageKey,
    pub size_bytes: Option<u64>,
}

/// Result of a requested status change. `Unchanged` means the job already sat
/// in the target status, so the request was a retry and nothing was written.
#[derive(Debug, Clone)]
pub enum Transition {
    Applied(Job),
    Unchanged(Job),
}

impl Transition {
    pub fn job(&self) -> &Job {
        match self {
            Transition::Applied(job) | Transition::Unchanged(job) => job,
        }
    }

    pub fn into_job(self) -> Job {
        match self {
            Transition::Applied(job) | Transition::Unchanged(job) => job,
        }
    }

    pub fn was_applied(&self) -> bool {
        matches!(self, Transition::Applied(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FailedDeletion {
    pub key: StorageKey,
    pub error: String,
}

/// Outcome of removing a job's storage objects. Failures are reported here and
/// never abort record removal.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanupReport {
    pub job_id: JobId,
    pub deleted_storage_keys: Vec<StorageKey>,
    pub failed_storage_keys: Vec<FailedDeletion>,
}

impl CleanupReport {
    fn new(job_id: JobId) -> Self {
        Self {
            job_id,
            deleted_storage_keys: Vec::new(),
            failed_storage_keys: Vec::new(),
        }
    }

    pub fn is_partial(&self) -> bool {
        !self.failed_storage_keys.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct JobListing {
    pub jobs: Vec<Job>,
    pub next_cursor: Option<String>,
}

/// Stateless handlers for every client-initiated job operation. Each call
/// verifies ownership and relies on the store's conditional write for race
/// safety; no lock is held while the analyzer or the worker is being called.
pub struct JobLifecycleService {
    jobs: Arc<dyn JobStore>,
    documents: Arc<dyn DocumentStore>,
    analyzer: Arc<dyn DocumentAnalyzer>,
    pipeline: Arc<dyn RemediationPipeline>,
    policy: LifecyclePolicy,
}

impl JobLifecycleService {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        documents: Arc<dyn DocumentStore>,
        analyzer: Arc<dyn DocumentAnalyzer>,
        pipeline: Arc<dyn RemediationPipeline>,
        policy: LifecyclePolicy,
    ) -> Self {
        Self {
            jobs,
            documents,
            analyzer,
            pipeline,
            policy,
        }
    }

    pub fn policy(&self) -> &LifecyclePolicy {
        &self.policy
    }

    /// Records an upload. The referenced object is not required to exist yet:
    /// the size is probed only when the caller did not supply it.
    #[instrument(skip(self, request), fields(owner_id = %owner, file_name = %request.file_name))]
    pub async fn create(&self, owner: &OwnerId, request: NewJob) -> Result<Job, LifecycleError> {
        if request.file_name.trim().is_empty() {
            return Err(LifecycleError::InvalidRequest("fileName is required".to_string()));
        }
        if request.storage_key.is_empty() {
            return Err(LifecycleError::InvalidRequest("storageKey is required".to_string()));
        }

        let size_bytes = match request.size_bytes {
            Some(size) => size,
            None => self.probe_size(&request.storage_key).await,
        };

        let job = Job::new(
            owner.clone(),
            FileMetadata {
                name: request.file_name,
                size_bytes,
                storage_key: request.storage_key,
            },
            self.policy.retention,
        );

        self.jobs.put(&job).await?;

        tracing::info!(job_id = %job.id, size_bytes, "Job created");
        Ok(job)
    }

    /// Runs the whole analysis inline. See [`Self::begin_analysis`] for the
    /// split used by the HTTP surface.
    pub async fn analyze(&self, id: JobId, owner: &OwnerId) -> Result<Job, LifecycleError> {
        match self.begin_analysis(id, owner).await? {
            Transition::Applied(job) => self.run_analysis(job).await,
            Transition::Unchanged(job) => Ok(job),
        }
    }

    #[instrument(skip(self), fields(job_id = %id, owner_id = %owner))]
    pub async fn begin_analysis(
        &self,
        id: JobId,
        owner: &OwnerId,
    ) -> Result<Transition, LifecycleError> {
        let job = self.owned(id, owner).await?;
        let transition = self
            .transition(job, JobStatus::Analyzing, JobFields::none())
            .await?;

        if transition.was_applied() {
            tracing::info!("Analysis started");
        } else {
            tracing::debug!("Analysis already running");
        }
        Ok(transition)
    }

    /// Measures a job that is already ANALYZING and writes the estimate, or
    /// FAILED when the document cannot be read.
    #[instrument(skip(self, job), fields(job_id = %job.id))]
    pub async fn run_analysis(&self, job: Job) -> Result<Job, LifecycleError> {
        let (next, fields) = match self.measure(&job).await {
            Ok(analysis) => {
                tracing::info!(
                    page_count = analysis.page_count,
                    complexity = %analysis.complexity,
                    estimated_transactions = analysis.estimated_transactions,
                    "Analysis complete"
                );
                (JobStatus::AnalysisComplete, JobFields::analysis(analysis))
            }
            Err(message) => {
                tracing::warn!(error = %message, "Analysis failed");
                (JobStatus::Failed, JobFields::error(message))
            }
        };

        match self
            .jobs
            .update_status(job.id, &[JobStatus::Analyzing], next, fields)
            .await
        {
            Ok(updated) => Ok(updated),
            Err(StoreError::Conflict { current, .. }) => {
                tracing::info!(current = %current, "Job left ANALYZING before the estimate was written");
                self.load(job.id).await
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Moves the job to PROCESSING and hands it to the remediation worker with
    /// the job id as correlation token. A dispatch error fails the job at once
    /// so nothing is left waiting for a completion that will never come.
    #[instrument(skip(self), fields(job_id = %id, owner_id = %owner))]
    pub async fn start_processing(&self, id: JobId, owner: &OwnerId) -> Result<Job, LifecycleError> {
        let job = self.owned(id, owner).await?;
        let job = match self
            .transition(job, JobStatus::Processing, JobFields::none())
            .await?
        {
            Transition::Applied(job) => job,
            Transition::Unchanged(job) => {
                tracing::debug!("Processing already started");
                return Ok(job);
            }
        };

        let request = RemediationRequest {
            correlation_id: job.id.to_string(),
            owner_id: job.owner_id.to_string(),
            storage_key: job.file.storage_key.to_string(),
            file_name: job.file.name.clone(),
        };

        let Err(dispatch_error) = self.pipeline.dispatch(&request).await else {
            tracing::info!("Remediation dispatched");
            return Ok(job);
        };

        let message = format!("Failed to start remediation: {}", dispatch_error);
        tracing::warn!(error = %dispatch_error, "Remediation dispatch failed, failing job");

        match self
            .jobs
            .update_status(
                job.id,
                &[JobStatus::Processing],
                JobStatus::Failed,
                JobFields::error(message.clone()),
            )
            .await
        {
            Ok(_) => {}
            Err(StoreError::Conflict { current, .. }) => {
                tracing::info!(current = %current, "Job settled before dispatch failure was recorded");
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to record dispatch failure");
            }
        }

        Err(LifecycleError::UpstreamFailure(message))
    }

    /// Logical cancel. A worker that was already dispatched keeps running; its
    /// completion signal is later dropped because the job is terminal.
    #[instrument(skip(self), fields(job_id = %id, owner_id = %owner))]
    pub async fn cancel(
        &self,
        id: JobId,
        owner: &OwnerId,
        delete_file: bool,
    ) -> Result<Job, LifecycleError> {
        let job = self.owned(id, owner).await?;

        let job = match self
            .transition(job, JobStatus::Cancelled, JobFields::none())
            .await
        {
            Ok(transition) => transition.into_job(),
            Err(LifecycleError::Conflict { id, current }) if current.is_terminal() => {
                tracing::info!(current = %current, "Cancel lost the race to a terminal status");
                return self.load(id).await;
            }
            Err(e) => return Err(e),
        };

        if delete_file && job.status == JobStatus::Cancelled {
            if let Err(e) = self.documents.delete(&job.file.storage_key).await {
                tracing::warn!(
                    error = %e,
                    key = %job.file.storage_key,
                    "Could not delete source upload of cancelled job"
                );
            }
        }

        tracing::info!("Job cancelled");
        Ok(job)
    }

    #[instrument(skip(self), fields(job_id = %id, owner_id = %owner))]
    pub async fn delete(
        &self,
        id: JobId,
        owner: &OwnerId,
        cleanup_storage: bool,
    ) -> Result<CleanupReport, LifecycleError> {
        let job = self.owned(id, owner).await?;

        let report = if cleanup_storage {
            self.cleanup_storage(&job).await
        } else {
            CleanupReport::new(job.id)
        };
        self.remove_record(job.id).await?;

        tracing::info!(
            deleted = report.deleted_storage_keys.len(),
            failed = report.failed_storage_keys.len(),
            "Job deleted"
        );
        Ok(report)
    }

    /// Removes an expired job regardless of owner or status.
    #[instrument(skip(self, job), fields(job_id = %job.id))]
    pub async fn purge(&self, job: &Job) -> Result<CleanupReport, LifecycleError> {
        let report = self.cleanup_storage(job).await;
        self.remove_record(job.id).await?;
        Ok(report)
    }

    pub async fn check_store(&self) -> Result<(), LifecycleError> {
        self.jobs.ping().await.map_err(LifecycleError::from)
    }

    #[instrument(skip(self), fields(job_id = %id, owner_id = %owner))]
    pub async fn get(&self, id: JobId, owner: &OwnerId) -> Result<Job, LifecycleError> {
        self.owned(id, owner).await
    }

    #[instrument(skip(self, cursor), fields(owner_id = %owner))]
    pub async fn list(
        &self,
        owner: &OwnerId,
        cursor: Option<&str>,
        limit: Option<usize>,
    ) -> Result<JobListing, LifecycleError> {
        let cursor = cursor
            .filter(|c| !c.trim().is_empty())
            .map(PageCursor::decode)
            .transpose()?;
        let limit = limit
            .unwrap_or(self.policy.default_page_size)
            .clamp(1, self.policy.max_page_size.max(1));

        let page = self
            .jobs
            .query_by_owner(owner, cursor.as_ref(), limit)
            .await?;

        Ok(JobListing {
            jobs: page.jobs,
            next_cursor: page.next_cursor.map(|c| c.encode()),
        })
    }

    async fn transition(
        &self,
        job: Job,
        target: JobStatus,
        fields: JobFields,
    ) -> Result<Transition, LifecycleError> {
        if job.status == target {
            return Ok(Transition::Unchanged(job));
        }
        if !job.status.can_transition_to(target) {
            return Err(LifecycleError::InvalidState {
                id: job.id,
                current: job.status,
                target,
            });
        }

        let sources = JobStatus::sources_of(target);
        match self
            .jobs
            .update_status(job.id, &sources, target, fields)
            .await
        {
            Ok(updated) => Ok(Transition::Applied(updated)),
            Err(StoreError::Conflict { id, current }) if current == target => {
                Ok(Transition::Unchanged(self.load(id).await?))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn owned(&self, id: JobId, owner: &OwnerId) -> Result<Job, LifecycleError> {
        let job = self.load(id).await?;
        if !job.is_owned_by(owner) {
            tracing::warn!(job_id = %id, owner_id = %owner, "Rejected access to job of another owner");
            return Err(LifecycleError::Forbidden(id));
        }
        Ok(job)
    }

    async fn load(&self, id: JobId) -> Result<Job, LifecycleError> {
        self.jobs
            .get(id)
            .await?
            .ok_or(LifecycleError::NotFound(id))
    }

    async fn remove_record(&self, id: JobId) -> Result<(), LifecycleError> {
        match self.jobs.delete(id).await {
            Ok(()) | Err(StoreError::NotFound(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn measure(&self, job: &Job) -> Result<DocumentAnalysis, String> {
        let data = self
            .documents
            .fetch(&job.file.storage_key)
            .await
            .map_err(|e| format!("Failed to read document: {}", e))?;

        let sample = self
            .analyzer
            .sample(&data, self.policy.analysis.sample_pages)
            .await
            .map_err(|e| format!("Failed to analyze document: {}", e))?;

        Ok(DocumentAnalysis::estimate(&sample, &self.policy.analysis))
    }

    async fn probe_size(&self, key: &StorageKey) -> u64 {
        match self.documents.head(key).await {
            Ok(size) => size,
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "Could not read upload size, recording 0");
                0
            }
        }
    }

    async fn cleanup_storage(&self, job: &Job) -> CleanupReport {
        let mut report = CleanupReport::new(job.id);
        let mut keys = job.derived_storage_keys();

        if !job.file.storage_key.is_empty() {
            match self
                .documents
                .list_prefix(&job.file.storage_key.chunk_prefix())
                .await
            {
                Ok(chunks) => keys.extend(chunks),
                Err(e) => tracing::warn!(error = %e, "Could not list chunk files"),
            }
        }

        for key in keys {
            match self.documents.delete(&key).await {
                Ok(()) => report.deleted_storage_keys.push(key),
                Err(DocumentStoreError::NotFound(_)) => {
                    tracing::debug!(key = %key, "Storage object already absent");
                }
                Err(e) => {
                    tracing::warn!(error = %e, key = %key, "Failed to delete storage object");
                    report.failed_storage_keys.push(FailedDeletion {
                        key,
                        error: e.to_string(),
                    });
                }
            }
        }

        report
    }
}
