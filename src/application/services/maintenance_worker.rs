use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::application::ports::{JobStore, StoreError};
use crate::domain::{JobFields, JobStatus};

use super::JobLifecycleService;

#[derive(Debug, Clone)]
pub struct MaintenanceConfig {
    pub interval: Duration,
    pub purge_batch: usize,
    /// Jobs stuck in ANALYZING/PROCESSING longer than this are failed. `None`
    /// leaves them untouched.
    pub stuck_after: Option<chrono::Duration>,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            purge_batch: 100,
            stuck_after: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub purged: usize,
    pub timed_out: usize,
}

/// Background sweep that purges expired jobs and, when configured, fails jobs
/// that never left ANALYZING or PROCESSING.
pub struct MaintenanceWorker {
    jobs: Arc<dyn JobStore>,
    lifecycle: Arc<JobLifecycleService>,
    config: MaintenanceConfig,
}

impl MaintenanceWorker {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        lifecycle: Arc<JobLifecycleService>,
        config: MaintenanceConfig,
    ) -> Self {
        Self {
            jobs,
            lifecycle,
            config,
        }
    }

    pub async fn run(self) {
        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            stuck_sweep = self.config.stuck_after.is_some(),
            "Maintenance worker started"
        );
        let mut ticker = tokio::time::interval(self.config.interval);
        loop {
            ticker.tick().await;
            match self.sweep_once().await {
                Ok(report) if report == SweepReport::default() => {}
                Ok(report) => {
                    tracing::info!(purged = report.purged, timed_out = report.timed_out, "Sweep finished");
                }
                Err(e) => tracing::error!(error = %e, "Sweep failed"),
            }
        }
    }

    pub async fn sweep_once(&self) -> Result<SweepReport, StoreError> {
        let purged = self.purge_expired().await?;
        let timed_out = match self.config.stuck_after {
            Some(threshold) => self.fail_stuck(threshold).await?,
            None => 0,
        };
        Ok(SweepReport { purged, timed_out })
    }

    async fn purge_expired(&self) -> Result<usize, StoreError> {
        let expired = self
            .jobs
            .list_expired(Utc::now(), self.config.purge_batch)
            .await?;

        let mut purged = 0;
        for job in &expired {
            match self.lifecycle.purge(job).await {
                Ok(report) => {
                    if report.is_partial() {
                        tracing::warn!(
                            job_id = %job.id,
                            failed = report.failed_storage_keys.len(),
                            "Expired job purged with storage leftovers"
                        );
                    }
                    purged += 1;
                }
                Err(e) => tracing::warn!(job_id = %job.id, error = %e, "Failed to purge expired job"),
            }
        }
        Ok(purged)
    }

    async fn fail_stuck(&self, threshold: chrono::Duration) -> Result<usize, StoreError> {
        let cutoff = Utc::now() - threshold;
        let mut timed_out = 0;

        for (status, phase) in [
            (JobStatus::Analyzing, "analysis"),
            (JobStatus::Processing, "remediation"),
        ] {
            for job in self.jobs.list_by_status(status).await? {
                if job.updated_at > cutoff {
                    continue;
                }
                let message = format!("Timed out waiting for {}", phase);
                match self
                    .jobs
                    .update_status(job.id, &[status], JobStatus::Failed, JobFields::error(message))
                    .await
                {
                    Ok(_) => {
                        tracing::warn!(job_id = %job.id, status = %status, "Stuck job failed by sweep");
                        timed_out += 1;
                    }
                    Err(StoreError::Conflict { .. }) | Err(StoreError::NotFound(_)) => {}
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(timed_out)
    }
}
