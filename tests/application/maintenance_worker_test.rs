use std::time::Duration;

use remediate::application::ports::JobStore;
use remediate::application::services::{MaintenanceConfig, MaintenanceWorker, SweepReport};
use remediate::domain::{FileMetadata, Job, JobStatus, StorageKey};

use crate::helpers::{TestServices, owner};

fn worker(services: &TestServices, stuck_after: Option<chrono::Duration>) -> MaintenanceWorker {
    MaintenanceWorker::new(
        services.jobs.clone(),
        services.lifecycle.clone(),
        MaintenanceConfig {
            interval: Duration::from_secs(60),
            purge_batch: 10,
            stuck_after,
        },
    )
}

#[tokio::test]
async fn given_expired_job_when_sweeping_then_record_and_upload_purged() {
    let services = TestServices::new();
    services.seed_object("pdf/alice/old.pdf", b"old").await;
    let expired = Job::new(
        owner("alice"),
        FileMetadata {
            name: "old.pdf".to_string(),
            size_bytes: 3,
            storage_key: StorageKey::from_raw("pdf/alice/old.pdf"),
        },
        chrono::Duration::seconds(-1),
    );
    services.jobs.put(&expired).await.unwrap();
    let fresh = services
        .uploaded_job(&owner("alice"), "pdf/alice/new.pdf")
        .await;

    let report = worker(&services, None).sweep_once().await.unwrap();

    assert_eq!(report, SweepReport { purged: 1, timed_out: 0 });
    assert!(services.jobs.get(expired.id).await.unwrap().is_none());
    assert!(services.jobs.get(fresh.id).await.unwrap().is_some());
    assert!(!services.object_exists("pdf/alice/old.pdf").await);
}

#[tokio::test]
async fn given_stuck_sweep_disabled_when_sweeping_then_processing_job_untouched() {
    let services = TestServices::new();
    let alice = owner("alice");
    let job = services.processing_job(&alice, "pdf/alice/slow.pdf").await;

    let report = worker(&services, None).sweep_once().await.unwrap();

    assert_eq!(report, SweepReport::default());
    assert_eq!(
        services.lifecycle.get(job.id, &alice).await.unwrap().status,
        JobStatus::Processing
    );
}

#[tokio::test]
async fn given_stuck_sweep_enabled_when_job_overdue_then_failed_with_timeout() {
    let services = TestServices::new();
    let alice = owner("alice");
    let job = services.processing_job(&alice, "pdf/alice/stuck.pdf").await;

    let report = worker(&services, Some(chrono::Duration::zero()))
        .sweep_once()
        .await
        .unwrap();

    assert_eq!(report.timed_out, 1);
    let job = services.lifecycle.get(job.id, &alice).await.unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(
        job.error_message.as_deref(),
        Some("Timed out waiting for remediation")
    );
}
