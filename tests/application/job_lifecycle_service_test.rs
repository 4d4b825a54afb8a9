use std::sync::Arc;

use remediate::application::ports::{DocumentStore, JobStore, RemediationPipeline};
use remediate::application::services::{
    JobLifecycleService, LifecycleError, LifecyclePolicy, NewJob, Transition,
};
use remediate::domain::{Complexity, JobStatus, StorageKey};
use remediate::infrastructure::analysis::MockAnalyzer;
use remediate::infrastructure::persistence::InMemoryJobStore;
use remediate::infrastructure::remediation::MockRemediationPipeline;
use remediate::infrastructure::storage::ObjectDocumentStore;

use crate::helpers::{FlakyDocumentStore, TestServices, new_job, owner};

#[tokio::test]
async fn given_uploaded_job_when_analyzed_then_processed_and_completed_then_result_recorded() {
    let services = TestServices::new();
    let alice = owner("alice");
    let job = services.uploaded_job(&alice, "pdf/alice/report.pdf").await;
    assert_eq!(job.status, JobStatus::Uploaded);

    let analyzed = services.lifecycle.analyze(job.id, &alice).await.unwrap();
    assert_eq!(analyzed.status, JobStatus::AnalysisComplete);
    let analysis = analyzed.analysis.expect("analysis recorded");
    assert_eq!(analysis.page_count, 10);
    assert_eq!(analysis.complexity, Complexity::Moderate);
    assert_eq!(analysis.estimated_transactions, 100);

    let processing = services
        .lifecycle
        .start_processing(job.id, &alice)
        .await
        .unwrap();
    assert_eq!(processing.status, JobStatus::Processing);

    let dispatched = services.pipeline.dispatched();
    assert_eq!(dispatched.len(), 1);
    assert_eq!(dispatched[0].correlation_id, job.id.to_string());
    assert_eq!(dispatched[0].storage_key, "pdf/alice/report.pdf");

    services.complete(job.id, "result/COMPLIANT_report.pdf").await;

    let completed = services.lifecycle.get(job.id, &alice).await.unwrap();
    assert_eq!(completed.status, JobStatus::Completed);
    let result = completed.result.expect("result recorded");
    assert_eq!(
        result.result_key,
        Some(StorageKey::from_raw("result/COMPLIANT_report.pdf"))
    );
    assert!(completed.analysis.is_some());
}

#[tokio::test]
async fn given_uploaded_job_when_processing_without_analysis_then_dispatched() {
    let services = TestServices::new();
    let alice = owner("alice");
    let job = services.uploaded_job(&alice, "pdf/alice/direct.pdf").await;

    let processing = services
        .lifecycle
        .start_processing(job.id, &alice)
        .await
        .unwrap();

    assert_eq!(processing.status, JobStatus::Processing);
    assert!(processing.analysis.is_none());
    assert_eq!(services.pipeline.dispatch_count(), 1);
}

#[tokio::test]
async fn given_analysis_complete_when_reanalyzing_then_estimate_replaced() {
    let services = TestServices::new();
    let alice = owner("alice");
    let job = services.uploaded_job(&alice, "pdf/alice/again.pdf").await;
    services.lifecycle.analyze(job.id, &alice).await.unwrap();

    let transition = services
        .lifecycle
        .begin_analysis(job.id, &alice)
        .await
        .unwrap();

    assert!(transition.was_applied());
    assert_eq!(transition.job().status, JobStatus::Analyzing);
    assert!(transition.job().analysis.is_none());

    let analyzed = services
        .lifecycle
        .run_analysis(transition.into_job())
        .await
        .unwrap();
    assert_eq!(analyzed.status, JobStatus::AnalysisComplete);
}

#[tokio::test]
async fn given_analyzing_job_when_analyze_repeated_then_unchanged_no_op() {
    let services = TestServices::new();
    let alice = owner("alice");
    let job = services.uploaded_job(&alice, "pdf/alice/twice.pdf").await;

    let first = services
        .lifecycle
        .begin_analysis(job.id, &alice)
        .await
        .unwrap();
    let second = services
        .lifecycle
        .begin_analysis(job.id, &alice)
        .await
        .unwrap();

    assert!(first.was_applied());
    assert!(matches!(second, Transition::Unchanged(_)));
    assert_eq!(second.job().updated_at, first.job().updated_at);
}

#[tokio::test]
async fn given_processing_job_when_start_repeated_then_dispatched_once() {
    let services = TestServices::new();
    let alice = owner("alice");
    let job = services.processing_job(&alice, "pdf/alice/once.pdf").await;

    let again = services
        .lifecycle
        .start_processing(job.id, &alice)
        .await
        .unwrap();

    assert_eq!(again.status, JobStatus::Processing);
    assert_eq!(services.pipeline.dispatch_count(), 1);
}

#[tokio::test]
async fn given_completed_job_when_starting_processing_then_invalid_state_and_unchanged() {
    let services = TestServices::new();
    let alice = owner("alice");
    let job = services.processing_job(&alice, "pdf/alice/done.pdf").await;
    services.complete(job.id, "result/done.pdf").await;
    let before = services.lifecycle.get(job.id, &alice).await.unwrap();

    let err = services
        .lifecycle
        .start_processing(job.id, &alice)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        LifecycleError::InvalidState {
            current: JobStatus::Completed,
            target: JobStatus::Processing,
            ..
        }
    ));
    let after = services.lifecycle.get(job.id, &alice).await.unwrap();
    assert_eq!(after, before);
    assert_eq!(services.pipeline.dispatch_count(), 1);
}

#[tokio::test]
async fn given_job_of_other_owner_when_accessed_then_forbidden() {
    let services = TestServices::new();
    let alice = owner("alice");
    let mallory = owner("mallory");
    let job = services.uploaded_job(&alice, "pdf/alice/private.pdf").await;

    let get = services.lifecycle.get(job.id, &mallory).await.unwrap_err();
    let analyze = services.lifecycle.analyze(job.id, &mallory).await.unwrap_err();
    let cancel = services
        .lifecycle
        .cancel(job.id, &mallory, true)
        .await
        .unwrap_err();
    let delete = services
        .lifecycle
        .delete(job.id, &mallory, true)
        .await
        .unwrap_err();

    assert!(matches!(get, LifecycleError::Forbidden(_)));
    assert!(matches!(analyze, LifecycleError::Forbidden(_)));
    assert!(matches!(cancel, LifecycleError::Forbidden(_)));
    assert!(matches!(delete, LifecycleError::Forbidden(_)));
    assert!(services.object_exists("pdf/alice/private.pdf").await);
    assert_eq!(
        services.lifecycle.get(job.id, &alice).await.unwrap().status,
        JobStatus::Uploaded
    );
}

#[tokio::test]
async fn given_owner_with_processing_job_when_analyzing_another_then_active_job_exists() {
    let services = TestServices::new();
    let alice = owner("alice");
    let active = services.processing_job(&alice, "pdf/alice/first.pdf").await;
    let second = services.uploaded_job(&alice, "pdf/alice/second.pdf").await;

    let err = services
        .lifecycle
        .analyze(second.id, &alice)
        .await
        .unwrap_err();

    assert!(matches!(err, LifecycleError::ActiveJobExists(id) if id == active.id));
    assert_eq!(
        services.lifecycle.get(second.id, &alice).await.unwrap().status,
        JobStatus::Uploaded
    );
}

#[tokio::test]
async fn given_other_owner_with_active_job_when_processing_then_not_blocked() {
    let services = TestServices::new();
    services
        .processing_job(&owner("bob"), "pdf/bob/one.pdf")
        .await;

    let alice = owner("alice");
    let job = services.uploaded_job(&alice, "pdf/alice/one.pdf").await;
    let processing = services
        .lifecycle
        .start_processing(job.id, &alice)
        .await
        .unwrap();

    assert_eq!(processing.status, JobStatus::Processing);
}

#[tokio::test]
async fn given_failing_worker_when_starting_processing_then_upstream_failure_and_job_failed() {
    let services = TestServices::with_pipeline(MockRemediationPipeline::failing("worker down"));
    let alice = owner("alice");
    let job = services.uploaded_job(&alice, "pdf/alice/doomed.pdf").await;

    let err = services
        .lifecycle
        .start_processing(job.id, &alice)
        .await
        .unwrap_err();

    assert!(matches!(err, LifecycleError::UpstreamFailure(_)));
    let failed = services.lifecycle.get(job.id, &alice).await.unwrap();
    assert_eq!(failed.status, JobStatus::Failed);
    assert!(
        failed
            .error_message
            .unwrap()
            .contains("Failed to start remediation")
    );
}

#[tokio::test]
async fn given_missing_upload_when_analyzing_then_job_failed_with_reason() {
    let services = TestServices::new();
    let alice = owner("alice");
    let job = services
        .lifecycle
        .create(&alice, new_job("pdf/alice/never-uploaded.pdf"))
        .await
        .unwrap();

    let analyzed = services.lifecycle.analyze(job.id, &alice).await.unwrap();

    assert_eq!(analyzed.status, JobStatus::Failed);
    assert!(analyzed.analysis.is_none());
    assert!(
        analyzed
            .error_message
            .unwrap()
            .starts_with("Failed to read document")
    );
}

#[tokio::test]
async fn given_job_cancelled_during_analysis_when_estimate_arrives_then_cancellation_kept() {
    let services = TestServices::new();
    let alice = owner("alice");
    let job = services.uploaded_job(&alice, "pdf/alice/raced.pdf").await;

    let analyzing = services
        .lifecycle
        .begin_analysis(job.id, &alice)
        .await
        .unwrap()
        .into_job();
    services
        .lifecycle
        .cancel(job.id, &alice, false)
        .await
        .unwrap();

    let settled = services.lifecycle.run_analysis(analyzing).await.unwrap();

    assert_eq!(settled.status, JobStatus::Cancelled);
    assert!(settled.analysis.is_none());
}

#[tokio::test]
async fn given_processing_job_when_cancelled_then_late_completion_ignored() {
    let services = TestServices::new();
    let alice = owner("alice");
    let job = services.processing_job(&alice, "pdf/alice/cancel.pdf").await;

    let cancelled = services
        .lifecycle
        .cancel(job.id, &alice, false)
        .await
        .unwrap();
    services.complete(job.id, "result/late.pdf").await;

    assert_eq!(cancelled.status, JobStatus::Cancelled);
    let after = services.lifecycle.get(job.id, &alice).await.unwrap();
    assert_eq!(after.status, JobStatus::Cancelled);
    assert!(after.result.is_none());
}

#[tokio::test]
async fn given_cancelled_job_when_cancel_repeated_then_no_op() {
    let services = TestServices::new();
    let alice = owner("alice");
    let job = services.uploaded_job(&alice, "pdf/alice/cc.pdf").await;
    let first = services
        .lifecycle
        .cancel(job.id, &alice, false)
        .await
        .unwrap();

    let second = services
        .lifecycle
        .cancel(job.id, &alice, false)
        .await
        .unwrap();

    assert_eq!(second, first);
}

#[tokio::test]
async fn given_completed_job_when_cancelled_then_invalid_state() {
    let services = TestServices::new();
    let alice = owner("alice");
    let job = services.processing_job(&alice, "pdf/alice/finished.pdf").await;
    services.complete(job.id, "result/finished.pdf").await;

    let err = services
        .lifecycle
        .cancel(job.id, &alice, false)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        LifecycleError::InvalidState {
            current: JobStatus::Completed,
            ..
        }
    ));
}

#[tokio::test]
async fn given_cancel_with_delete_file_when_cancelled_then_upload_removed() {
    let services = TestServices::new();
    let alice = owner("alice");
    let job = services.uploaded_job(&alice, "pdf/alice/discard.pdf").await;

    services
        .lifecycle
        .cancel(job.id, &alice, true)
        .await
        .unwrap();

    assert!(!services.object_exists("pdf/alice/discard.pdf").await);
}

#[tokio::test]
async fn given_completed_job_when_deleted_then_every_artifact_removed() {
    let services = TestServices::new();
    let alice = owner("alice");
    let job = services.processing_job(&alice, "pdf/alice/full.pdf").await;
    services.seed_object("result/full.pdf", b"out").await;
    services
        .seed_object("temp/full_accessibility_report.json", b"{}")
        .await;
    services.seed_object("pdf/alice/full_chunk_1.pdf", b"c1").await;
    services.seed_object("pdf/alice/full_chunk_2.pdf", b"c2").await;
    services.complete(job.id, "result/full.pdf").await;

    let report = services.lifecycle.delete(job.id, &alice, true).await.unwrap();

    assert!(!report.is_partial());
    let deleted: Vec<&str> = report
        .deleted_storage_keys
        .iter()
        .map(|k| k.as_str())
        .collect();
    assert_eq!(
        deleted,
        vec![
            "pdf/alice/full.pdf",
            "result/full.pdf",
            "temp/full_accessibility_report.json",
            "pdf/alice/full_chunk_1.pdf",
            "pdf/alice/full_chunk_2.pdf",
        ]
    );
    assert!(matches!(
        services.lifecycle.get(job.id, &alice).await,
        Err(LifecycleError::NotFound(_))
    ));
}

#[tokio::test]
async fn given_undeletable_result_when_deleting_then_record_removed_and_failure_reported() {
    let backing = Arc::new(ObjectDocumentStore::in_memory());
    let flaky = Arc::new(FlakyDocumentStore::new(
        Arc::clone(&backing) as Arc<dyn DocumentStore>,
        &["result/locked.pdf"],
    ));
    let services = TestServices::with_document_store(flaky, backing);
    let alice = owner("alice");
    let job = services.processing_job(&alice, "pdf/alice/locked.pdf").await;
    services.seed_object("result/locked.pdf", b"out").await;
    services.complete(job.id, "result/locked.pdf").await;

    let report = services.lifecycle.delete(job.id, &alice, true).await.unwrap();

    assert!(report.is_partial());
    assert_eq!(report.failed_storage_keys.len(), 1);
    assert_eq!(report.failed_storage_keys[0].key.as_str(), "result/locked.pdf");
    assert_eq!(report.deleted_storage_keys.len(), 1);
    assert!(services.jobs.is_empty().await);
    assert!(services.object_exists("result/locked.pdf").await);
}

#[tokio::test]
async fn given_cleanup_disabled_when_deleting_then_objects_kept() {
    let services = TestServices::new();
    let alice = owner("alice");
    let job = services.uploaded_job(&alice, "pdf/alice/keep.pdf").await;

    let report = services
        .lifecycle
        .delete(job.id, &alice, false)
        .await
        .unwrap();

    assert!(report.deleted_storage_keys.is_empty());
    assert!(services.object_exists("pdf/alice/keep.pdf").await);
    assert!(services.jobs.is_empty().await);
}

#[tokio::test]
async fn given_deleted_job_when_deleted_again_then_not_found() {
    let services = TestServices::new();
    let alice = owner("alice");
    let job = services.uploaded_job(&alice, "pdf/alice/gone.pdf").await;
    services.lifecycle.delete(job.id, &alice, true).await.unwrap();

    let err = services
        .lifecycle
        .delete(job.id, &alice, true)
        .await
        .unwrap_err();

    assert!(matches!(err, LifecycleError::NotFound(_)));
}

#[tokio::test]
async fn given_blank_file_name_when_creating_then_invalid_request() {
    let services = TestServices::new();

    let err = services
        .lifecycle
        .create(
            &owner("alice"),
            NewJob {
                file_name: "  ".to_string(),
                storage_key: StorageKey::from_raw("pdf/x.pdf"),
                size_bytes: None,
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, LifecycleError::InvalidRequest(_)));
    assert!(services.jobs.is_empty().await);
}

#[tokio::test]
async fn given_no_size_when_creating_then_size_read_from_storage() {
    let services = TestServices::new();
    services.seed_object("pdf/alice/sized.pdf", b"0123456789").await;

    let job = services
        .lifecycle
        .create(
            &owner("alice"),
            NewJob {
                file_name: "sized.pdf".to_string(),
                storage_key: StorageKey::from_raw("pdf/alice/sized.pdf"),
                size_bytes: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(job.file.size_bytes, 10);
}

#[tokio::test]
async fn given_many_jobs_when_listing_pages_then_newest_first_without_gaps() {
    let services = TestServices::new();
    let alice = owner("alice");
    let mut created = Vec::new();
    for i in 0..7 {
        let job = services
            .lifecycle
            .create(&alice, new_job(&format!("pdf/alice/{i}.pdf")))
            .await
            .unwrap();
        created.push(job.id);
    }
    services
        .lifecycle
        .create(&owner("bob"), new_job("pdf/bob/0.pdf"))
        .await
        .unwrap();

    let mut seen = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0;
    loop {
        let page = services
            .lifecycle
            .list(&alice, cursor.as_deref(), Some(3))
            .await
            .unwrap();
        pages += 1;
        seen.extend(page.jobs.iter().map(|j| j.id));
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    created.reverse();
    assert_eq!(pages, 3);
    assert_eq!(seen, created);
}

#[tokio::test]
async fn given_garbage_cursor_when_listing_then_invalid_request() {
    let services = TestServices::new();

    let err = services
        .lifecycle
        .list(&owner("alice"), Some("not-a-cursor"), None)
        .await
        .unwrap_err();

    assert!(matches!(err, LifecycleError::InvalidRequest(_)));
}

#[tokio::test]
async fn given_five_page_upload_when_analyzed_then_fifty_transactions_estimated() {
    let services = TestServices::with_analyzer(MockAnalyzer::new(5, 8));
    let alice = owner("alice");
    services.seed_object("pdf/alice/short.pdf", b"%PDF-1.7 short").await;
    let job = services
        .lifecycle
        .create(
            &alice,
            NewJob {
                file_name: "short.pdf".to_string(),
                storage_key: StorageKey::from_raw("pdf/alice/short.pdf"),
                size_bytes: Some(2_000_000),
            },
        )
        .await
        .unwrap();
    assert_eq!(job.status, JobStatus::Uploaded);

    let analyzed = services.lifecycle.analyze(job.id, &alice).await.unwrap();

    assert_eq!(analyzed.status, JobStatus::AnalysisComplete);
    assert_eq!(analyzed.file.size_bytes, 2_000_000);
    let analysis = analyzed.analysis.expect("analysis recorded");
    assert_eq!(analysis.page_count, 5);
    assert_eq!(analysis.sampled_pages, 3);
    assert_eq!(analysis.complexity, Complexity::Simple);
    assert_eq!(analysis.estimated_transactions, 50);
    assert!((analysis.estimated_cost_percentage - 0.2).abs() < f64::EPSILON);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn given_uploaded_job_when_analyze_requested_twice_concurrently_then_one_transition() {
    let services = TestServices::new();
    let alice = owner("alice");
    let job = services.uploaded_job(&alice, "pdf/alice/race.pdf").await;

    let (first, second) = {
        let a = Arc::clone(&services.lifecycle);
        let b = Arc::clone(&services.lifecycle);
        let (owner_a, owner_b) = (alice.clone(), alice.clone());
        let id = job.id;
        tokio::join!(
            tokio::spawn(async move { a.begin_analysis(id, &owner_a).await }),
            tokio::spawn(async move { b.begin_analysis(id, &owner_b).await }),
        )
    };
    let first = first.unwrap().unwrap();
    let second = second.unwrap().unwrap();

    let applied = [&first, &second]
        .iter()
        .filter(|t| t.was_applied())
        .count();
    assert_eq!(applied, 1);
    assert_eq!(first.job().status, JobStatus::Analyzing);
    assert_eq!(second.job().status, JobStatus::Analyzing);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn given_uploaded_job_when_processing_requested_twice_concurrently_then_dispatched_once() {
    let services = TestServices::new();
    let alice = owner("alice");
    let job = services.uploaded_job(&alice, "pdf/alice/double.pdf").await;

    let (first, second) = {
        let a = Arc::clone(&services.lifecycle);
        let b = Arc::clone(&services.lifecycle);
        let (owner_a, owner_b) = (alice.clone(), alice.clone());
        let id = job.id;
        tokio::join!(
            tokio::spawn(async move { a.start_processing(id, &owner_a).await }),
            tokio::spawn(async move { b.start_processing(id, &owner_b).await }),
        )
    };

    assert_eq!(first.unwrap().unwrap().status, JobStatus::Processing);
    assert_eq!(second.unwrap().unwrap().status, JobStatus::Processing);
    assert_eq!(services.pipeline.dispatch_count(), 1);
}

#[tokio::test]
async fn given_zero_max_page_size_when_listing_then_single_job_pages() {
    let jobs = Arc::new(InMemoryJobStore::new());
    let documents = Arc::new(ObjectDocumentStore::in_memory());
    let lifecycle = JobLifecycleService::new(
        Arc::clone(&jobs) as Arc<dyn JobStore>,
        documents as Arc<dyn DocumentStore>,
        Arc::new(MockAnalyzer::default()),
        Arc::new(MockRemediationPipeline::new()) as Arc<dyn RemediationPipeline>,
        LifecyclePolicy {
            max_page_size: 0,
            ..LifecyclePolicy::default()
        },
    );
    let alice = owner("alice");
    for i in 0..2 {
        lifecycle
            .create(&alice, new_job(&format!("pdf/alice/{i}.pdf")))
            .await
            .unwrap();
    }

    let page = lifecycle.list(&alice, None, Some(50)).await.unwrap();

    assert_eq!(page.jobs.len(), 1);
    assert!(page.next_cursor.is_some());
}
