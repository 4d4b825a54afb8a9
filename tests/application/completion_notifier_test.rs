use remediate::application::services::{
    CompletionDisposition, CompletionEvent, CompletionOutcome,
};
use remediate::domain::{JobId, JobStatus};

use crate::helpers::{TestServices, owner};

fn failure(correlation_id: String, message: Option<&str>) -> CompletionEvent {
    CompletionEvent {
        correlation_id,
        outcome: CompletionOutcome::Failure,
        result_key: None,
        duration_seconds: None,
        error_message: message.map(str::to_string),
    }
}

fn success(correlation_id: String) -> CompletionEvent {
    CompletionEvent {
        correlation_id,
        outcome: CompletionOutcome::Success,
        result_key: Some("result/out.pdf".to_string()),
        duration_seconds: Some(42.0),
        error_message: None,
    }
}

#[tokio::test]
async fn given_processing_job_when_success_signal_then_completed() {
    let services = TestServices::new();
    let alice = owner("alice");
    let job = services.processing_job(&alice, "pdf/alice/a.pdf").await;

    let disposition = services.notifier.handle(success(job.id.to_string())).await;

    assert_eq!(disposition, CompletionDisposition::Applied(JobStatus::Completed));
    let job = services.lifecycle.get(job.id, &alice).await.unwrap();
    let result = job.result.unwrap();
    assert_eq!(result.duration_seconds, Some(42.0));
    assert_eq!(result.result_key.unwrap().as_str(), "result/out.pdf");
}

#[tokio::test]
async fn given_processing_job_when_failure_signal_without_message_then_default_reason() {
    let services = TestServices::new();
    let alice = owner("alice");
    let job = services.processing_job(&alice, "pdf/alice/b.pdf").await;

    let disposition = services
        .notifier
        .handle(failure(job.id.to_string(), Some("   ")))
        .await;

    assert_eq!(disposition, CompletionDisposition::Applied(JobStatus::Failed));
    let job = services.lifecycle.get(job.id, &alice).await.unwrap();
    assert_eq!(job.error_message.as_deref(), Some("Remediation pipeline failed"));
}

#[tokio::test]
async fn given_processing_job_when_failure_signal_with_message_then_message_kept() {
    let services = TestServices::new();
    let alice = owner("alice");
    let job = services.processing_job(&alice, "pdf/alice/c.pdf").await;

    services
        .notifier
        .handle(failure(job.id.to_string(), Some("Adobe API quota exhausted")))
        .await;

    let job = services.lifecycle.get(job.id, &alice).await.unwrap();
    assert_eq!(job.error_message.as_deref(), Some("Adobe API quota exhausted"));
}

#[tokio::test]
async fn given_completed_job_when_duplicate_signal_then_dropped() {
    let services = TestServices::new();
    let alice = owner("alice");
    let job = services.processing_job(&alice, "pdf/alice/d.pdf").await;
    services.notifier.handle(success(job.id.to_string())).await;
    let before = services.lifecycle.get(job.id, &alice).await.unwrap();

    let disposition = services
        .notifier
        .handle(failure(job.id.to_string(), Some("late failure")))
        .await;

    assert_eq!(
        disposition,
        CompletionDisposition::AlreadyTerminal(JobStatus::Completed)
    );
    assert_eq!(services.lifecycle.get(job.id, &alice).await.unwrap(), before);
}

#[tokio::test]
async fn given_uploaded_job_when_signal_arrives_then_not_processing_and_unchanged() {
    let services = TestServices::new();
    let alice = owner("alice");
    let job = services.uploaded_job(&alice, "pdf/alice/e.pdf").await;

    let disposition = services.notifier.handle(success(job.id.to_string())).await;

    assert_eq!(
        disposition,
        CompletionDisposition::NotProcessing(JobStatus::Uploaded)
    );
    assert_eq!(
        services.lifecycle.get(job.id, &alice).await.unwrap().status,
        JobStatus::Uploaded
    );
}

#[tokio::test]
async fn given_unknown_job_when_signal_arrives_then_unknown_job() {
    let services = TestServices::new();

    let disposition = services
        .notifier
        .handle(success(JobId::new().to_string()))
        .await;

    assert_eq!(disposition, CompletionDisposition::UnknownJob);
    assert_eq!(disposition.as_str(), "UNKNOWN_JOB");
}

#[tokio::test]
async fn given_non_job_correlation_token_when_signal_arrives_then_unknown_job() {
    let services = TestServices::new();

    let disposition = services
        .notifier
        .handle(success("arn:aws:states:execution:123".to_string()))
        .await;

    assert_eq!(disposition, CompletionDisposition::UnknownJob);
}

#[test]
fn given_worker_payload_when_deserialized_then_optional_fields_default() {
    let event: CompletionEvent = serde_json::from_str(
        r#"{"correlationId":"abc","outcome":"failure"}"#,
    )
    .unwrap();

    assert_eq!(event.outcome, CompletionOutcome::Failure);
    assert!(event.result_key.is_none());
    assert!(event.error_message.is_none());
}
