use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use remediate::application::ports::{RemediationError, RemediationPipeline, RemediationRequest};
use remediate::infrastructure::remediation::HttpRemediationPipeline;

type Received = Arc<Mutex<Vec<(Option<String>, RemediationRequest)>>>;

async fn start_mock_worker(
    response_status: u16,
    response_body: &'static str,
) -> (String, Received, oneshot::Sender<()>) {
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let received: Received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);

    let app = Router::new().route(
        "/remediate",
        post(move |headers: HeaderMap, Json(request): Json<RemediationRequest>| {
            let sink = Arc::clone(&sink);
            async move {
                let api_key = headers
                    .get("x-api-key")
                    .and_then(|v| v.to_str().ok())
                    .map(String::from);
                sink.lock().unwrap().push((api_key, request));
                let status = StatusCode::from_u16(response_status).unwrap();
                (status, response_body).into_response()
            }
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let endpoint = format!("http://{}/remediate", addr);

    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await
            .ok();
    });

    (endpoint, received, shutdown_tx)
}

fn request() -> RemediationRequest {
    RemediationRequest {
        correlation_id: "5f0c9a4e-0000-4000-8000-000000000001".to_string(),
        owner_id: "alice".to_string(),
        storage_key: "pdf/alice/report.pdf".to_string(),
        file_name: "report.pdf".to_string(),
    }
}

#[tokio::test]
async fn given_worker_accepts_when_dispatching_then_payload_and_key_delivered() {
    let (endpoint, received, shutdown_tx) = start_mock_worker(202, "").await;
    let pipeline =
        HttpRemediationPipeline::new(&endpoint, Some("secret".to_string()), Duration::from_secs(5))
            .unwrap();

    pipeline.dispatch(&request()).await.unwrap();

    let received = received.lock().unwrap().clone();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].0.as_deref(), Some("secret"));
    assert_eq!(received[0].1, request());
    shutdown_tx.send(()).ok();
}

#[tokio::test]
async fn given_worker_rejects_when_dispatching_then_rejected_with_status_and_body() {
    let (endpoint, _received, shutdown_tx) = start_mock_worker(503, "throttled").await;
    let pipeline = HttpRemediationPipeline::new(&endpoint, None, Duration::from_secs(5)).unwrap();

    let result = pipeline.dispatch(&request()).await;

    match result {
        Err(RemediationError::Rejected { status, body }) => {
            assert_eq!(status, 503);
            assert_eq!(body, "throttled");
        }
        other => panic!("expected rejection, got {other:?}"),
    }
    shutdown_tx.send(()).ok();
}

#[tokio::test]
async fn given_worker_unreachable_when_dispatching_then_dispatch_failed() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("http://{}/remediate", listener.local_addr().unwrap());
    drop(listener);
    let pipeline = HttpRemediationPipeline::new(&endpoint, None, Duration::from_secs(2)).unwrap();

    let result = pipeline.dispatch(&request()).await;

    assert!(matches!(result, Err(RemediationError::DispatchFailed(_))));
}
