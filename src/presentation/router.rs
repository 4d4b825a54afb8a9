use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::infrastructure::observability::request_id_middleware;
use crate::presentation::handlers::{
    analyze_job_handler, cancel_job_handler, completion_handler, create_job_handler,
    delete_job_handler, get_job_handler, health_handler, list_jobs_handler,
    start_processing_handler,
};
use crate::presentation::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/api/v1/jobs",
            post(create_job_handler).get(list_jobs_handler),
        )
        .route("/api/v1/jobs/analyze", post(analyze_job_handler))
        .route("/api/v1/jobs/start-processing", post(start_processing_handler))
        .route("/api/v1/jobs/cancel", post(cancel_job_handler))
        .route(
            "/api/v1/jobs/{job_id}",
            get(get_job_handler).delete(delete_job_handler),
        )
        .route("/internal/v1/completions", post(completion_handler))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(trace_layer)
        .layer(cors)
        .with_state(state)
}
