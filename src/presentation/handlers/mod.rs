mod completions;
mod error;
mod health;
mod jobs;
mod owner;

pub use completions::{CompletionResponse, completion_handler};
pub use error::{ApiError, ErrorResponse};
pub use health::health_handler;
pub use jobs::{
    CancelJobRequest, CreateJobRequest, DeleteJobRequest, DeleteJobResponse, FailedKey,
    JobActionRequest, ListJobsQuery, ListJobsResponse, analyze_job_handler, cancel_job_handler,
    create_job_handler, delete_job_handler, get_job_handler, list_jobs_handler,
    start_processing_handler,
};
pub use owner::{OWNER_HEADER, Owner};
