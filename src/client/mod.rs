//! Client library driving the jobs API: list caching, the active-job
//! submission gate and background polling.

mod api;
mod http_api;
mod poller;
mod session;
mod view;

pub use api::{ClientError, DeleteOutcome, JobListPage, JobsApi, NewJobRequest};
pub use http_api::HttpJobsApi;
pub use session::{ClientSession, Route, SessionConfig};
pub use view::{JobView, view_for};
