mod completion_notifier;
mod job_lifecycle_service;
mod lifecycle_error;
mod maintenance_worker;

pub use completion_notifier::{
    CompletionDisposition, CompletionEvent, CompletionNotifier, CompletionOutcome,
};
pub use job_lifecycle_service::{
    CleanupReport, FailedDeletion, JobLifecycleService, JobListing, LifecyclePolicy, NewJob,
    Transition,
};
pub use lifecycle_error::LifecycleError;
pub use maintenance_worker::{MaintenanceConfig, MaintenanceWorker, SweepReport};
