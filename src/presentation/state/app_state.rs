use std::sync::Arc;

use crate::application::services::{CompletionNotifier, JobLifecycleService};

#[derive(Clone)]
pub struct AppState {
    pub lifecycle: Arc<JobLifecycleService>,
    pub notifier: Arc<CompletionNotifier>,
}

impl AppState {
    pub fn new(lifecycle: Arc<JobLifecycleService>, notifier: Arc<CompletionNotifier>) -> Self {
        Self {
            lifecycle,
            notifier,
        }
    }
}
