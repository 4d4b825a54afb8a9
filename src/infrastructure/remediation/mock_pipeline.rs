use std::sync::Mutex;

use async_trait::async_trait;

use crate::application::ports::{RemediationError, RemediationPipeline, RemediationRequest};

/// Records dispatched requests instead of sending them.
#[derive(Default)]
pub struct MockRemediationPipeline {
    dispatched: Mutex<Vec<RemediationRequest>>,
    fail_with: Option<String>,
}

impl MockRemediationPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            dispatched: Mutex::new(Vec::new()),
            fail_with: Some(message.into()),
        }
    }

    pub fn dispatched(&self) -> Vec<RemediationRequest> {
        self.dispatched
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    pub fn dispatch_count(&self) -> usize {
        self.dispatched().len()
    }
}

#[async_trait]
impl RemediationPipeline for MockRemediationPipeline {
    async fn dispatch(&self, request: &RemediationRequest) -> Result<(), RemediationError> {
        if let Ok(mut requests) = self.dispatched.lock() {
            requests.push(request.clone());
        }
        match &self.fail_with {
            Some(message) => Err(RemediationError::DispatchFailed(message.clone())),
            None => Ok(()),
        }
    }
}
