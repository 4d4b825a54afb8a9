use std::time::Duration;

use async_trait::async_trait;

use crate::application::ports::{RemediationError, RemediationPipeline, RemediationRequest};

/// Triggers the remediation worker with a JSON POST. Any 2xx counts as
/// accepted; the worker reports back through the completion endpoint.
pub struct HttpRemediationPipeline {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpRemediationPipeline {
    pub fn new(
        endpoint: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, RemediationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemediationError::DispatchFailed(format!("client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl RemediationPipeline for HttpRemediationPipeline {
    #[tracing::instrument(skip(self, request), fields(correlation_id = %request.correlation_id))]
    async fn dispatch(&self, request: &RemediationRequest) -> Result<(), RemediationError> {
        tracing::debug!(endpoint = %self.endpoint, "Dispatching remediation request");

        let mut builder = self.client.post(&self.endpoint).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.header("x-api-key", key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| RemediationError::DispatchFailed(format!("request: {e}")))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(RemediationError::Rejected { status, body });
        }

        tracing::info!("Remediation worker accepted request");
        Ok(())
    }
}
