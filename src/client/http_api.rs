use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::domain::{Job, JobId, OwnerId};
use crate::presentation::handlers::{ErrorResponse, OWNER_HEADER};

use super::api::{ClientError, DeleteOutcome, JobListPage, JobsApi, NewJobRequest};

/// [`JobsApi`] over the service's HTTP surface.
pub struct HttpJobsApi {
    client: reqwest::Client,
    base_url: String,
    owner: OwnerId,
}

impl HttpJobsApi {
    pub fn new(base_url: &str, owner: OwnerId) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, owner, Duration::from_secs(30))
    }

    pub fn with_timeout(
        base_url: &str,
        owner: OwnerId,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            owner,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1/jobs{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = request
            .header(OWNER_HEADER, self.owner.as_str())
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let response = check(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }
}

async fn check(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let (code, message) = match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(err) => (Some(err.code), err.error),
        Err(_) => (None, body_or_reason(status, body)),
    };
    tracing::debug!(status = status.as_u16(), code = ?code, "Jobs API request failed");
    Err(ClientError::from_response(
        status.as_u16(),
        code.as_deref(),
        message,
    ))
}

fn body_or_reason(status: StatusCode, body: String) -> String {
    if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    } else {
        body
    }
}

#[async_trait]
impl JobsApi for HttpJobsApi {
    async fn create(&self, request: &NewJobRequest) -> Result<Job, ClientError> {
        self.send(self.client.post(self.url("")).json(request)).await
    }

    async fn list(&self, cursor: Option<&str>) -> Result<JobListPage, ClientError> {
        let mut request = self.client.get(self.url(""));
        if let Some(cursor) = cursor {
            request = request.query(&[("cursor", cursor)]);
        }
        self.send(request).await
    }

    async fn get(&self, id: JobId) -> Result<Job, ClientError> {
        self.send(self.client.get(self.url(&format!("/{}", id))))
            .await
    }

    async fn analyze(&self, id: JobId) -> Result<Job, ClientError> {
        let body = json!({ "jobId": id.to_string() });
        self.send(self.client.post(self.url("/analyze")).json(&body))
            .await
    }

    async fn start_processing(&self, id: JobId) -> Result<Job, ClientError> {
        let body = json!({ "jobId": id.to_string() });
        self.send(self.client.post(self.url("/start-processing")).json(&body))
            .await
    }

    async fn cancel(&self, id: JobId, delete_file: bool) -> Result<Job, ClientError> {
        let body = json!({ "jobId": id.to_string(), "deleteFile": delete_file });
        self.send(self.client.post(self.url("/cancel")).json(&body))
            .await
    }

    async fn delete(&self, id: JobId, cleanup_storage: bool) -> Result<DeleteOutcome, ClientError> {
        let body = json!({ "cleanupStorage": cleanup_storage });
        self.send(
            self.client
                .delete(self.url(&format!("/{}", id)))
                .json(&body),
        )
        .await
    }
}
