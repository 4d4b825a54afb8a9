use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};

use crate::domain::{Job, JobId};

use super::StoreError;

/// Position after the last record of a page, in `(created_at DESC, id DESC)`
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    pub created_at: DateTime<Utc>,
    pub id: JobId,
}

impl PageCursor {
    pub fn after(job: &Job) -> Self {
        Self {
            created_at: job.created_at,
            id: job.id,
        }
    }

    pub fn encode(&self) -> String {
        URL_SAFE_NO_PAD.encode(format!("{}|{}", self.created_at.to_rfc3339(), self.id))
    }

    pub fn decode(raw: &str) -> Result<Self, StoreError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(raw.trim())
            .map_err(|e| StoreError::InvalidCursor(e.to_string()))?;
        let text = String::from_utf8(bytes).map_err(|e| StoreError::InvalidCursor(e.to_string()))?;
        let (created_at, id) = text
            .split_once('|')
            .ok_or_else(|| StoreError::InvalidCursor("missing separator".to_string()))?;

        let created_at = DateTime::parse_from_rfc3339(created_at)
            .map_err(|e| StoreError::InvalidCursor(e.to_string()))?
            .with_timezone(&Utc);
        let id = id.parse::<JobId>().map_err(StoreError::InvalidCursor)?;

        Ok(Self { created_at, id })
    }

    /// Whether `job` sorts strictly after this cursor.
    pub fn precedes(&self, job: &Job) -> bool {
        (job.created_at, job.id.as_uuid()) < (self.created_at, self.id.as_uuid())
    }
}
