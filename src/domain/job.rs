use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{DocumentAnalysis, JobId, JobStatus, OwnerId, StorageKey};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub name: String,
    pub size_bytes: u64,
    pub storage_key: StorageKey,
}

impl FileMetadata {
    pub fn size_mb(&self) -> f64 {
        (self.size_bytes as f64 / BYTES_PER_MB * 100.0).round() / 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingResult {
    pub result_key: Option<StorageKey>,
    pub duration_seconds: Option<f64>,
    pub completed_at: DateTime<Utc>,
}

/// Data carried by a status transition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobFields {
    pub analysis: Option<DocumentAnalysis>,
    pub result: Option<ProcessingResult>,
    pub error_message: Option<String>,
}

impl JobFields {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn analysis(analysis: DocumentAnalysis) -> Self {
        Self {
            analysis: Some(analysis),
            ..Self::default()
        }
    }

    pub fn result(result: ProcessingResult) -> Self {
        Self {
            result: Some(result),
            ..Self::default()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error_message: Some(message.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub owner_id: OwnerId,
    pub status: JobStatus,
    pub file: FileMetadata,
    pub analysis: Option<DocumentAnalysis>,
    pub result: Option<ProcessingResult>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Job {
    pub fn new(owner_id: OwnerId, file: FileMetadata, retention: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            owner_id,
            status: JobStatus::Uploaded,
            file,
            analysis: None,
            result: None,
            error_message: None,
            created_at: now,
            updated_at: now,
            expires_at: now + retention,
        }
    }

    pub fn is_owned_by(&self, owner: &OwnerId) -> bool {
        &self.owner_id == owner
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Moves the record to `next` and writes the fields the transition
    /// carries. Entering ANALYZING clears any earlier estimate so analysis
    /// fields only exist from ANALYSIS_COMPLETE onwards.
    pub fn apply(&mut self, next: JobStatus, fields: JobFields, now: DateTime<Utc>) {
        if next == JobStatus::Analyzing {
            self.analysis = None;
            self.error_message = None;
        }
        if let Some(analysis) = fields.analysis {
            self.analysis = Some(analysis);
        }
        if let Some(result) = fields.result {
            self.result = Some(result);
        }
        if let Some(message) = fields.error_message {
            self.error_message = Some(message);
        }
        self.status = next;
        self.updated_at = now;
    }

    /// Storage objects whose keys follow directly from the record. Chunk
    /// files are discovered by listing [`StorageKey::chunk_prefix`].
    pub fn derived_storage_keys(&self) -> Vec<StorageKey> {
        let mut keys = Vec::with_capacity(3);
        if !self.file.storage_key.is_empty() {
            keys.push(self.file.storage_key.clone());
        }
        if let Some(result_key) = self.result.as_ref().and_then(|r| r.result_key.clone()) {
            keys.push(result_key);
        }
        if !self.file.storage_key.is_empty() {
            keys.push(self.file.storage_key.analysis_report_key());
        }
        keys
    }
}
