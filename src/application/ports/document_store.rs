use std::io;

use async_trait::async_trait;

use crate::domain::StorageKey;

/// Read/delete access to the bucket holding uploads, results and worker
/// artifacts.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn fetch(&self, key: &StorageKey) -> Result<Vec<u8>, DocumentStoreError>;

    async fn head(&self, key: &StorageKey) -> Result<u64, DocumentStoreError>;

    /// Fails with [`DocumentStoreError::NotFound`] when nothing is stored at `key`.
    async fn delete(&self, key: &StorageKey) -> Result<(), DocumentStoreError>;

    async fn list_prefix(&self, prefix: &str) -> Result<Vec<StorageKey>, DocumentStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentStoreError {
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("download failed: {0}")]
    DownloadFailed(String),
    #[error("delete failed: {0}")]
    DeleteFailed(String),
    #[error("list failed: {0}")]
    ListFailed(String),
    #[error("store configuration invalid: {0}")]
    Configuration(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}
