use std::path::PathBuf;
use std::sync::Arc;

use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as StorePath;
use object_store::ObjectStore;

use crate::application::ports::{DocumentStore, DocumentStoreError};
use crate::domain::StorageKey;

/// [`DocumentStore`] over any `object_store` backend.
pub struct ObjectDocumentStore {
    inner: Arc<dyn ObjectStore>,
}

impl ObjectDocumentStore {
    pub fn new(inner: Arc<dyn ObjectStore>) -> Self {
        Self { inner }
    }

    pub fn local(base_path: PathBuf) -> Result<Self, DocumentStoreError> {
        std::fs::create_dir_all(&base_path)?;
        let fs = LocalFileSystem::new_with_prefix(base_path)
            .map_err(|e| DocumentStoreError::Configuration(e.to_string()))?;
        Ok(Self::new(Arc::new(fs)))
    }

    pub fn s3(
        bucket: &str,
        region: &str,
        endpoint: Option<&str>,
    ) -> Result<Self, DocumentStoreError> {
        let mut builder = AmazonS3Builder::from_env()
            .with_bucket_name(bucket)
            .with_region(region);
        if let Some(endpoint) = endpoint {
            builder = builder.with_endpoint(endpoint).with_allow_http(true);
        }
        let store = builder
            .build()
            .map_err(|e| DocumentStoreError::Configuration(e.to_string()))?;
        Ok(Self::new(Arc::new(store)))
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemory::new()))
    }

    pub fn object_store(&self) -> Arc<dyn ObjectStore> {
        Arc::clone(&self.inner)
    }
}

fn not_found_or(
    e: object_store::Error,
    otherwise: fn(String) -> DocumentStoreError,
) -> DocumentStoreError {
    match e {
        object_store::Error::NotFound { path, .. } => DocumentStoreError::NotFound(path),
        other => otherwise(other.to_string()),
    }
}

#[async_trait::async_trait]
impl DocumentStore for ObjectDocumentStore {
    #[tracing::instrument(skip(self), fields(key = %key))]
    async fn fetch(&self, key: &StorageKey) -> Result<Vec<u8>, DocumentStoreError> {
        let path = StorePath::from(key.as_str());
        let result = self
            .inner
            .get(&path)
            .await
            .map_err(|e| not_found_or(e, DocumentStoreError::DownloadFailed))?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| DocumentStoreError::DownloadFailed(e.to_string()))?;

        Ok(bytes.to_vec())
    }

    async fn head(&self, key: &StorageKey) -> Result<u64, DocumentStoreError> {
        let path = StorePath::from(key.as_str());
        let meta = self
            .inner
            .head(&path)
            .await
            .map_err(|e| not_found_or(e, DocumentStoreError::DownloadFailed))?;
        Ok(meta.size as u64)
    }

    /// Backends disagree on deleting a missing object, so existence is
    /// checked first and reported as `NotFound`.
    async fn delete(&self, key: &StorageKey) -> Result<(), DocumentStoreError> {
        let path = StorePath::from(key.as_str());
        self.inner
            .head(&path)
            .await
            .map_err(|e| not_found_or(e, DocumentStoreError::DeleteFailed))?;

        self.inner
            .delete(&path)
            .await
            .map_err(|e| not_found_or(e, DocumentStoreError::DeleteFailed))
    }

    /// Plain string-prefix match; `object_store` listing only understands
    /// whole path segments, so the parent directory is listed and filtered.
    async fn list_prefix(&self, prefix: &str) -> Result<Vec<StorageKey>, DocumentStoreError> {
        let parent = prefix
            .rsplit_once('/')
            .map(|(dir, _)| StorePath::from(dir));

        let metas: Vec<_> = self
            .inner
            .list(parent.as_ref())
            .try_collect()
            .await
            .map_err(|e| DocumentStoreError::ListFailed(e.to_string()))?;

        let mut keys: Vec<StorageKey> = metas
            .into_iter()
            .map(|m| m.location.to_string())
            .filter(|location| location.starts_with(prefix))
            .map(StorageKey::from_raw)
            .collect();
        keys.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(keys)
    }
}
