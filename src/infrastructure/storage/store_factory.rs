use std::path::PathBuf;
use std::sync::Arc;

use crate::application::ports::{DocumentStore, DocumentStoreError};
use crate::presentation::config::{StorageProviderSetting, StorageSettings};

use super::ObjectDocumentStore;

pub struct DocumentStoreFactory;

impl DocumentStoreFactory {
    pub fn create(settings: &StorageSettings) -> Result<Arc<dyn DocumentStore>, DocumentStoreError> {
        match settings.provider {
            StorageProviderSetting::Local => {
                let path = PathBuf::from(&settings.local_path);
                Ok(Arc::new(ObjectDocumentStore::local(path)?))
            }
            StorageProviderSetting::S3 => {
                let bucket = settings.s3_bucket.as_deref().ok_or_else(|| {
                    DocumentStoreError::Configuration("s3_bucket required".into())
                })?;
                let region = settings.s3_region.as_deref().unwrap_or("us-east-1");
                let store =
                    ObjectDocumentStore::s3(bucket, region, settings.s3_endpoint.as_deref())?;
                Ok(Arc::new(store))
            }
            StorageProviderSetting::Memory => Ok(Arc::new(ObjectDocumentStore::in_memory())),
        }
    }
}
