mod document_analyzer;
mod document_store;
mod job_store;
mod page_cursor;
mod remediation_pipeline;
mod store_error;

pub use document_analyzer::{AnalyzerError, DocumentAnalyzer};
pub use document_store::{DocumentStore, DocumentStoreError};
pub use job_store::{JobPage, JobStore};
pub use page_cursor::PageCursor;
pub use remediation_pipeline::{RemediationError, RemediationPipeline, RemediationRequest};
pub use store_error::StoreError;
