mod document_analysis;
mod job;
mod job_id;
mod job_status;
mod owner_id;
mod storage_key;

pub use document_analysis::{AnalysisPolicy, Complexity, DocumentAnalysis, PageSample};
pub use job::{FileMetadata, Job, JobFields, ProcessingResult};
pub use job_id::JobId;
pub use job_status::JobStatus;
pub use owner_id::OwnerId;
pub use storage_key::StorageKey;
