use async_trait::async_trait;

use crate::domain::PageSample;

#[async_trait]
pub trait DocumentAnalyzer: Send + Sync {
    /// Counts every page and the structural elements of the first
    /// `sample_pages` of them.
    async fn sample(&self, data: &[u8], sample_pages: u32) -> Result<PageSample, AnalyzerError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    #[error("document unreadable: {0}")]
    Unreadable(String),
    #[error("document has no pages")]
    Empty,
    #[error("analysis timed out")]
    Timeout,
}
