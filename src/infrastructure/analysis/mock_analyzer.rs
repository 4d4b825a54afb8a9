use async_trait::async_trait;

use crate::application::ports::{AnalyzerError, DocumentAnalyzer};
use crate::domain::PageSample;

/// Returns the same sample for every document. Used when the service runs
/// without a real PDF toolchain and in tests.
pub struct MockAnalyzer {
    page_count: u32,
    elements_per_page: u32,
}

impl MockAnalyzer {
    pub fn new(page_count: u32, elements_per_page: u32) -> Self {
        Self {
            page_count,
            elements_per_page,
        }
    }
}

impl Default for MockAnalyzer {
    fn default() -> Self {
        Self::new(10, 20)
    }
}

#[async_trait]
impl DocumentAnalyzer for MockAnalyzer {
    async fn sample(&self, _data: &[u8], sample_pages: u32) -> Result<PageSample, AnalyzerError> {
        if self.page_count == 0 {
            return Err(AnalyzerError::Empty);
        }
        let sampled = self.page_count.min(sample_pages) as usize;
        Ok(PageSample {
            page_count: self.page_count,
            sampled_elements: vec![self.elements_per_page; sampled],
        })
    }
}
