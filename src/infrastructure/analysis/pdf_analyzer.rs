use std::io::Write;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use pdf_oxide::PdfDocument;

use crate::application::ports::{AnalyzerError, DocumentAnalyzer};
use crate::domain::PageSample;

const ANALYSIS_TIMEOUT: Duration = Duration::from_secs(30);

/// Samples PDFs with `pdf_oxide`. A structural element is approximated by a
/// non-empty line of extracted text.
pub struct PdfAnalyzer {
    timeout: Duration,
}

impl Default for PdfAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfAnalyzer {
    pub fn new() -> Self {
        Self {
            timeout: ANALYSIS_TIMEOUT,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn sample_pages(path: &Path, sample_pages: u32) -> Result<PageSample, AnalyzerError> {
        let mut doc = PdfDocument::open(path)
            .map_err(|e| AnalyzerError::Unreadable(format!("failed to parse PDF: {e}")))?;

        let page_count = doc
            .page_count()
            .map_err(|e| AnalyzerError::Unreadable(format!("failed to read page count: {e}")))?;

        if page_count == 0 {
            return Err(AnalyzerError::Empty);
        }

        let sampled = page_count.min(sample_pages as usize);
        let mut sampled_elements = Vec::with_capacity(sampled);

        for page_index in 0..sampled {
            let text = doc.extract_text(page_index).unwrap_or_default();
            sampled_elements.push(count_elements(&text));
        }

        Ok(PageSample {
            page_count: page_count as u32,
            sampled_elements,
        })
    }
}

pub(crate) fn count_elements(text: &str) -> u32 {
    text.lines().filter(|line| !line.trim().is_empty()).count() as u32
}

#[async_trait]
impl DocumentAnalyzer for PdfAnalyzer {
    #[tracing::instrument(skip(self, data), fields(bytes = data.len()))]
    async fn sample(&self, data: &[u8], sample_pages: u32) -> Result<PageSample, AnalyzerError> {
        let mut temp_file = tempfile::NamedTempFile::new()
            .map_err(|e| AnalyzerError::Unreadable(format!("failed to create temp file: {e}")))?;

        temp_file
            .write_all(data)
            .map_err(|e| AnalyzerError::Unreadable(format!("failed to write temp file: {e}")))?;

        let temp_path = temp_file.path().to_path_buf();

        let sample = tokio::time::timeout(
            self.timeout,
            tokio::task::spawn_blocking(move || Self::sample_pages(&temp_path, sample_pages)),
        )
        .await
        .map_err(|_| AnalyzerError::Timeout)?
        .map_err(|e| AnalyzerError::Unreadable(format!("task join error: {e}")))??;

        tracing::info!(
            page_count = sample.page_count,
            sampled = sample.sampled_elements.len(),
            "PDF sampling complete"
        );

        Ok(sample)
    }
}
