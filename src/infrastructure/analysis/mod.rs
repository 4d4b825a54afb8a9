mod mock_analyzer;
mod pdf_analyzer;

pub use mock_analyzer::MockAnalyzer;
pub use pdf_analyzer::PdfAnalyzer;
