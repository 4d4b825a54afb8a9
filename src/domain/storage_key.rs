use std::fmt;

use serde::{Deserialize, Serialize};

const PDF_EXTENSION: &str = ".pdf";
const ANALYSIS_REPORT_PREFIX: &str = "temp/";
const ANALYSIS_REPORT_SUFFIX: &str = "_accessibility_report.json";
const CHUNK_MARKER: &str = "_chunk_";

/// Key of an object in the document bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageKey(String);

impl StorageKey {
    pub fn from_raw(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Last path segment with any `.pdf` extension removed.
    pub fn base_name(&self) -> &str {
        let file = self.0.rsplit('/').next().unwrap_or(&self.0);
        file.strip_suffix(PDF_EXTENSION).unwrap_or(file)
    }

    /// Report the remediation worker writes next to its scratch files.
    pub fn analysis_report_key(&self) -> StorageKey {
        StorageKey(format!(
            "{}{}{}",
            ANALYSIS_REPORT_PREFIX,
            self.base_name(),
            ANALYSIS_REPORT_SUFFIX
        ))
    }

    /// Prefix under which the worker stores split chunks of large documents.
    pub fn chunk_prefix(&self) -> String {
        let stem = self.0.strip_suffix(PDF_EXTENSION).unwrap_or(&self.0);
        format!("{}{}", stem, CHUNK_MARKER)
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
