use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
}

impl Complexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::Simple => "simple",
            Complexity::Moderate => "moderate",
            Complexity::Complex => "complex",
        }
    }
}

impl FromStr for Complexity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simple" => Ok(Complexity::Simple),
            "moderate" => Ok(Complexity::Moderate),
            "complex" => Ok(Complexity::Complex),
            _ => Err(format!("Invalid complexity: {}", s)),
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Raw measurements taken from a document: the exact page count plus
/// structural-element counts for the leading pages that were sampled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSample {
    pub page_count: u32,
    pub sampled_elements: Vec<u32>,
}

/// Fixed parameters of the cost estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisPolicy {
    pub sample_pages: u32,
    pub transactions_per_page: u64,
    pub quota_limit: u64,
    pub simple_max_avg_elements: f64,
    pub moderate_max_avg_elements: f64,
}

impl Default for AnalysisPolicy {
    fn default() -> Self {
        Self {
            sample_pages: 3,
            transactions_per_page: 10,
            quota_limit: 25_000,
            simple_max_avg_elements: 15.0,
            moderate_max_avg_elements: 40.0,
        }
    }
}

impl AnalysisPolicy {
    pub fn classify(&self, avg_elements_per_page: f64) -> Complexity {
        if avg_elements_per_page < self.simple_max_avg_elements {
            Complexity::Simple
        } else if avg_elements_per_page < self.moderate_max_avg_elements {
            Complexity::Moderate
        } else {
            Complexity::Complex
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentAnalysis {
    pub page_count: u32,
    pub sampled_pages: u32,
    pub avg_elements_per_page: f64,
    pub estimated_elements: u64,
    pub complexity: Complexity,
    pub estimated_transactions: u64,
    pub estimated_cost_percentage: f64,
}

impl DocumentAnalysis {
    /// Extrapolates the sampled element density linearly over every page and
    /// prices the document by page count.
    pub fn estimate(sample: &PageSample, policy: &AnalysisPolicy) -> Self {
        let sampled_pages = sample.sampled_elements.len() as u32;
        let avg_elements_per_page = if sampled_pages == 0 {
            0.0
        } else {
            let total: u64 = sample.sampled_elements.iter().map(|&n| u64::from(n)).sum();
            total as f64 / f64::from(sampled_pages)
        };

        let estimated_elements = (avg_elements_per_page * f64::from(sample.page_count)).round() as u64;
        let estimated_transactions = u64::from(sample.page_count) * policy.transactions_per_page;
        let estimated_cost_percentage = if policy.quota_limit == 0 {
            0.0
        } else {
            round_two(estimated_transactions as f64 / policy.quota_limit as f64 * 100.0)
        };

        Self {
            page_count: sample.page_count,
            sampled_pages,
            avg_elements_per_page: round_two(avg_elements_per_page),
            estimated_elements,
            complexity: policy.classify(avg_elements_per_page),
            estimated_transactions,
            estimated_cost_percentage,
        }
    }
}

fn round_two(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
