use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Uploaded,
    Analyzing,
    AnalysisComplete,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub const ALL: [JobStatus; 7] = [
        JobStatus::Uploaded,
        JobStatus::Analyzing,
        JobStatus::AnalysisComplete,
        JobStatus::Processing,
        JobStatus::Completed,
        JobStatus::Failed,
        JobStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Uploaded => "UPLOADED",
            JobStatus::Analyzing => "ANALYZING",
            JobStatus::AnalysisComplete => "ANALYSIS_COMPLETE",
            JobStatus::Processing => "PROCESSING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
            JobStatus::Cancelled => "CANCELLED",
        }
    }

    /// The transition table. Every edge of the lifecycle graph lives here and
    /// nowhere else.
    pub fn successors(self) -> &'static [JobStatus] {
        use JobStatus::*;
        match self {
            Uploaded => &[Analyzing, Processing, Cancelled],
            Analyzing => &[AnalysisComplete, Failed, Cancelled],
            AnalysisComplete => &[Analyzing, Processing, Cancelled],
            Processing => &[Completed, Failed, Cancelled],
            Completed | Failed | Cancelled => &[],
        }
    }

    pub fn can_transition_to(self, next: JobStatus) -> bool {
        self.successors().contains(&next)
    }

    /// Statuses from which `target` may be entered.
    pub fn sources_of(target: JobStatus) -> Vec<JobStatus> {
        Self::ALL
            .into_iter()
            .filter(|s| s.can_transition_to(target))
            .collect()
    }

    pub fn is_terminal(self) -> bool {
        self.successors().is_empty()
    }

    /// Automated work is in flight; gates new submissions for the owner.
    pub fn is_active(self) -> bool {
        matches!(self, JobStatus::Analyzing | JobStatus::Processing)
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UPLOADED" => Ok(JobStatus::Uploaded),
            "ANALYZING" => Ok(JobStatus::Analyzing),
            "ANALYSIS_COMPLETE" => Ok(JobStatus::AnalysisComplete),
            "PROCESSING" => Ok(JobStatus::Processing),
            "COMPLETED" => Ok(JobStatus::Completed),
            "FAILED" => Ok(JobStatus::Failed),
            "CANCELLED" => Ok(JobStatus::Cancelled),
            _ => Err(format!("Invalid job status: {}", s)),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
