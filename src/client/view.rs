use crate::domain::JobStatus;

/// What a client renders for a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobView {
    /// Uploaded; offer analyze, process or cancel.
    AwaitingAction,
    Analyzing,
    /// Estimate available; offer process, re-analyze or cancel.
    ReviewEstimate,
    Processing,
    Download,
    Failed,
    Cancelled,
}

impl JobView {
    /// Whether the view shows a spinner and expects the job to change without
    /// user input.
    pub fn is_waiting(&self) -> bool {
        matches!(self, JobView::Analyzing | JobView::Processing)
    }
}

pub fn view_for(status: JobStatus) -> JobView {
    match status {
        JobStatus::Uploaded => JobView::AwaitingAction,
        JobStatus::Analyzing => JobView::Analyzing,
        JobStatus::AnalysisComplete => JobView::ReviewEstimate,
        JobStatus::Processing => JobView::Processing,
        JobStatus::Completed => JobView::Download,
        JobStatus::Failed => JobView::Failed,
        JobStatus::Cancelled => JobView::Cancelled,
    }
}
