pub mod analysis;
pub mod observability;
pub mod persistence;
pub mod remediation;
pub mod storage;
