mod http_pipeline;
mod mock_pipeline;

pub use http_pipeline::HttpRemediationPipeline;
pub use mock_pipeline::MockRemediationPipeline;
