mod environment;
mod settings;

pub use environment::Environment;
pub use settings::{
    AnalysisSettings, AnalyzerProviderSetting, DatabaseSettings, JobSettings, LoggingSettings,
    MaintenanceSettings, PipelineProviderSetting, RemediationSettings, RetentionSettings, ServerSettings, Settings,
    StorageProviderSetting, StorageSettings,
};
