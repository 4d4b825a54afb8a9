use std::time::Duration;

use config::{Config, ConfigError, File};
use serde::Deserialize;

use crate::application::services::{LifecyclePolicy, MaintenanceConfig};
use crate::domain::AnalysisPolicy;

use super::Environment;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub storage: StorageSettings,
    pub analysis: AnalysisSettings,
    pub remediation: RemediationSettings,
    pub retention: RetentionSettings,
    pub jobs: JobSettings,
    pub maintenance: MaintenanceSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Without a `url` jobs are kept in memory and lost on restart.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default)]
    pub url: Option<String>,
    pub max_connections: u32,
    pub run_migrations: bool,
    pub connect_attempts: u32,
    pub acquire_timeout_seconds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageProviderSetting {
    Local,
    S3,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    pub provider: StorageProviderSetting,
    pub local_path: String,
    #[serde(default)]
    pub s3_bucket: Option<String>,
    #[serde(default)]
    pub s3_region: Option<String>,
    #[serde(default)]
    pub s3_endpoint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyzerProviderSetting {
    Pdf,
    Mock,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisSettings {
    pub provider: AnalyzerProviderSetting,
    pub sample_pages: u32,
    pub transactions_per_page: u64,
    pub quota_limit: u64,
    /// Average sampled elements per page below which a document is simple.
    pub simple_max_avg_elements: f64,
    pub moderate_max_avg_elements: f64,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineProviderSetting {
    Http,
    Mock,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemediationSettings {
    pub provider: PipelineProviderSetting,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetentionSettings {
    pub days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobSettings {
    pub default_page_size: usize,
    pub max_page_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MaintenanceSettings {
    pub enabled: bool,
    pub sweep_interval_seconds: u64,
    pub purge_batch: usize,
    #[serde(default)]
    pub stuck_after_minutes: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    pub enable_json: bool,
    #[serde(default)]
    pub filter: Option<String>,
}

impl Settings {
    /// Layers built-in defaults, `appsettings.{env}.toml` (optional) and
    /// `APP_`-prefixed variables, e.g. `APP_DATABASE__URL`.
    pub fn load(environment: Environment) -> Result<Self, ConfigError> {
        Self::builder(environment)?
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Defaults and the environment file only; ignores process variables.
    pub fn load_from_file(environment: Environment) -> Result<Self, ConfigError> {
        Self::builder(environment)?.build()?.try_deserialize()
    }

    /// Defaults plus the environment file, open for further sources or
    /// overrides before `build`.
    pub fn builder(
        environment: Environment,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        let file_name = format!("appsettings.{}", environment.as_str().to_lowercase());
        Ok(Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("database.max_connections", 10)?
            .set_default("database.run_migrations", true)?
            .set_default("database.connect_attempts", 6)?
            .set_default("database.acquire_timeout_seconds", 5)?
            .set_default("storage.provider", "local")?
            .set_default("storage.local_path", "./data/uploads")?
            .set_default("analysis.provider", "pdf")?
            .set_default("analysis.sample_pages", 3)?
            .set_default("analysis.transactions_per_page", 10)?
            .set_default("analysis.quota_limit", 25_000)?
            .set_default("analysis.simple_max_avg_elements", 15.0)?
            .set_default("analysis.moderate_max_avg_elements", 40.0)?
            .set_default("analysis.timeout_seconds", 30)?
            .set_default("remediation.provider", "mock")?
            .set_default("remediation.timeout_seconds", 10)?
            .set_default("retention.days", 7)?
            .set_default("jobs.default_page_size", 20)?
            .set_default("jobs.max_page_size", 100)?
            .set_default("maintenance.enabled", true)?
            .set_default("maintenance.sweep_interval_seconds", 300)?
            .set_default("maintenance.purge_batch", 100)?
            .set_default("logging.enable_json", environment == Environment::Prod)?
            .add_source(File::with_name(&file_name).required(false)))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn lifecycle_policy(&self) -> LifecyclePolicy {
        LifecyclePolicy {
            retention: chrono::Duration::days(self.retention.days),
            analysis: AnalysisPolicy {
                sample_pages: self.analysis.sample_pages,
                transactions_per_page: self.analysis.transactions_per_page,
                quota_limit: self.analysis.quota_limit,
                simple_max_avg_elements: self.analysis.simple_max_avg_elements,
                moderate_max_avg_elements: self.analysis.moderate_max_avg_elements,
            },
            default_page_size: self.jobs.default_page_size,
            max_page_size: self.jobs.max_page_size,
        }
    }

    pub fn maintenance_config(&self) -> MaintenanceConfig {
        MaintenanceConfig {
            interval: Duration::from_secs(self.maintenance.sweep_interval_seconds),
            purge_batch: self.maintenance.purge_batch,
            stuck_after: self
                .maintenance
                .stuck_after_minutes
                .map(chrono::Duration::minutes),
        }
    }
}
