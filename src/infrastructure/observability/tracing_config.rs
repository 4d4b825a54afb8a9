use crate::presentation::config::{Environment, LoggingSettings};

const DEFAULT_FILTER: &str = "info,remediate=debug,tower_http=debug";

/// Subscriber options resolved from settings. `RUST_LOG` still wins over
/// `filter` when set.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub environment: Environment,
    pub json_format: bool,
    pub filter: String,
}

impl TracingConfig {
    pub fn from_settings(environment: Environment, logging: &LoggingSettings) -> Self {
        Self {
            environment,
            json_format: logging.enable_json,
            filter: logging
                .filter
                .clone()
                .unwrap_or_else(|| DEFAULT_FILTER.to_string()),
        }
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Local,
            json_format: false,
            filter: DEFAULT_FILTER.to_string(),
        }
    }
}
