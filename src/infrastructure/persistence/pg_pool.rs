use std::time::Duration;

use sqlx::{PgPool, postgres::PgPoolOptions};
use tracing::{info, instrument, warn};

use crate::application::ports::StoreError;
use crate::presentation::config::DatabaseSettings;

use super::PgJobStore;

const MAX_RETRY_DELAY: Duration = Duration::from_secs(8);

/// Connects with exponential backoff; the database often starts alongside
/// the service.
#[instrument(skip(settings), fields(max_connections = settings.max_connections))]
pub async fn create_pool(settings: &DatabaseSettings) -> Result<PgPool, StoreError> {
    let url = settings
        .url
        .as_deref()
        .ok_or_else(|| StoreError::ConnectionFailed("database.url is not set".to_string()))?;
    let options = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_seconds));

    let mut attempt = 1;
    let mut delay = Duration::from_millis(500);
    loop {
        match options.clone().connect(url).await {
            Ok(pool) => {
                info!(attempt, "PostgreSQL connection pool established");
                return Ok(pool);
            }
            Err(e) if attempt < settings.connect_attempts => {
                warn!(
                    error = %e,
                    attempt,
                    delay_ms = delay.as_millis(),
                    "PostgreSQL unreachable, retrying"
                );
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(MAX_RETRY_DELAY);
                attempt += 1;
            }
            Err(e) => return Err(StoreError::ConnectionFailed(e.to_string())),
        }
    }
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), StoreError> {
    info!("Applying jobs schema migrations");
    sqlx::migrate!()
        .run(pool)
        .await
        .map_err(|e| StoreError::ConnectionFailed(format!("migration failed: {}", e)))
}

/// Pool plus schema, ready to serve as the job store.
pub async fn open_job_store(settings: &DatabaseSettings) -> Result<PgJobStore, StoreError> {
    let pool = create_pool(settings).await?;
    if settings.run_migrations {
        run_migrations(&pool).await?;
    }
    Ok(PgJobStore::new(pool))
}
