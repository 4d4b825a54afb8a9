use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;

use remediate::application::ports::{DocumentAnalyzer, JobStore, RemediationPipeline};
use remediate::application::services::{
    CompletionNotifier, JobLifecycleService, MaintenanceWorker,
};
use remediate::infrastructure::analysis::{MockAnalyzer, PdfAnalyzer};
use remediate::infrastructure::observability::{TracingConfig, init_tracing};
use remediate::infrastructure::persistence::{InMemoryJobStore, open_job_store};
use remediate::infrastructure::remediation::{HttpRemediationPipeline, MockRemediationPipeline};
use remediate::infrastructure::storage::DocumentStoreFactory;
use remediate::presentation::config::{AnalyzerProviderSetting, PipelineProviderSetting};
use remediate::presentation::{AppState, Environment, Settings, create_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let environment = Environment::from_env().map_err(anyhow::Error::msg)?;
    let settings = Settings::load(environment).context("Failed to load settings")?;

    init_tracing(&TracingConfig::from_settings(
        environment,
        &settings.logging,
    ));

    let jobs = build_job_store(&settings).await?;
    let documents =
        DocumentStoreFactory::create(&settings.storage).context("Failed to open storage")?;
    let analyzer = build_analyzer(&settings);
    let pipeline = build_pipeline(&settings)?;

    let lifecycle = Arc::new(JobLifecycleService::new(
        Arc::clone(&jobs),
        documents,
        analyzer,
        pipeline,
        settings.lifecycle_policy(),
    ));
    let notifier = Arc::new(CompletionNotifier::new(Arc::clone(&jobs)));

    if settings.maintenance.enabled {
        let worker = MaintenanceWorker::new(
            Arc::clone(&jobs),
            Arc::clone(&lifecycle),
            settings.maintenance_config(),
        );
        tokio::spawn(worker.run());
    }

    let router = create_router(AppState::new(lifecycle, notifier));

    let addr = settings.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(address = %addr, environment = %environment, "Listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn build_job_store(settings: &Settings) -> anyhow::Result<Arc<dyn JobStore>> {
    if settings.database.url.is_none() {
        tracing::warn!("No database configured, jobs are kept in memory only");
        return Ok(Arc::new(InMemoryJobStore::new()));
    }

    let store = open_job_store(&settings.database)
        .await
        .context("Failed to open PostgreSQL job store")?;
    Ok(Arc::new(store))
}

fn build_analyzer(settings: &Settings) -> Arc<dyn DocumentAnalyzer> {
    match settings.analysis.provider {
        AnalyzerProviderSetting::Pdf => Arc::new(PdfAnalyzer::with_timeout(Duration::from_secs(
            settings.analysis.timeout_seconds,
        ))),
        AnalyzerProviderSetting::Mock => Arc::new(MockAnalyzer::default()),
    }
}

fn build_pipeline(settings: &Settings) -> anyhow::Result<Arc<dyn RemediationPipeline>> {
    match settings.remediation.provider {
        PipelineProviderSetting::Http => {
            let endpoint = settings
                .remediation
                .endpoint
                .as_deref()
                .context("remediation.endpoint is required for the http provider")?;
            let pipeline = HttpRemediationPipeline::new(
                endpoint,
                settings.remediation.api_key.clone(),
                Duration::from_secs(settings.remediation.timeout_seconds),
            )?;
            Ok(Arc::new(pipeline))
        }
        PipelineProviderSetting::Mock => {
            tracing::warn!("Remediation worker is mocked, jobs will stay PROCESSING");
            Ok(Arc::new(MockRemediationPipeline::new()))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
