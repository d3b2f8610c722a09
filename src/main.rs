use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use anc_api_rest::{AppState, serve};
use anc_core::{CoreConfig, ReportService, reconcile::run_periodic};

/// Main entry point for the ANC report service
///
/// Runs the REST server and, when `ANC_RECONCILE_INTERVAL_SECS` is non-zero, a background task
/// that periodically relinks reports missing from their pregnancy registration.
///
/// # Environment Variables
/// - `ANC_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `ANC_DATA_DIR`: Directory for report and registration storage (default: "/anc_data")
/// - `RISK_SERVICE_URL`: Base URL of the risk/recommendation service (default: "http://localhost:8000")
/// - `RISK_SERVICE_TIMEOUT_SECS`: Per-attempt timeout for risk service calls (default: 20)
/// - `RISK_SERVICE_RETRIES`: Extra attempts on transient risk service failures (default: 1)
/// - `ANC_RECONCILE_INTERVAL_SECS`: Reconciliation period, 0 disables (default: 0)
///
/// # Returns
/// * `Ok(())` - If the server runs and shuts down cleanly
/// * `Err(anyhow::Error)` - If configuration, startup or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("anc_run=info".parse()?)
                .add_directive("anc_core=info".parse()?)
                .add_directive("anc_api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("ANC_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let cfg = Arc::new(CoreConfig::from_env()?);
    if !cfg.data_dir().exists() {
        anyhow::bail!(
            "ANC data directory does not exist: {}",
            cfg.data_dir().display()
        );
    }

    tracing::info!("++ Starting ANC REST on {}", rest_addr);
    tracing::info!("++ Risk service at {}", cfg.risk_service_url());

    let service = ReportService::from_config(cfg.clone())?;

    let reconcile_task = cfg.reconcile_interval().map(|period| {
        tracing::info!("++ Reconciling every {}s", period.as_secs());
        tokio::spawn(run_periodic(service.clone(), period))
    });

    let result = serve(&rest_addr, AppState::new(service)).await;

    if let Some(task) = reconcile_task {
        task.abort();
    }
    result
}
