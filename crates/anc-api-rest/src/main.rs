//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API server on its own, without the periodic reconciliation task.
//!
//! ## Intended use
//! Useful for development and debugging against a local risk service. The workspace's main
//! `anc-run` binary runs the REST server and the reconciliation loop together.

use anc_api_rest::{serve, AppState};
use anc_core::{CoreConfig, ReportService};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the ANC REST API server
///
/// # Environment Variables
/// - `ANC_REST_ADDR`: Server address (default: "0.0.0.0:3000")
/// - `ANC_DATA_DIR`, `RISK_SERVICE_URL`, `RISK_SERVICE_TIMEOUT_SECS`, `RISK_SERVICE_RETRIES`:
///   see [`CoreConfig::from_env`]
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the configuration is invalid,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("anc_api_rest=info".parse()?)
                .add_directive("anc_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("ANC_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    tracing::info!("-- Starting ANC REST API on {}", addr);

    let cfg = Arc::new(CoreConfig::from_env()?);
    tracing::info!(
        data_dir = %cfg.data_dir().display(),
        risk_service = cfg.risk_service_url(),
        "configuration loaded"
    );

    let service = ReportService::from_config(cfg)?;
    serve(&addr, AppState::new(service)).await
}
