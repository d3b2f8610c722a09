//! # API REST
//!
//! REST API for the ANC report service.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON extraction, status mapping, CORS)
//!
//! Business logic lives in `anc-core`; wire types come from `anc-api-shared`.

#![warn(rust_2018_idioms)]

pub mod error;
mod handlers;

use anc_api_shared::wire;
use anc_core::ReportService;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Application state shared across REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: ReportService,
}

impl AppState {
    pub fn new(service: ReportService) -> Self {
        Self { service }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::create_report,
        handlers::list_reports,
        handlers::get_report,
        handlers::reports_by_pregnancy,
        handlers::predict_preg,
        handlers::predict_fetal,
        handlers::analyze,
        handlers::reconcile,
        handlers::register_pregnancy,
        handlers::get_registration,
    ),
    components(schemas(
        wire::HealthRes,
        wire::CreateReportReq,
        wire::CreateReportRes,
        wire::RiskAssessment,
        wire::RiskView,
        wire::ReportsRes,
        wire::RegisterPregnancyReq,
        wire::Registration,
        wire::ReconcileRes,
        wire::ErrorBody,
        wire::ErrorDetail,
        wire::ProxyErrorRes,
    ))
)]
pub struct ApiDoc;

/// Builds the REST router with Swagger UI and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/report/createReport", post(handlers::create_report))
        .route("/report/reports", get(handlers::list_reports))
        .route("/report/predict_preg", post(handlers::predict_preg))
        .route("/report/predict_fetal", post(handlers::predict_fetal))
        .route("/report/analyze", post(handlers::analyze))
        .route("/report/reconcile", post(handlers::reconcile))
        .route(
            "/report/byPregnancy/:pregnancy_id",
            get(handlers::reports_by_pregnancy),
        )
        .route("/report/:id", get(handlers::get_report))
        .route("/registration", post(handlers::register_pregnancy))
        .route(
            "/registration/:pregnancy_id",
            get(handlers::get_registration),
        )
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds `addr` and serves the REST API until the server fails.
///
/// # Errors
/// Returns an error if the address cannot be bound or the HTTP server fails while running.
pub async fn serve(addr: &str, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("++ ANC REST API listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}
