//! Request handlers for the REST API.

use crate::error::ApiResult;
use crate::AppState;
use anc_api_shared::wire::{
    CreateReportReq, CreateReportRes, ErrorBody, HealthRes, ProxyErrorRes, ReconcileRes,
    RegisterPregnancyReq, Registration, Report, ReportsRes,
};
use anc_api_shared::HealthService;
use anc_core::{ClinicalReport, RiskEndpoint};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Json,
};
use serde_json::Value;

fn to_reports_res(reports: Vec<ClinicalReport>) -> ReportsRes {
    ReportsRes {
        reports: reports.into_iter().map(Report::from).collect(),
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for monitoring and load balancers.
#[axum::debug_handler]
pub(crate) async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/report/createReport",
    request_body = CreateReportReq,
    responses(
        (status = 201, description = "Report saved; enrichment may have failed", body = CreateReportRes),
        (status = 400, description = "Missing or invalid pregnancyId or data", body = ErrorBody),
        (status = 500, description = "Report could not be persisted", body = ErrorBody)
    )
)]
/// Submit a visit report
///
/// Persists the report, links it to the pregnancy registration and enriches it with
/// recommendations from the risk service. Enrichment failure still returns 201, with
/// `fastApiError` set and the enrichment fields left empty.
///
/// # Errors
/// Returns `400 Bad Request` if `pregnancyId` is missing or invalid, or `data` is missing or not
/// an object. Returns `500 Internal Server Error` if the report cannot be written or read back.
#[axum::debug_handler]
pub(crate) async fn create_report(
    State(state): State<AppState>,
    payload: Result<Json<CreateReportReq>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CreateReportRes>)> {
    let Json(req) = payload?;
    let pregnancy_id = req.pregnancy_id.unwrap_or_default();

    let outcome = state.service.submit_report(&pregnancy_id, req.data).await?;
    Ok((StatusCode::CREATED, Json(outcome.into())))
}

#[utoipa::path(
    get,
    path = "/report/reports",
    responses(
        (status = 200, description = "All reports, newest first", body = ReportsRes),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
#[axum::debug_handler]
pub(crate) async fn list_reports(State(state): State<AppState>) -> ApiResult<Json<ReportsRes>> {
    let reports = state.service.list_reports().await?;
    Ok(Json(to_reports_res(reports)))
}

#[utoipa::path(
    get,
    path = "/report/{id}",
    params(("id" = String, Path, description = "Report id (32 lowercase hex characters)")),
    responses(
        (status = 200, description = "The report"),
        (status = 404, description = "No report with this id", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
#[axum::debug_handler]
pub(crate) async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Report>> {
    let report = state.service.fetch_report(&id).await?;
    Ok(Json(report.into()))
}

#[utoipa::path(
    get,
    path = "/report/byPregnancy/{pregnancyId}",
    params(("pregnancyId" = String, Path, description = "Pregnancy identifier")),
    responses(
        (status = 200, description = "Reports for the pregnancy, newest first", body = ReportsRes),
        (status = 400, description = "Invalid pregnancy id", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
/// Reports for one pregnancy, newest first. An unknown pregnancy yields an empty list.
#[axum::debug_handler]
pub(crate) async fn reports_by_pregnancy(
    State(state): State<AppState>,
    Path(pregnancy_id): Path<String>,
) -> ApiResult<Json<ReportsRes>> {
    let reports = state.service.fetch_reports_by_pregnancy(&pregnancy_id).await?;
    Ok(Json(to_reports_res(reports)))
}

async fn proxy(
    state: &AppState,
    endpoint: RiskEndpoint,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(body) = payload?;
    let value = state.service.forward_prediction(endpoint, body).await?;
    Ok(Json(value))
}

#[utoipa::path(
    post,
    path = "/report/predict_preg",
    request_body = Value,
    responses(
        (status = 200, description = "Pregnancy risk prediction from the risk service"),
        (status = 500, description = "Risk service call failed", body = ProxyErrorRes)
    )
)]
/// Pass-through to the risk service's pregnancy risk model.
#[axum::debug_handler]
pub(crate) async fn predict_preg(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    proxy(&state, RiskEndpoint::PredictPregnancy, payload).await
}

#[utoipa::path(
    post,
    path = "/report/predict_fetal",
    request_body = Value,
    responses(
        (status = 200, description = "Fetal risk prediction from the risk service"),
        (status = 500, description = "Risk service call failed", body = ProxyErrorRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn predict_fetal(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    proxy(&state, RiskEndpoint::PredictFetal, payload).await
}

#[utoipa::path(
    post,
    path = "/report/analyze",
    request_body = Value,
    responses(
        (status = 200, description = "Rules, recommendations and summary from the risk service"),
        (status = 500, description = "Risk service call failed", body = ProxyErrorRes)
    )
)]
#[axum::debug_handler]
pub(crate) async fn analyze(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    proxy(&state, RiskEndpoint::Analyze, payload).await
}

#[utoipa::path(
    post,
    path = "/report/reconcile",
    responses(
        (status = 200, description = "Reconciliation summary", body = ReconcileRes),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
/// Relink stored reports that are missing from their pregnancy registration.
#[axum::debug_handler]
pub(crate) async fn reconcile(State(state): State<AppState>) -> ApiResult<Json<ReconcileRes>> {
    let summary = state.service.reconcile().await?;
    Ok(Json(summary.into()))
}

#[utoipa::path(
    post,
    path = "/registration",
    request_body = RegisterPregnancyReq,
    responses(
        (status = 201, description = "Pregnancy registered", body = Registration),
        (status = 400, description = "Invalid pregnancy id or data", body = ErrorBody),
        (status = 409, description = "Pregnancy already registered", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
#[axum::debug_handler]
pub(crate) async fn register_pregnancy(
    State(state): State<AppState>,
    payload: Result<Json<RegisterPregnancyReq>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Registration>)> {
    let Json(req) = payload?;
    let pregnancy_id = req.pregnancy_id.unwrap_or_default();

    let record = state
        .service
        .register_pregnancy(&pregnancy_id, req.data)
        .await?;
    Ok((StatusCode::CREATED, Json(record.into())))
}

#[utoipa::path(
    get,
    path = "/registration/{pregnancyId}",
    params(("pregnancyId" = String, Path, description = "Pregnancy identifier")),
    responses(
        (status = 200, description = "The registration", body = Registration),
        (status = 400, description = "Invalid pregnancy id", body = ErrorBody),
        (status = 404, description = "Pregnancy not registered", body = ErrorBody)
    )
)]
#[axum::debug_handler]
pub(crate) async fn get_registration(
    State(state): State<AppState>,
    Path(pregnancy_id): Path<String>,
) -> ApiResult<Json<Registration>> {
    let record = state.service.fetch_registration(&pregnancy_id).await?;
    Ok(Json(record.into()))
}
