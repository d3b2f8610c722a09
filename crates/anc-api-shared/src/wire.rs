//! Request and response bodies exchanged over the REST API.
//!
//! Field names follow the camelCase convention used by the web portal and mobile app.
//! Free-form clinical payloads are carried as `serde_json::Value` and documented as `Object`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Body of `POST /report/createReport`.
///
/// Both fields are optional at the wire level so that a missing field yields a 400 with a
/// clear message rather than an extractor rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportReq {
    #[serde(default)]
    pub pregnancy_id: Option<String>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub data: Option<Value>,
}

/// A stored clinical report as returned to clients.
///
/// The caller-supplied visit data is flattened into the top level alongside the
/// workflow-owned fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: String,
    pub pregnancy_id: String,
    #[serde(flatten)]
    pub data: Map<String, Value>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub alerts: Vec<String>,
    #[serde(default)]
    pub dietary_recommendations: Vec<String>,
    #[serde(default)]
    pub llm_merged_summary: String,
    pub created_at: String,
}

/// Presentation view of one risk classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RiskView {
    /// The ensemble class exactly as the risk service returned it.
    #[schema(value_type = Object)]
    pub ensemble_prediction: Value,
    /// Human-readable label; "Unknown" for anything outside 0, 1, 2.
    pub label: String,
    #[schema(value_type = Object)]
    pub probabilities: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub pregnancy: Option<RiskView>,
    pub fetal: Option<RiskView>,
}

/// Response of `POST /report/createReport`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportRes {
    #[schema(value_type = Object)]
    pub report: Report,
    /// Raw payload returned by the risk service, or null if enrichment failed.
    #[schema(value_type = Object)]
    pub recommendations: Option<Value>,
    pub summary: String,
    /// Set when recommendations could not be obtained; the report is still saved.
    #[serde(rename = "fastApiError")]
    pub fast_api_error: Option<String>,
    pub risk_assessment: Option<RiskAssessment>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReportsRes {
    #[schema(value_type = Vec<Object>)]
    pub reports: Vec<Report>,
}

/// Body of `POST /registration`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPregnancyReq {
    #[serde(default)]
    pub pregnancy_id: Option<String>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub pregnancy_id: String,
    pub report_refs: Vec<String>,
    #[schema(value_type = Object)]
    pub data: Value,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReconcileRes {
    pub scanned: usize,
    pub relinked: usize,
    pub orphaned: usize,
}

/// Structured error body for workflow and lookup failures.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// Error body returned by the pass-through prediction endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProxyErrorRes {
    pub error: String,
    pub details: String,
}
