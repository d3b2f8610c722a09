//! HTTP error mapping.
//!
//! Internal causes are logged here and replaced with generic messages before leaving the
//! process; store paths and upstream error text never reach clients.

use anc_api_shared::wire::{ErrorBody, ErrorDetail, ProxyErrorRes};
use anc_core::{ReportError, RiskClientError};
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("internal error: {0}")]
    Internal(String),
    #[error("prediction request failed: {0}")]
    Upstream(#[from] RiskClientError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail),
            ApiError::NotFound(detail) => {
                tracing::debug!(detail = %detail, "lookup miss");
                (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    "Resource not found".to_string(),
                )
            }
            ApiError::Conflict(detail) => {
                tracing::debug!(detail = %detail, "conflicting request");
                (
                    StatusCode::CONFLICT,
                    "CONFLICT",
                    "Resource already exists".to_string(),
                )
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail = %detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
            ApiError::Upstream(err) => {
                tracing::error!("risk service proxy error: {:?}", err);
                let body = ProxyErrorRes {
                    error: "Prediction request failed".into(),
                    details: err.category(),
                };
                return (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response();
            }
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.into(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::Validation(msg) => ApiError::BadRequest(msg),
            ReportError::NotFound(what) => ApiError::NotFound(what),
            ReportError::Conflict(what) => ApiError::Conflict(what),
            other => ApiError::Internal(format!("{other:?}")),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
