//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services as an
//! `Arc<CoreConfig>`. Request handling never reads process-wide environment variables.

use crate::constants::{
    DEFAULT_DATA_DIR, DEFAULT_RISK_RETRIES, DEFAULT_RISK_SERVICE_URL, DEFAULT_RISK_TIMEOUT_SECS,
    MAX_RISK_RETRIES, MAX_RISK_TIMEOUT_SECS, REGISTRATIONS_DIR_NAME, REPORTS_DIR_NAME,
};
use crate::{ReportError, ReportResult};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    risk_service_url: String,
    risk_timeout: Duration,
    risk_retries: u32,
    reconcile_interval: Option<Duration>,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::InvalidConfig`] if:
    /// - the risk service URL is not an absolute `http`/`https` URL,
    /// - the timeout is zero or above the supported maximum,
    /// - the retry count is above the supported maximum.
    pub fn new(
        data_dir: PathBuf,
        risk_service_url: String,
        risk_timeout: Duration,
        risk_retries: u32,
        reconcile_interval: Option<Duration>,
    ) -> ReportResult<Self> {
        let parsed = reqwest::Url::parse(risk_service_url.trim()).map_err(|e| {
            ReportError::InvalidConfig(format!("risk service URL is invalid: {e}"))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ReportError::InvalidConfig(
                "risk service URL must use http or https".into(),
            ));
        }

        if risk_timeout.is_zero() || risk_timeout > Duration::from_secs(MAX_RISK_TIMEOUT_SECS) {
            return Err(ReportError::InvalidConfig(format!(
                "risk service timeout must be between 1 and {MAX_RISK_TIMEOUT_SECS} seconds"
            )));
        }

        if risk_retries > MAX_RISK_RETRIES {
            return Err(ReportError::InvalidConfig(format!(
                "risk service retries cannot exceed {MAX_RISK_RETRIES}"
            )));
        }

        Ok(Self {
            data_dir,
            risk_service_url: risk_service_url.trim().trim_end_matches('/').to_string(),
            risk_timeout,
            risk_retries,
            reconcile_interval: reconcile_interval.filter(|d| !d.is_zero()),
        })
    }

    /// Resolve configuration from the process environment.
    ///
    /// Call this once from a binary's `main`, after loading any `.env` file.
    ///
    /// # Environment Variables
    /// - `ANC_DATA_DIR`: storage root (default: `/anc_data`)
    /// - `RISK_SERVICE_URL`: base URL of the risk service (default: `http://localhost:8000`)
    /// - `RISK_SERVICE_TIMEOUT_SECS`: per-attempt timeout (default: 20)
    /// - `RISK_SERVICE_RETRIES`: extra attempts after the first (default: 1)
    /// - `ANC_RECONCILE_INTERVAL_SECS`: reconciliation sweep period, 0 disables (default: 0)
    pub fn from_env() -> ReportResult<Self> {
        let data_dir = std::env::var("ANC_DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.into());
        let risk_service_url = std::env::var("RISK_SERVICE_URL")
            .unwrap_or_else(|_| DEFAULT_RISK_SERVICE_URL.into());

        let timeout_secs = u64_from_env_value(
            "RISK_SERVICE_TIMEOUT_SECS",
            std::env::var("RISK_SERVICE_TIMEOUT_SECS").ok(),
            DEFAULT_RISK_TIMEOUT_SECS,
        )?;
        let retries = u64_from_env_value(
            "RISK_SERVICE_RETRIES",
            std::env::var("RISK_SERVICE_RETRIES").ok(),
            u64::from(DEFAULT_RISK_RETRIES),
        )?;
        let retries = u32::try_from(retries).map_err(|_| {
            ReportError::InvalidConfig("RISK_SERVICE_RETRIES is out of range".into())
        })?;
        let reconcile_secs = u64_from_env_value(
            "ANC_RECONCILE_INTERVAL_SECS",
            std::env::var("ANC_RECONCILE_INTERVAL_SECS").ok(),
            0,
        )?;

        Self::new(
            PathBuf::from(data_dir),
            risk_service_url,
            Duration::from_secs(timeout_secs),
            retries,
            Some(Duration::from_secs(reconcile_secs)),
        )
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.data_dir.join(REPORTS_DIR_NAME)
    }

    pub fn registrations_dir(&self) -> PathBuf {
        self.data_dir.join(REGISTRATIONS_DIR_NAME)
    }

    pub fn risk_service_url(&self) -> &str {
        &self.risk_service_url
    }

    /// Full URL of an endpoint on the risk service, e.g. `risk_endpoint("analyze")`.
    pub fn risk_endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.risk_service_url, path.trim_start_matches('/'))
    }

    pub fn risk_timeout(&self) -> Duration {
        self.risk_timeout
    }

    pub fn risk_retries(&self) -> u32 {
        self.risk_retries
    }

    pub fn reconcile_interval(&self) -> Option<Duration> {
        self.reconcile_interval
    }
}

/// Parse an optional unsigned integer setting.
///
/// `None` or an empty/whitespace value yields `default`.
pub fn u64_from_env_value(name: &str, value: Option<String>, default: u64) -> ReportResult<u64> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    match value {
        None => Ok(default),
        Some(v) => v
            .parse::<u64>()
            .map_err(|_| ReportError::InvalidConfig(format!("{name} must be an unsigned integer"))),
    }
}
