//! Constants used throughout the ANC core crate.

/// Directory name for clinical report storage.
pub const REPORTS_DIR_NAME: &str = "reports";

/// Directory name for pregnancy registration storage.
pub const REGISTRATIONS_DIR_NAME: &str = "registrations";

/// Filename of a stored clinical report inside its sharded directory.
pub const REPORT_JSON_FILENAME: &str = "report.json";

/// Filename of a stored registration inside its directory.
pub const REGISTRATION_JSON_FILENAME: &str = "registration.json";

/// Default directory for report data when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "/anc_data";

pub const DEFAULT_RISK_SERVICE_URL: &str = "http://localhost:8000";

pub const DEFAULT_RISK_TIMEOUT_SECS: u64 = 20;
pub const MAX_RISK_TIMEOUT_SECS: u64 = 300;

pub const DEFAULT_RISK_RETRIES: u32 = 1;
pub const MAX_RISK_RETRIES: u32 = 5;

/// Message attached to a report response when enrichment could not be completed.
pub const ENRICHMENT_UNAVAILABLE: &str = "Recommendations are currently unavailable";

/// Report fields owned by the workflow. Keys with these names inside caller data are dropped.
pub const RESERVED_REPORT_FIELDS: &[&str] = &[
    "id",
    "pregnancyId",
    "recommendations",
    "alerts",
    "dietaryRecommendations",
    "llmMergedSummary",
    "createdAt",
];
