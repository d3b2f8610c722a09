use std::io;

/// Failures raised by the record stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to create storage directory: {0}")]
    DirCreation(io::Error),
    #[error("failed to write record file: {0}")]
    FileWrite(io::Error),
    #[error("failed to read record file: {0}")]
    FileRead(io::Error),
    #[error("failed to serialize record: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize record: {0}")]
    Deserialization(serde_json::Error),
    #[error("record already exists: {0}")]
    AlreadyExists(String),
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("storage task failed: {0}")]
    Task(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failures surfaced by report and registration operations.
///
/// Enrichment failures are absent: they are reported as data on a successful
/// outcome, never as an operation error.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("persistence failed: {0}")]
    Persistence(#[source] StoreError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type ReportResult<T> = std::result::Result<T, ReportError>;

impl From<StoreError> for ReportError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyExists(what) => ReportError::Conflict(what),
            StoreError::NotFound(what) => ReportError::NotFound(what),
            other => ReportError::Persistence(other),
        }
    }
}
