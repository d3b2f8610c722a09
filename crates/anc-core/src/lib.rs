//! # ANC Core
//!
//! Core business logic for the antenatal care report service.
//!
//! This crate contains the report workflow and its persistence:
//! - Report submission (create, link to registration, enrich, read back)
//! - Pregnancy registrations and the reconciliation sweep that repairs missing links
//! - Normalisation of risk service payloads into report enrichment fields
//! - File-backed stores with sharded JSON storage under `ANC_DATA_DIR`
//!
//! **No API concerns**: HTTP servers and command-line handling belong in `anc-api-rest` and
//! `anc-cli`. Wire types live in `anc-api-shared`.

pub mod config;
pub mod constants;
pub mod enrichment;
pub mod error;
pub mod reconcile;
pub mod report;
pub mod repositories;
pub mod risk;
pub mod risk_client;
pub mod workflow;

pub use anc_types::PregnancyId;
pub use anc_uuid::ShardableUuid;
pub use config::CoreConfig;
pub use error::{ReportError, ReportResult, StoreError, StoreResult};
pub use reconcile::ReconcileSummary;
pub use report::{ClinicalReport, EnrichmentFields, PregnancyRecord};
pub use risk_client::{RiskClientError, RiskEndpoint};
pub use workflow::{ReportService, SubmitOutcome};
