//! Stored record types: clinical reports and pregnancy registrations.

use crate::constants::RESERVED_REPORT_FIELDS;
use anc_api_shared::wire;
use anc_types::PregnancyId;
use anc_uuid::ShardableUuid;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One antenatal visit report.
///
/// The caller's visit data is flattened into the stored document next to the workflow-owned
/// fields. Enrichment fields start empty and are written at most once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalReport {
    pub id: ShardableUuid,
    pub pregnancy_id: PregnancyId,
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
    pub created_at: DateTime<Utc>,
}

impl ClinicalReport {
    /// Builds a fresh report with empty enrichment fields.
    pub fn new(
        id: ShardableUuid,
        pregnancy_id: PregnancyId,
        data: Map<String, Value>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            pregnancy_id,
            data: strip_reserved_fields(data),
            recommendations: Vec::new(),
            alerts: Vec::new(),
            dietary_recommendations: Vec::new(),
            llm_merged_summary: String::new(),
            created_at,
        }
    }

    pub fn enrichment(&self) -> EnrichmentFields {
        EnrichmentFields {
            recommendations: self.recommendations.clone(),
            alerts: self.alerts.clone(),
            dietary_recommendations: self.dietary_recommendations.clone(),
            llm_merged_summary: self.llm_merged_summary.clone(),
        }
    }

    pub fn apply_enrichment(&mut self, fields: EnrichmentFields) {
        self.recommendations = fields.recommendations;
        self.alerts = fields.alerts;
        self.dietary_recommendations = fields.dietary_recommendations;
        self.llm_merged_summary = fields.llm_merged_summary;
    }
}

/// The report fields populated from the risk service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentFields {
    pub recommendations: Vec<String>,
    pub alerts: Vec<String>,
    pub dietary_recommendations: Vec<String>,
    pub llm_merged_summary: String,
}

impl EnrichmentFields {
    pub fn is_empty(&self) -> bool {
        self.recommendations.is_empty()
            && self.alerts.is_empty()
            && self.dietary_recommendations.is_empty()
            && self.llm_merged_summary.is_empty()
    }
}

/// A registered pregnancy and the ids of its reports, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PregnancyRecord {
    pub pregnancy_id: PregnancyId,
    #[serde(default)]
    pub report_refs: Vec<ShardableUuid>,
    #[serde(default)]
    pub data: Value,
    pub created_at: DateTime<Utc>,
}

impl PregnancyRecord {
    pub fn has_report(&self, id: &ShardableUuid) -> bool {
        self.report_refs.contains(id)
    }
}

/// Removes workflow-owned keys from caller data so they cannot shadow the real fields.
fn strip_reserved_fields(mut data: Map<String, Value>) -> Map<String, Value> {
    for key in RESERVED_REPORT_FIELDS {
        if data.remove(*key).is_some() {
            tracing::warn!(field = %key, "dropping reserved field from report data");
        }
    }
    data
}

pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl From<ClinicalReport> for wire::Report {
    fn from(report: ClinicalReport) -> Self {
        wire::Report {
            id: report.id.to_string(),
            pregnancy_id: report.pregnancy_id.to_string(),
            data: report.data,
            recommendations: report.recommendations,
            alerts: report.alerts,
            dietary_recommendations: report.dietary_recommendations,
            llm_merged_summary: report.llm_merged_summary,
            created_at: format_timestamp(&report.created_at),
        }
    }
}

impl From<PregnancyRecord> for wire::Registration {
    fn from(record: PregnancyRecord) -> Self {
        wire::Registration {
            pregnancy_id: record.pregnancy_id.to_string(),
            report_refs: record.report_refs.iter().map(ToString::to_string).collect(),
            data: record.data,
            created_at: format_timestamp(&record.created_at),
        }
    }
}
