//! Report aggregation workflow.
//!
//! [`ReportService::submit_report`] runs four steps in strict order:
//!
//! 1. **Create** the report in the report store. Failure aborts the operation.
//! 2. **Link** the report id into the pregnancy registration. Best effort: failures are logged
//!    and left for [`ReportService::reconcile`] to repair.
//! 3. **Enrich** by calling the risk service and writing the merged fields back. Any failure
//!    here is reported in the outcome, never as an operation error.
//! 4. **Respond** with the report re-read from the store.
//!
//! Inputs are validated before the first write so a malformed request leaves no record behind.

use crate::config::CoreConfig;
use crate::constants::ENRICHMENT_UNAVAILABLE;
use crate::enrichment;
use crate::error::{ReportError, ReportResult, StoreError};
use crate::report::{ClinicalReport, PregnancyRecord};
use crate::repositories::registrations::{FileRegistrationStore, RegistrationStore};
use crate::repositories::reports::{FileReportStore, ReportStore};
use crate::risk_client::{HttpRiskClient, RiskClient, RiskClientError, RiskEndpoint};
use anc_api_shared::wire::{self, RiskAssessment};
use anc_types::PregnancyId;
use anc_uuid::ShardableUuid;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Result of a report submission.
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    /// The report as persisted, re-read after enrichment.
    pub report: ClinicalReport,
    /// Raw risk service payload, `None` if enrichment failed.
    pub enrichment_payload: Option<Value>,
    /// The narrative summary, empty if enrichment failed or none was returned.
    pub summary: String,
    /// Fixed user-safe message when enrichment failed.
    pub enrichment_error: Option<String>,
    pub risk_assessment: Option<RiskAssessment>,
}

struct Enrichment {
    payload: Option<Value>,
    summary: String,
    error: Option<String>,
    risk_assessment: Option<RiskAssessment>,
}

impl Enrichment {
    fn unavailable() -> Self {
        Self {
            payload: None,
            summary: String::new(),
            error: Some(ENRICHMENT_UNAVAILABLE.to_string()),
            risk_assessment: None,
        }
    }
}

/// Report and registration operations over injected stores and risk client.
#[derive(Clone)]
pub struct ReportService {
    reports: Arc<dyn ReportStore>,
    registrations: Arc<dyn RegistrationStore>,
    risk: Arc<dyn RiskClient>,
}

impl ReportService {
    pub fn new(
        reports: Arc<dyn ReportStore>,
        registrations: Arc<dyn RegistrationStore>,
        risk: Arc<dyn RiskClient>,
    ) -> Self {
        Self {
            reports,
            registrations,
            risk,
        }
    }

    /// Builds the service with filesystem stores and the HTTP risk client.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::InvalidConfig`] if the HTTP client cannot be built.
    pub fn from_config(cfg: Arc<CoreConfig>) -> ReportResult<Self> {
        let risk = HttpRiskClient::new(cfg.clone())
            .map_err(|e| ReportError::InvalidConfig(e.to_string()))?;
        Ok(Self::new(
            Arc::new(FileReportStore::new(cfg.clone())),
            Arc::new(FileRegistrationStore::new(cfg)),
            Arc::new(risk),
        ))
    }

    pub(crate) fn reports(&self) -> &dyn ReportStore {
        self.reports.as_ref()
    }

    pub(crate) fn registrations(&self) -> &dyn RegistrationStore {
        self.registrations.as_ref()
    }

    /// Persists a visit report, links it to its pregnancy and enriches it.
    ///
    /// # Errors
    ///
    /// - [`ReportError::Validation`] if `pregnancy_id` is empty/invalid or `data` is missing,
    ///   null or not a JSON object. Nothing is written.
    /// - [`ReportError::Persistence`] if the initial write or the final read-back fails.
    pub async fn submit_report(
        &self,
        pregnancy_id: &str,
        data: Option<Value>,
    ) -> ReportResult<SubmitOutcome> {
        let pregnancy_id = parse_pregnancy_id(pregnancy_id)?;
        let data = match data {
            None | Some(Value::Null) => {
                return Err(ReportError::Validation("data is required".into()));
            }
            Some(Value::Object(map)) => map,
            Some(_) => {
                return Err(ReportError::Validation("data must be a JSON object".into()));
            }
        };

        let report = self
            .reports
            .create(&pregnancy_id, data.clone())
            .await
            .map_err(ReportError::Persistence)?;
        tracing::info!(report_id = %report.id, pregnancy_id = %pregnancy_id, "report created");

        self.link(&pregnancy_id, &report.id).await;

        let enrichment = self.enrich(&report.id, data).await;

        let report = self
            .reports
            .get(&report.id)
            .await
            .map_err(ReportError::Persistence)?
            .ok_or_else(|| {
                ReportError::Persistence(StoreError::NotFound(format!(
                    "report {} vanished before read-back",
                    report.id
                )))
            })?;

        Ok(SubmitOutcome {
            report,
            enrichment_payload: enrichment.payload,
            summary: enrichment.summary,
            enrichment_error: enrichment.error,
            risk_assessment: enrichment.risk_assessment,
        })
    }

    async fn link(&self, pregnancy_id: &PregnancyId, report_id: &ShardableUuid) {
        if let Err(e) = self
            .registrations
            .append_report_ref(pregnancy_id, report_id)
            .await
        {
            tracing::warn!(
                report_id = %report_id,
                pregnancy_id = %pregnancy_id,
                "failed to link report to registration, leaving for reconciliation: {:?}",
                e
            );
        }
    }

    async fn enrich(&self, report_id: &ShardableUuid, data: Map<String, Value>) -> Enrichment {
        let payload = match self.risk.analyze(&Value::Object(data)).await {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(report_id = %report_id, "risk service call failed: {:?}", e);
                return Enrichment::unavailable();
            }
        };

        let results = match enrichment::normalize(&payload) {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!(report_id = %report_id, "unusable risk service payload: {}", e);
                return Enrichment::unavailable();
            }
        };

        let fields = enrichment::merge(&results);
        if fields.is_empty() {
            tracing::info!(report_id = %report_id, "risk service returned no recommendations");
        }
        let summary = fields.llm_merged_summary.clone();

        if let Err(e) = self.reports.update_enrichment(report_id, fields).await {
            tracing::error!(report_id = %report_id, "failed to save enrichment: {:?}", e);
            return Enrichment::unavailable();
        }

        Enrichment {
            risk_assessment: enrichment::risk_assessment(&results),
            payload: Some(payload),
            summary,
            error: None,
        }
    }

    /// Looks up one report.
    ///
    /// # Errors
    ///
    /// [`ReportError::NotFound`] if the id is malformed or no report has it.
    pub async fn fetch_report(&self, id: &str) -> ReportResult<ClinicalReport> {
        let report_id = ShardableUuid::parse(id)
            .map_err(|_| ReportError::NotFound(format!("report {id}")))?;

        self.reports
            .get(&report_id)
            .await
            .map_err(ReportError::Persistence)?
            .ok_or_else(|| ReportError::NotFound(format!("report {id}")))
    }

    /// All reports for a pregnancy, newest first. Empty if there are none.
    pub async fn fetch_reports_by_pregnancy(
        &self,
        pregnancy_id: &str,
    ) -> ReportResult<Vec<ClinicalReport>> {
        let pregnancy_id = parse_pregnancy_id(pregnancy_id)?;
        let mut reports = self
            .reports
            .list_by_pregnancy(&pregnancy_id)
            .await
            .map_err(ReportError::Persistence)?;
        sort_newest_first(&mut reports);
        Ok(reports)
    }

    /// Every stored report, newest first.
    pub async fn list_reports(&self) -> ReportResult<Vec<ClinicalReport>> {
        let mut reports = self
            .reports
            .list_all()
            .await
            .map_err(ReportError::Persistence)?;
        sort_newest_first(&mut reports);
        Ok(reports)
    }

    /// Registers a pregnancy. `data` defaults to an empty object.
    ///
    /// # Errors
    ///
    /// [`ReportError::Validation`] for a bad id or non-object data, [`ReportError::Conflict`] if
    /// the id is already registered.
    pub async fn register_pregnancy(
        &self,
        pregnancy_id: &str,
        data: Option<Value>,
    ) -> ReportResult<PregnancyRecord> {
        let pregnancy_id = parse_pregnancy_id(pregnancy_id)?;
        let data = match data {
            None | Some(Value::Null) => Value::Object(Map::new()),
            Some(obj @ Value::Object(_)) => obj,
            Some(_) => {
                return Err(ReportError::Validation("data must be a JSON object".into()));
            }
        };

        let record = self.registrations.create(&pregnancy_id, data).await?;
        tracing::info!(pregnancy_id = %pregnancy_id, "pregnancy registered");
        Ok(record)
    }

    pub async fn fetch_registration(&self, pregnancy_id: &str) -> ReportResult<PregnancyRecord> {
        let pregnancy_id = parse_pregnancy_id(pregnancy_id)?;
        self.registrations
            .get(&pregnancy_id)
            .await
            .map_err(ReportError::Persistence)?
            .ok_or_else(|| ReportError::NotFound(format!("pregnancy {pregnancy_id}")))
    }

    /// Forwards `body` verbatim to a risk service endpoint.
    pub async fn forward_prediction(
        &self,
        endpoint: RiskEndpoint,
        body: Value,
    ) -> Result<Value, RiskClientError> {
        self.risk.forward(endpoint, body).await
    }
}

fn parse_pregnancy_id(input: &str) -> ReportResult<PregnancyId> {
    PregnancyId::new(input).map_err(|e| ReportError::Validation(format!("pregnancyId: {e}")))
}

fn sort_newest_first(reports: &mut [ClinicalReport]) {
    reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

impl From<SubmitOutcome> for wire::CreateReportRes {
    fn from(outcome: SubmitOutcome) -> Self {
        wire::CreateReportRes {
            report: outcome.report.into(),
            recommendations: outcome.enrichment_payload,
            summary: outcome.summary,
            fast_api_error: outcome.enrichment_error,
            risk_assessment: outcome.risk_assessment,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::error::StoreResult;
    use crate::report::EnrichmentFields;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    pub fn test_cfg(data_dir: &Path, risk_url: &str) -> Arc<CoreConfig> {
        Arc::new(
            CoreConfig::new(
                data_dir.to_path_buf(),
                risk_url.into(),
                Duration::from_secs(2),
                0,
                None,
            )
            .expect("CoreConfig::new should succeed"),
        )
    }

    /// Risk client returning a canned payload, or failing.
    pub struct StubRisk {
        pub response: Option<Value>,
        pub seen: Mutex<Vec<Value>>,
    }

    impl StubRisk {
        pub fn ok(payload: Value) -> Arc<Self> {
            Arc::new(Self {
                response: Some(payload),
                seen: Mutex::new(Vec::new()),
            })
        }

        pub fn failing() -> Arc<Self> {
            Arc::new(Self {
                response: None,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl RiskClient for StubRisk {
        async fn forward(
            &self,
            _endpoint: RiskEndpoint,
            body: Value,
        ) -> Result<Value, RiskClientError> {
            self.seen.lock().unwrap().push(body);
            self.response
                .clone()
                .ok_or_else(|| RiskClientError::Connect("connection refused".into()))
        }
    }

    /// Wraps a report store and counts writes; can be told to fail creates or updates.
    pub struct CountingReportStore {
        pub inner: FileReportStore,
        pub writes: AtomicUsize,
        pub fail_create: bool,
        pub fail_update: bool,
    }

    impl CountingReportStore {
        pub fn new(inner: FileReportStore) -> Self {
            Self {
                inner,
                writes: AtomicUsize::new(0),
                fail_create: false,
                fail_update: false,
            }
        }

        pub fn writes(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ReportStore for CountingReportStore {
        async fn create(
            &self,
            pregnancy_id: &PregnancyId,
            data: Map<String, Value>,
        ) -> StoreResult<ClinicalReport> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            if self.fail_create {
                return Err(StoreError::FileWrite(std::io::Error::other("disk full")));
            }
            self.inner.create(pregnancy_id, data).await
        }

        async fn get(&self, id: &ShardableUuid) -> StoreResult<Option<ClinicalReport>> {
            self.inner.get(id).await
        }

        async fn update_enrichment(
            &self,
            id: &ShardableUuid,
            fields: EnrichmentFields,
        ) -> StoreResult<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            if self.fail_update {
                return Err(StoreError::FileWrite(std::io::Error::other("disk full")));
            }
            self.inner.update_enrichment(id, fields).await
        }

        async fn list_by_pregnancy(
            &self,
            pregnancy_id: &PregnancyId,
        ) -> StoreResult<Vec<ClinicalReport>> {
            self.inner.list_by_pregnancy(pregnancy_id).await
        }

        async fn list_all(&self) -> StoreResult<Vec<ClinicalReport>> {
            self.inner.list_all().await
        }
    }
}
