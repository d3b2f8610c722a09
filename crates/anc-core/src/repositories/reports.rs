//! Clinical report storage.
//!
//! Reports are stored one JSON document per report in a sharded layout:
//!
//! ```text
//! reports/
//!   <s1>/
//!     <s2>/
//!       <uuid>/
//!         report.json
//! ```
//!
//! where `s1` and `s2` are the first four hex characters of the report id.

use crate::config::CoreConfig;
use crate::constants::REPORT_JSON_FILENAME;
use crate::error::{StoreError, StoreResult};
use crate::report::{ClinicalReport, EnrichmentFields};
use crate::repositories::shared::{
    create_uuid_and_shard_dir, read_json, run_blocking, sharded_record_files, write_json_atomic,
};
use anc_types::PregnancyId;
use anc_uuid::{MonotonicClock, ShardableUuid};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// Persistence seam for clinical reports.
///
/// Listing methods return reports in no particular order; callers sort.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Persists a new report with empty enrichment fields and returns it.
    async fn create(
        &self,
        pregnancy_id: &PregnancyId,
        data: Map<String, Value>,
    ) -> StoreResult<ClinicalReport>;

    async fn get(&self, id: &ShardableUuid) -> StoreResult<Option<ClinicalReport>>;

    /// Overwrites the enrichment fields of an existing report.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no report has this id.
    async fn update_enrichment(
        &self,
        id: &ShardableUuid,
        fields: EnrichmentFields,
    ) -> StoreResult<()>;

    async fn list_by_pregnancy(&self, pregnancy_id: &PregnancyId)
        -> StoreResult<Vec<ClinicalReport>>;

    async fn list_all(&self) -> StoreResult<Vec<ClinicalReport>>;
}

/// Filesystem-backed [`ReportStore`].
#[derive(Clone, Debug)]
pub struct FileReportStore {
    cfg: Arc<CoreConfig>,
    clock: Arc<MonotonicClock>,
}

impl FileReportStore {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self {
            cfg,
            clock: Arc::new(MonotonicClock::new()),
        }
    }

    fn report_path(&self, id: &ShardableUuid) -> PathBuf {
        id.sharded_dir(&self.cfg.reports_dir())
            .join(REPORT_JSON_FILENAME)
    }

    fn create_blocking(
        &self,
        pregnancy_id: PregnancyId,
        data: Map<String, Value>,
    ) -> StoreResult<ClinicalReport> {
        let (id, report_dir) =
            create_uuid_and_shard_dir(&self.cfg.reports_dir(), ShardableUuid::new)?;
        let report = ClinicalReport::new(id, pregnancy_id, data, self.clock.next());

        if let Err(e) = write_json_atomic(&report_dir.join(REPORT_JSON_FILENAME), &report) {
            if let Err(cleanup) = fs::remove_dir_all(&report_dir) {
                tracing::error!(
                    "failed to clean up report dir {} after write error: {:?}",
                    report_dir.display(),
                    cleanup
                );
            }
            return Err(e);
        }

        Ok(report)
    }

    fn list_blocking(&self, pregnancy_id: Option<PregnancyId>) -> StoreResult<Vec<ClinicalReport>> {
        let mut reports = Vec::new();

        for path in sharded_record_files(&self.cfg.reports_dir(), REPORT_JSON_FILENAME)? {
            let report = match read_json::<ClinicalReport>(&path) {
                Ok(Some(report)) => report,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!("skipping unreadable report {}: {:?}", path.display(), e);
                    continue;
                }
            };

            if pregnancy_id
                .as_ref()
                .map_or(true, |pid| &report.pregnancy_id == pid)
            {
                self.clock.observe(report.created_at);
                reports.push(report);
            }
        }

        Ok(reports)
    }
}

#[async_trait]
impl ReportStore for FileReportStore {
    async fn create(
        &self,
        pregnancy_id: &PregnancyId,
        data: Map<String, Value>,
    ) -> StoreResult<ClinicalReport> {
        let store = self.clone();
        let pregnancy_id = pregnancy_id.clone();
        run_blocking(move || store.create_blocking(pregnancy_id, data)).await
    }

    async fn get(&self, id: &ShardableUuid) -> StoreResult<Option<ClinicalReport>> {
        let path = self.report_path(id);
        run_blocking(move || read_json::<ClinicalReport>(&path)).await
    }

    async fn update_enrichment(
        &self,
        id: &ShardableUuid,
        fields: EnrichmentFields,
    ) -> StoreResult<()> {
        let path = self.report_path(id);
        let id = id.clone();
        run_blocking(move || {
            let mut report = read_json::<ClinicalReport>(&path)?
                .ok_or_else(|| StoreError::NotFound(format!("report {id}")))?;
            report.apply_enrichment(fields);
            write_json_atomic(&path, &report)
        })
        .await
    }

    async fn list_by_pregnancy(
        &self,
        pregnancy_id: &PregnancyId,
    ) -> StoreResult<Vec<ClinicalReport>> {
        let store = self.clone();
        let pregnancy_id = pregnancy_id.clone();
        run_blocking(move || store.list_blocking(Some(pregnancy_id))).await
    }

    async fn list_all(&self) -> StoreResult<Vec<ClinicalReport>> {
        let store = self.clone();
        run_blocking(move || store.list_blocking(None)).await
    }
}
